mod avian;
mod ground;
mod layers;
mod plugin;
mod world;

#[cfg(test)]
pub(crate) mod testing;

pub use avian::{AvianWorld, ColliderQuery};
pub use ground::{RayInfo, sample_ground};
pub use layers::GameLayer;
pub use plugin::PhysicsPlugin;
pub use world::{CollisionWorld, QUERY_CAPACITY, QueryScratch, RayHit};
