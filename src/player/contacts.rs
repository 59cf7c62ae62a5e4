use avian3d::prelude::*;
use bevy::ecs::entity::EntityHashSet;
use bevy::prelude::*;

use crate::physics::CollisionWorld;

/// Edge of the grounded state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundTransition {
    Entered,
    Exited,
}

/// Broadcast whenever a character's contact set becomes empty or non-empty
#[derive(Message, Debug, Clone, Copy)]
pub struct GroundTransitionMessage {
    pub character: Entity,
    pub transition: GroundTransition,
}

/// Handle returned by [`GroundContactTracker::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

type GroundListener = Box<dyn FnMut(GroundTransition) + Send + Sync>;

/// Tracks the colliders a character is standing on.
///
/// A collider joins the contact set when one of its contact normals is within
/// the slope tolerance of straight up. It leaves when contact ends, regardless
/// of the normal. Listeners are notified only on empty/non-empty edges, in the
/// order they subscribed.
#[derive(Component)]
pub struct GroundContactTracker {
    contacts: EntityHashSet,
    excluded: EntityHashSet,
    slope_tolerance: f32,
    listeners: Vec<(ListenerId, GroundListener)>,
    next_listener: u32,
}

impl GroundContactTracker {
    /// `excluded` colliders never count as ground. The list is fixed for the
    /// tracker's lifetime.
    pub fn new(slope_tolerance: f32, excluded: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            contacts: EntityHashSet::default(),
            excluded: excluded.into_iter().collect(),
            slope_tolerance: slope_tolerance.clamp(0.0, 1.0),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn is_grounded(&self) -> bool {
        !self.contacts.is_empty()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_touching(&self, collider: Entity) -> bool {
        self.contacts.contains(&collider)
    }

    pub fn set_slope_tolerance(&mut self, slope_tolerance: f32) {
        self.slope_tolerance = slope_tolerance.clamp(0.0, 1.0);
    }

    /// Handles the start of contact with `collider`.
    ///
    /// `normals` point from the collider towards the character.
    pub fn on_collision_enter(
        &mut self,
        collider: Entity,
        normals: &[Vec3],
    ) -> Option<GroundTransition> {
        let was_grounded = self.is_grounded();
        let threshold = 1.0 - self.slope_tolerance;

        let is_ground = normals.iter().any(|normal| normal.dot(Vec3::Y) > threshold);
        if is_ground && !self.excluded.contains(&collider) {
            self.contacts.insert(collider);
        }

        if !was_grounded && self.is_grounded() {
            self.dispatch(GroundTransition::Entered);
            return Some(GroundTransition::Entered);
        }
        None
    }

    /// Handles the end of contact with `collider`
    pub fn on_collision_exit(&mut self, collider: Entity) -> Option<GroundTransition> {
        let was_grounded = self.is_grounded();
        self.contacts.remove(&collider);

        if was_grounded && !self.is_grounded() {
            self.dispatch(GroundTransition::Exited);
            return Some(GroundTransition::Exited);
        }
        None
    }

    /// Registers a listener called synchronously on every ground transition
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(GroundTransition) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener, returning false if it was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn dispatch(&mut self, transition: GroundTransition) {
        for (_, listener) in &mut self.listeners {
            listener(transition);
        }
    }
}

/// Overlap sphere below the character used to forgive the one-tick lag of
/// contact events
#[derive(Component, Debug, Clone, Copy)]
pub struct GroundProbe {
    pub radius: f32,
    /// Sphere center relative to the character's base
    pub offset: Vec3,
}

impl Default for GroundProbe {
    fn default() -> Self {
        Self {
            radius: 0.3,
            offset: Vec3::Y * 0.25,
        }
    }
}

impl GroundProbe {
    /// Returns true if the probe sphere touches any world geometry
    pub fn check(&self, world: &impl CollisionWorld, foot: Vec3) -> bool {
        world.check_sphere(foot + self.offset, self.radius)
    }
}

/// Feeds Avian collision events into each character's contact tracker
pub fn track_ground_contacts(
    mut started: MessageReader<CollisionStart>,
    mut ended: MessageReader<CollisionEnd>,
    collisions: Collisions,
    mut trackers: Query<&mut GroundContactTracker>,
    mut writer: MessageWriter<GroundTransitionMessage>,
    mut normals: Local<Vec<Vec3>>,
) {
    for event in started.read() {
        for (character, other) in [
            (event.collider1, event.collider2),
            (event.collider2, event.collider1),
        ] {
            let Ok(mut tracker) = trackers.get_mut(character) else {
                continue;
            };

            normals.clear();
            if let Some(pair) = collisions.get(character, other) {
                // Manifold normals point from collider1 to collider2
                let sign = if pair.collider1 == character { -1.0 } else { 1.0 };
                normals.extend(pair.manifolds.iter().map(|m| m.normal * sign));
            }

            if let Some(transition) = tracker.on_collision_enter(other, &normals) {
                debug!("character {character} entered ground on {other}");
                writer.write(GroundTransitionMessage {
                    character,
                    transition,
                });
            }
        }
    }

    for event in ended.read() {
        for (character, other) in [
            (event.collider1, event.collider2),
            (event.collider2, event.collider1),
        ] {
            let Ok(mut tracker) = trackers.get_mut(character) else {
                continue;
            };

            if let Some(transition) = tracker.on_collision_exit(other) {
                debug!("character {character} left ground");
                writer.write(GroundTransitionMessage {
                    character,
                    transition,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::physics::testing::BoxWorld;

    fn ids(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    fn recorder(tracker: &mut GroundContactTracker) -> Arc<Mutex<Vec<GroundTransition>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        tracker.subscribe(move |t| sink.lock().unwrap().push(t));
        log
    }

    #[test]
    fn flat_contact_grounds_character() {
        let floor = ids(1)[0];
        let mut tracker = GroundContactTracker::new(0.5, []);

        let edge = tracker.on_collision_enter(floor, &[Vec3::Y]);

        assert_eq!(edge, Some(GroundTransition::Entered));
        assert!(tracker.is_grounded());
    }

    #[test]
    fn wall_contact_is_not_ground() {
        let wall = ids(1)[0];
        let mut tracker = GroundContactTracker::new(0.5, []);

        assert_eq!(tracker.on_collision_enter(wall, &[Vec3::X]), None);
        // 70° slope: dot ≈ 0.34, below 1 - 0.5
        let steep = Vec3::new(70f32.to_radians().sin(), 70f32.to_radians().cos(), 0.0);
        assert_eq!(tracker.on_collision_enter(wall, &[steep]), None);
        assert!(!tracker.is_grounded());
    }

    #[test]
    fn excluded_colliders_are_ignored() {
        let ids = ids(2);
        let mut tracker = GroundContactTracker::new(0.5, [ids[0]]);

        tracker.on_collision_enter(ids[0], &[Vec3::Y]);
        assert!(!tracker.is_grounded());

        tracker.on_collision_enter(ids[1], &[Vec3::Y]);
        assert!(tracker.is_touching(ids[1]));
    }

    #[test]
    fn any_qualifying_contact_point_counts() {
        let step = ids(1)[0];
        let mut tracker = GroundContactTracker::new(0.5, []);

        tracker.on_collision_enter(step, &[Vec3::X, Vec3::NEG_Z, Vec3::Y]);

        assert!(tracker.is_grounded());
        assert_eq!(tracker.contact_count(), 1);
    }

    #[test]
    fn one_notification_per_edge() {
        let ids = ids(3);
        let mut tracker = GroundContactTracker::new(0.5, []);
        let log = recorder(&mut tracker);

        for id in &ids {
            tracker.on_collision_enter(*id, &[Vec3::Y, Vec3::Y]);
        }
        // Re-entering an existing contact changes nothing
        tracker.on_collision_enter(ids[0], &[Vec3::Y]);
        for id in &ids {
            tracker.on_collision_exit(*id);
        }
        // Exit with no contacts left stays quiet
        tracker.on_collision_exit(ids[0]);

        assert_eq!(
            *log.lock().unwrap(),
            vec![GroundTransition::Entered, GroundTransition::Exited]
        );
    }

    #[test]
    fn exit_removes_contact_unconditionally() {
        let floor = ids(1)[0];
        let mut tracker = GroundContactTracker::new(0.5, []);
        tracker.on_collision_enter(floor, &[Vec3::Y]);

        assert_eq!(
            tracker.on_collision_exit(floor),
            Some(GroundTransition::Exited)
        );
        assert!(!tracker.is_grounded());
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let floor = ids(1)[0];
        let mut tracker = GroundContactTracker::new(0.5, []);
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3 {
            let sink = order.clone();
            tracker.subscribe(move |_| sink.lock().unwrap().push(tag));
        }
        tracker.on_collision_enter(floor, &[Vec3::Y]);

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let floor = ids(1)[0];
        let mut tracker = GroundContactTracker::new(0.5, []);
        let calls = Arc::new(Mutex::new(0));
        let sink = calls.clone();
        let id = tracker.subscribe(move |_| *sink.lock().unwrap() += 1);

        assert!(tracker.unsubscribe(id));
        assert!(!tracker.unsubscribe(id));
        tracker.on_collision_enter(floor, &[Vec3::Y]);

        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn random_event_sequences_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        let colliders = ids(6);
        let normals = [Vec3::Y, Vec3::X, Vec3::new(0.0, 0.8, 0.6), Vec3::NEG_Y];

        for _ in 0..50 {
            let mut tracker = GroundContactTracker::new(0.5, [colliders[5]]);
            let log = recorder(&mut tracker);
            let mut expected_edges = Vec::new();

            for _ in 0..200 {
                let before = tracker.is_grounded();
                let collider = colliders[rng.gen_range(0..colliders.len())];
                if rng.gen_bool(0.5) {
                    let normal = normals[rng.gen_range(0..normals.len())];
                    tracker.on_collision_enter(collider, &[normal]);
                } else {
                    tracker.on_collision_exit(collider);
                }

                assert_eq!(tracker.is_grounded(), tracker.contact_count() > 0);
                assert!(!tracker.is_touching(colliders[5]));
                match (before, tracker.is_grounded()) {
                    (false, true) => expected_edges.push(GroundTransition::Entered),
                    (true, false) => expected_edges.push(GroundTransition::Exited),
                    _ => {}
                }
            }

            assert_eq!(*log.lock().unwrap(), expected_edges);
        }
    }

    #[test]
    fn shape_probe_does_not_touch_contact_set() {
        let mut world = BoxWorld::new();
        world.add_floor(0.0);
        let tracker = GroundContactTracker::new(0.5, []);
        let probe = GroundProbe::default();

        assert!(probe.check(&world, Vec3::ZERO));
        assert!(!probe.check(&world, Vec3::Y * 2.0));
        assert!(!tracker.is_grounded());
    }
}
