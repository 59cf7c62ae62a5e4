use avian3d::prelude::*;
use bevy::prelude::*;
use thiserror::Error;

use super::contacts::{GroundContactTracker, GroundProbe};
use super::state::{Character, VisualRoot};

/// A character entity is missing something the controller cannot run without
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("character {0} has no body collider")]
    MissingBodyCollider(Entity),
    #[error("character {0} is not a dynamic rigid body")]
    NotDynamic(Entity),
    #[error("character {0} has no ground probe")]
    MissingGroundProbe(Entity),
    #[error("character {0} has no ground contact tracker")]
    MissingContactTracker(Entity),
    #[error("character {character} links visual root {root}, which does not follow it")]
    InvalidVisualRoot { character: Entity, root: Entity },
}

/// What a character entity was spawned with
#[derive(Debug, Clone, Copy)]
pub struct CharacterParts<'a> {
    pub has_collider: bool,
    pub rigid_body: Option<&'a RigidBody>,
    pub has_probe: bool,
    pub has_tracker: bool,
    pub visual_root: Option<&'a VisualRoot>,
}

/// Checks that a character has every collaborator the controller relies on
pub fn check_character(
    entity: Entity,
    character: &Character,
    parts: CharacterParts,
) -> Result<(), SetupError> {
    if !parts.has_collider {
        return Err(SetupError::MissingBodyCollider(entity));
    }
    if !matches!(parts.rigid_body, Some(RigidBody::Dynamic)) {
        return Err(SetupError::NotDynamic(entity));
    }
    if !parts.has_probe {
        return Err(SetupError::MissingGroundProbe(entity));
    }
    if !parts.has_tracker {
        return Err(SetupError::MissingContactTracker(entity));
    }
    match parts.visual_root {
        Some(root) if root.body == entity => Ok(()),
        _ => Err(SetupError::InvalidVisualRoot {
            character: entity,
            root: character.visual_root,
        }),
    }
}

/// Rejects newly spawned characters that are missing collaborators.
///
/// The error reaches Bevy's error handler, which panics by default.
pub fn validate_new_characters(
    characters: Query<
        (
            Entity,
            &Character,
            Has<Collider>,
            Option<&RigidBody>,
            Has<GroundProbe>,
            Has<GroundContactTracker>,
        ),
        Added<Character>,
    >,
    roots: Query<&VisualRoot>,
) -> Result {
    for (entity, character, has_collider, rigid_body, has_probe, has_tracker) in &characters {
        let parts = CharacterParts {
            has_collider,
            rigid_body,
            has_probe,
            has_tracker,
            visual_root: roots.get(character.visual_root).ok(),
        };
        check_character(entity, character, parts)?;
        info!("character {entity} ready");
    }
    Ok(())
}
