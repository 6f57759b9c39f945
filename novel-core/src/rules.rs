//! Character state reducer.
//!
//! Every change to a character after creation goes through
//! [`apply_update`], whether it came from a storyteller directive or a
//! direct edit. The reducer owns the realm/stage invariant: after any
//! update, `character.stage` is one of `character.realm.stages()`.

use crate::world::{Character, Faction, Realm};
use serde::{Deserialize, Serialize};

/// A set of validated field changes. `None` leaves the field as is.
///
/// Name, age, personality and interests are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterUpdate {
    pub realm: Option<Realm>,
    pub stage: Option<String>,
    pub faction: Option<Faction>,
    pub location: Option<String>,
}

impl CharacterUpdate {
    pub fn is_empty(&self) -> bool {
        self.realm.is_none()
            && self.stage.is_none()
            && self.faction.is_none()
            && self.location.is_none()
    }

    pub fn with_realm(mut self, realm: Realm) -> Self {
        self.realm = Some(realm);
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_faction(mut self, faction: Faction) -> Self {
        self.faction = Some(faction);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Apply `update` to `character` as a single merge and return the result.
///
/// A stage that does not belong to the resulting realm is discarded. When the
/// realm changes and no valid stage is supplied, the stage resets to the first
/// stage of the new realm. Blank locations are ignored.
pub fn apply_update(character: &Character, update: &CharacterUpdate) -> Character {
    let mut next = character.clone();

    let realm = update.realm.unwrap_or(character.realm);
    let requested_stage = update
        .stage
        .as_deref()
        .and_then(|stage| realm.find_stage(stage));

    next.realm = realm;
    next.stage = match requested_stage {
        Some(stage) => stage.to_string(),
        None if realm != character.realm || !realm.has_stage(&character.stage) => {
            realm.first_stage().to_string()
        }
        None => character.stage.clone(),
    };

    if let Some(faction) = update.faction {
        next.faction = faction;
    }

    if let Some(location) = update.location.as_deref() {
        let location = location.trim();
        if !location.is_empty() {
            next.location = location.to_string();
        }
    }

    next
}
