use serde::{Deserialize, Serialize};

use crate::actions::{Catalog, CraftingAction};
use crate::error::Result;
use crate::recipe::Recipe;
use crate::stats::GearSet;

/// A rotation as handed to storage: action keys only, every bit of state is
/// recomputed by replaying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub rotation: Vec<String>,
    pub recipe: Recipe,
    /// Only set for custom rotations that carry their own stats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<GearSet>,
}

impl SavedRotation {
    pub fn new(recipe: Recipe, actions: &[&CraftingAction]) -> SavedRotation {
        SavedRotation {
            key: None,
            rotation: keys(actions),
            recipe,
            stats: None,
        }
    }

    pub fn custom(recipe: Recipe, actions: &[&CraftingAction], stats: GearSet) -> SavedRotation {
        SavedRotation {
            stats: Some(stats),
            ..SavedRotation::new(recipe, actions)
        }
    }

    /// Resolves the stored keys. Any key the catalog does not know fails the
    /// whole rotation.
    pub fn actions(&self, catalog: &Catalog) -> Result<Vec<&'static CraftingAction>> {
        catalog.deserialize_keys(&self.rotation)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<SavedRotation> {
        Ok(serde_json::from_str(json)?)
    }
}

fn keys(actions: &[&CraftingAction]) -> Vec<String> {
    Catalog::serialize(actions).into_iter().map(|id| id.key().to_string()).collect()
}
