use serde::Deserialize;

use crate::actions::Catalog;
use crate::error::Result;
use crate::recipe::{HqIngredient, Recipe};
use crate::simulation::{Simulation, SimulationOptions};
use crate::stats::{Consumable, CrafterStats, GearSet, Loadout};

/// Everything needed to simulate one craft, as read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub recipe: Recipe,
    #[serde(default)]
    pub gear: GearSet,
    #[serde(default)]
    pub food: Option<Consumable>,
    #[serde(default)]
    pub medicine: Option<Consumable>,
    pub rotation: Vec<String>,
    #[serde(default)]
    pub hq_ingredients: Vec<HqIngredient>,
    #[serde(default)]
    pub options: SimulationOptions,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Scenario> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn loadout(&self) -> Loadout {
        Loadout::new(self.food.clone(), self.medicine.clone())
    }

    pub fn stats(&self) -> CrafterStats {
        CrafterStats::from_gear_set(&self.gear, &self.loadout())
    }

    pub fn simulation(&self, catalog: &Catalog) -> Result<Simulation> {
        let actions = catalog.deserialize_keys(&self.rotation)?;
        Simulation::with_options(
            self.recipe.clone(),
            actions,
            self.stats(),
            self.hq_ingredients.clone(),
            self.options.clone(),
        )
    }
}
