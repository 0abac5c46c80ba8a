use serde::{Deserialize, Serialize};

use crate::error::{CraftError, Result};
use crate::stats::CrafterStats;

/// Ingredient ids up to this value are crystals and shards, which have no HQ
/// variant.
pub const MAX_CRYSTAL_ID: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: u32,
    pub amount: u32,
    /// Starting quality granted per unit supplied HQ.
    #[serde(default)]
    pub quality: u32,
}

/// How many units of an ingredient the crafter supplies at high quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HqIngredient {
    pub id: u32,
    pub amount: u32,
}

/// Editable HQ slot for an ingredient: current amount and how far it can go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HqIngredientSlot {
    pub id: u32,
    pub amount: u32,
    pub max: u32,
    pub quality: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub job: u32,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub rlvl: u32,
    #[serde(default)]
    pub stars: u8,
    pub progress: u32,
    pub quality: u32,
    pub durability: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default = "Recipe::default_progress_divider")]
    pub progress_divider: u32,
    #[serde(default = "Recipe::default_quality_divider")]
    pub quality_divider: u32,
    #[serde(default = "Recipe::default_modifier")]
    pub progress_modifier: u32,
    #[serde(default = "Recipe::default_modifier")]
    pub quality_modifier: u32,
}

impl Recipe {
    const fn default_progress_divider() -> u32 {
        130
    }

    const fn default_quality_divider() -> u32 {
        115
    }

    const fn default_modifier() -> u32 {
        100
    }

    /// A recipe with no ingredients and the default divider/modifier pair.
    pub fn new(progress: u32, quality: u32, durability: u32) -> Recipe {
        Recipe {
            job: 0,
            level: 1,
            rlvl: 1,
            stars: 0,
            progress,
            quality,
            durability,
            ingredients: Vec::new(),
            progress_divider: Self::default_progress_divider(),
            quality_divider: Self::default_quality_divider(),
            progress_modifier: Self::default_modifier(),
            quality_modifier: Self::default_modifier(),
        }
    }

    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Recipe {
        self.ingredients = ingredients;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress == 0 {
            return Err(CraftError::invalid("progress", "recipe progress must be positive"));
        }
        if self.durability == 0 {
            return Err(CraftError::invalid("durability", "recipe durability must be positive"));
        }
        if self.progress_divider == 0 || self.quality_divider == 0 {
            return Err(CraftError::invalid("divider", "recipe dividers must be positive"));
        }
        Ok(())
    }

    /// Progress gained by a 100% efficiency action.
    pub fn base_progress(&self, stats: &CrafterStats) -> u32 {
        let modifier = if stats.clvl() <= self.rlvl {
            self.progress_modifier
        } else {
            100
        };
        let divider = self.progress_divider as u64;
        let num = (stats.craftsmanship as u64 * 10 + 2 * divider) * modifier as u64;
        u32::try_from(num / (divider * 100)).unwrap_or(u32::MAX)
    }

    /// Quality gained by a 100% efficiency action with no buffs.
    pub fn base_quality(&self, stats: &CrafterStats) -> u32 {
        let modifier = if stats.clvl() <= self.rlvl {
            self.quality_modifier
        } else {
            100
        };
        let divider = self.quality_divider as u64;
        let num = (stats.control as u64 * 10 + 35 * divider) * modifier as u64;
        u32::try_from(num / (divider * 100)).unwrap_or(u32::MAX)
    }

    pub fn hq_ingredient_slots(&self) -> Vec<HqIngredientSlot> {
        self.ingredients
            .iter()
            .filter(|i| i.id > MAX_CRYSTAL_ID)
            .map(|i| HqIngredientSlot {
                id: i.id,
                amount: 0,
                max: i.amount,
                quality: i.quality,
            })
            .collect()
    }

    /// Quality the craft starts with, given the HQ ingredients supplied.
    pub fn starting_quality(&self, hq: &[HqIngredient]) -> Result<u32> {
        let mut total: u64 = 0;
        for supplied in hq {
            let ingredient = self
                .ingredients
                .iter()
                .find(|i| i.id == supplied.id)
                .ok_or_else(|| {
                    let reason = format!("ingredient {} is not in the recipe", supplied.id);
                    CraftError::invalid("hq_ingredients", reason)
                })?;
            if supplied.amount > ingredient.amount {
                return Err(CraftError::invalid(
                    "hq_ingredients",
                    format!(
                        "{} HQ units of {} supplied, recipe needs {}",
                        supplied.amount, supplied.id, ingredient.amount
                    ),
                ));
            }
            if supplied.amount > 0 && ingredient.id <= MAX_CRYSTAL_ID {
                let reason = format!("ingredient {} has no HQ variant", supplied.id);
                return Err(CraftError::invalid("hq_ingredients", reason));
            }
            total += supplied.amount as u64 * ingredient.quality as u64;
        }
        Ok(total.min(self.quality as u64) as u32)
    }
}
