//! Crafting simulator: applies a rotation of crafting actions to a recipe,
//! tracking progress, quality, durability, CP and buffs, and estimates how
//! reliable a rotation is over many randomized trials.

pub mod actions;
pub mod buffs;
pub mod error;
pub mod recipe;
pub mod reliability;
pub mod rotation;
pub mod scenario;
pub mod simulation;
pub mod state;
pub mod stats;

pub use actions::{ActionCategory, ActionId, Catalog, CraftingAction};
pub use buffs::{BuffKind, BuffLedger, EffectiveBuff, StackRule};
pub use error::CraftError;
pub use recipe::{HqIngredient, Ingredient, Recipe};
pub use reliability::{Distribution, SimulationReliabilityReport};
pub use rotation::SavedRotation;
pub use scenario::Scenario;
pub use simulation::{Simulation, SimulationOptions, SimulationResult, TerminationReason};
pub use state::{CraftState, StepOutcome, StepStatus};
pub use stats::{BonusKind, Consumable, ConsumableBonus, CrafterStats, GearSet, Loadout};
