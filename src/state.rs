use std::fmt;

use log::{debug, warn};
use rand::Rng;
use serde::Serialize;

use crate::actions::{ActionCategory, ActionId, CraftingAction, EffectContext, SkipReason};
use crate::buffs::{BuffKind, BuffLedger, EffectiveBuff};
use crate::recipe::Recipe;
use crate::stats::CrafterStats;

/// Success chance added by Steady Hand.
pub const STEADY_HAND_BONUS: f64 = 0.2;

/// Read-only inputs shared by every step of a run.
#[derive(Debug, Clone, Copy)]
pub struct CraftContext<'a> {
    pub recipe: &'a Recipe,
    pub stats: &'a CrafterStats,
    pub base_progress: u32,
    pub base_quality: u32,
    /// Treat every roll as a success.
    pub assume_success: bool,
}

impl<'a> CraftContext<'a> {
    pub fn new(recipe: &'a Recipe, stats: &'a CrafterStats) -> CraftContext<'a> {
        CraftContext {
            recipe,
            stats,
            base_progress: recipe.base_progress(stats),
            base_quality: recipe.base_quality(stats),
            assume_success: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    Success,
    Failure,
    Skipped(SkipReason),
    /// Not enough CP or durability left; the run stops here.
    InsufficientResources,
}

/// One applied action and what it changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub action: ActionId,
    pub status: StepStatus,
    pub probability: f64,
    pub progress: u32,
    pub quality: u32,
    pub durability: i32,
    pub cp: i32,
    pub buffs: Vec<EffectiveBuff>,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Success
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            StepStatus::Success => "ok".to_string(),
            StepStatus::Failure => "FAILED".to_string(),
            StepStatus::Skipped(reason) => format!("skipped: {}", reason),
            StepStatus::InsufficientResources => "not enough resources".to_string(),
        };
        write!(
            f,
            "{:20} {:>3.0}% P+{:<5} Q+{:<5} D{:+} CP{:+} {}",
            self.action.to_string(),
            self.probability * 100.,
            self.progress,
            self.quality,
            self.durability,
            self.cp,
            status
        )
    }
}

/// The mutable half of a simulation. Owned by a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CraftState {
    pub progress: u32,
    pub quality: u32,
    pub durability: i32,
    pub cp: u32,
    pub step: u32,
    pub buffs: BuffLedger,
    /// Previous action if it succeeded, for combos.
    pub last_action: Option<ActionId>,
    pub heart_and_soul_used: bool,
}

impl CraftState {
    pub fn new(durability: i32, cp: u32, quality: u32) -> CraftState {
        CraftState {
            durability,
            cp,
            quality,
            ..CraftState::default()
        }
    }

    pub fn initial(recipe: &Recipe, stats: &CrafterStats, starting_quality: u32) -> CraftState {
        CraftState::new(recipe.durability as i32, stats.cp, starting_quality.min(recipe.quality))
    }

    pub fn is_complete(&self, recipe: &Recipe) -> bool {
        self.progress >= recipe.progress
    }

    pub fn is_broken(&self) -> bool {
        self.durability <= 0
    }

    fn skipped(&self, action: &CraftingAction, status: StepStatus) -> StepOutcome {
        StepOutcome {
            action: action.id,
            status,
            probability: 0.,
            progress: 0,
            quality: 0,
            durability: 0,
            cp: 0,
            buffs: self.buffs.iter().copied().collect(),
        }
    }

    /// Applies one action. Unusable actions and unaffordable ones leave the
    /// state untouched; the caller decides whether the run goes on.
    pub fn apply_action<R: Rng>(
        &mut self,
        action: &CraftingAction,
        ctx: &CraftContext<'_>,
        rng: &mut R,
    ) -> StepOutcome {
        // resources first: an unaffordable action halts even if it is also unusable
        let cost = action.cp_cost(self);
        if self.is_broken() || self.cp < cost {
            debug!("step {}: {} needs {} CP, {} left", self.step + 1, action.id, cost, self.cp);
            return self.skipped(action, StepStatus::InsufficientResources);
        }
        if let Err(reason) = action.check(self, ctx.stats) {
            warn!("step {}: {} skipped, {}", self.step + 1, action.id, reason);
            return self.skipped(action, StepStatus::Skipped(reason));
        }
        let (progress, quality, durability, cp) =
            (self.progress, self.quality, self.durability, self.cp);

        self.cp -= cost;
        let active = self.buffs.tick();

        let mut probability = action.base_success(self);
        if active.is_active(BuffKind::SteadyHand) {
            probability += STEADY_HAND_BONUS;
        }
        let probability = probability.min(1.0);
        let success = ctx.assume_success || probability >= 1.0 || rng.gen::<f64>() < probability;

        let durability_cost = if active.is_active(BuffKind::WasteNot) {
            action.durability.div_ceil(2)
        } else {
            action.durability
        };

        if success {
            let effect = action.compute(&EffectContext {
                state: self,
                buffs: &active,
                base_progress: ctx.base_progress,
                base_quality: ctx.base_quality,
                durability_cost,
            });
            self.progress = self.progress.saturating_add(effect.progress).min(ctx.recipe.progress);
            self.quality = self.quality.saturating_add(effect.quality).min(ctx.recipe.quality);
            let worn = self.durability - durability_cost as i32;
            self.durability =
                (worn + effect.durability_restored as i32).min(ctx.recipe.durability as i32);
            self.cp = (self.cp + effect.cp_restored).min(ctx.stats.cp);
            for kind in effect.consumes {
                self.buffs.consume(kind);
            }
            for buff in effect.grants {
                self.buffs.add(buff);
            }
            if action.category == ActionCategory::Specialty {
                self.heart_and_soul_used = true;
            }
            self.last_action = Some(action.id);
        } else {
            self.durability -= durability_cost as i32;
            self.last_action = None;
        }
        self.step += 1;

        let outcome = StepOutcome {
            action: action.id,
            status: if success {
                StepStatus::Success
            } else {
                StepStatus::Failure
            },
            probability,
            progress: self.progress - progress,
            quality: self.quality - quality,
            durability: self.durability - durability,
            cp: self.cp as i32 - cp as i32,
            buffs: self.buffs.iter().copied().collect(),
        };
        debug!("step {}: {}", self.step, outcome);
        outcome
    }
}

impl fmt::Display for CraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S: {}, P: {}, Q: {}, D: {}, CP: {}, IQ: {}",
            self.step,
            self.progress,
            self.quality,
            self.durability,
            self.cp,
            self.buffs.stacks(BuffKind::InnerQuiet)
        )
    }
}
