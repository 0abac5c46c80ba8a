use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::buffs::{BuffKind, BuffLedger, EffectiveBuff};
use crate::error::{CraftError, Result};
use crate::state::CraftState;
use crate::stats::CrafterStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionId {
    BasicSynthesis,
    CarefulSynthesis,
    RapidSynthesis,
    FocusedSynthesis,
    Groundwork,
    PrudentSynthesis,
    MuscleMemory,
    IntensiveSynthesis,
    BasicTouch,
    HastyTouch,
    StandardTouch,
    AdvancedTouch,
    FocusedTouch,
    PrudentTouch,
    PreparatoryTouch,
    PreciseTouch,
    Reflect,
    TrainedFinesse,
    ByregotsBlessing,
    Innovation,
    Veneration,
    GreatStrides,
    WasteNot,
    WasteNotII,
    SteadyHand,
    TricksOfTheTrade,
    Rumination,
    MastersMend,
    HeartAndSoul,
    Observe,
}

impl ActionId {
    /// Stable string form used in saved rotations.
    pub fn key(self) -> &'static str {
        action(self).key
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(action(*self).name)
    }
}

impl FromStr for ActionId {
    type Err = CraftError;

    fn from_str(s: &str) -> Result<ActionId> {
        ACTIONS
            .iter()
            .find(|a| a.key == s)
            .map(|a| a.id)
            .ok_or_else(|| CraftError::UnknownAction(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCategory {
    Progression,
    Quality,
    Buff,
    CpRecovery,
    Repair,
    Specialty,
    Other,
}

/// Why an action could not be used on a given step. Skipped steps cost
/// nothing and are kept in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    LevelTooLow { required: u32 },
    SpecialistOnly,
    FirstStepOnly,
    AlreadyUsed,
    MissingBuff(BuffKind),
    ConflictingBuff(BuffKind),
    NotEnoughInnerQuiet { required: u8 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::LevelTooLow { required } => write!(f, "requires level {}", required),
            SkipReason::SpecialistOnly => f.write_str("specialists only"),
            SkipReason::FirstStepOnly => f.write_str("only usable on the first step"),
            SkipReason::AlreadyUsed => f.write_str("already used this craft"),
            SkipReason::MissingBuff(kind) => write!(f, "requires {:?}", kind),
            SkipReason::ConflictingBuff(kind) => write!(f, "unusable under {:?}", kind),
            SkipReason::NotEnoughInnerQuiet { required } => {
                write!(f, "requires {} Inner Quiet", required)
            }
        }
    }
}

/// What a successful action does to the craft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effect {
    pub progress: u32,
    pub quality: u32,
    pub durability_restored: u32,
    pub cp_restored: u32,
    pub grants: Vec<EffectiveBuff>,
    pub consumes: Vec<BuffKind>,
}

/// Inputs to an effect function for one step.
pub struct EffectContext<'a> {
    pub state: &'a CraftState,
    /// Buffs that apply to this step, as returned by the ledger tick.
    pub buffs: &'a BuffLedger,
    pub base_progress: u32,
    pub base_quality: u32,
    /// Durability this action will cost, after Waste Not.
    pub durability_cost: u32,
}

impl EffectContext<'_> {
    fn progress(&self, efficiency: u32, effect: &mut Effect) -> u32 {
        let mut multiplier = 2;
        if self.buffs.is_active(BuffKind::Veneration) {
            multiplier += 1;
        }
        if self.buffs.is_active(BuffKind::MuscleMemory) {
            multiplier += 2;
            effect.consumes.push(BuffKind::MuscleMemory);
        }
        let progress = self.base_progress as u64 * efficiency as u64 * multiplier / 200;
        u32::try_from(progress).unwrap_or(u32::MAX)
    }

    fn quality(&self, efficiency: u32, effect: &mut Effect) -> u32 {
        let inner_quiet = self.buffs.stacks(BuffKind::InnerQuiet) as u64;
        let mut multiplier = 2;
        if self.buffs.is_active(BuffKind::Innovation) {
            multiplier += 1;
        }
        if self.buffs.is_active(BuffKind::GreatStrides) {
            multiplier += 2;
            effect.consumes.push(BuffKind::GreatStrides);
        }
        let quality =
            self.base_quality as u64 * efficiency as u64 * (10 + inner_quiet) * multiplier / 2000;
        u32::try_from(quality).unwrap_or(u32::MAX)
    }
}

type CostFn = fn(&CraftingAction, &CraftState) -> u32;
type SuccessFn = fn(&CraftingAction, &CraftState) -> f64;
type RequirementFn = fn(&CraftState) -> std::result::Result<(), SkipReason>;
type EffectFn = fn(&CraftingAction, &EffectContext<'_>) -> Effect;

/// A catalog entry: static numbers plus the three behaviours the state
/// machine needs (cost, success chance, effect).
pub struct CraftingAction {
    pub id: ActionId,
    pub key: &'static str,
    pub name: &'static str,
    pub category: ActionCategory,
    pub level: u32,
    /// Percent of base progress or quality.
    pub efficiency: u32,
    pub durability: u32,
    pub cp: u32,
    pub probability: f64,
    pub specialist: bool,
    pub grants: Option<(BuffKind, u8)>,
    cost: CostFn,
    success: SuccessFn,
    requirement: RequirementFn,
    effect: EffectFn,
}

impl fmt::Debug for CraftingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CraftingAction")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("cp", &self.cp)
            .field("probability", &self.probability)
            .finish()
    }
}

impl PartialEq for CraftingAction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl CraftingAction {
    #[allow(clippy::too_many_arguments)]
    const fn new(
        id: ActionId,
        key: &'static str,
        name: &'static str,
        category: ActionCategory,
        level: u32,
        efficiency: u32,
        durability: u32,
        cp: u32,
        probability: f64,
        effect: EffectFn,
    ) -> CraftingAction {
        CraftingAction {
            id,
            key,
            name,
            category,
            level,
            efficiency,
            durability,
            cp,
            probability,
            specialist: false,
            grants: None,
            cost: flat_cost,
            success: flat_success,
            requirement: no_requirement,
            effect,
        }
    }

    const fn buff(
        id: ActionId,
        key: &'static str,
        name: &'static str,
        level: u32,
        cp: u32,
        kind: BuffKind,
        turns: u8,
    ) -> CraftingAction {
        let category = ActionCategory::Buff;
        CraftingAction {
            grants: Some((kind, turns)),
            ..CraftingAction::new(id, key, name, category, level, 0, 0, cp, 1.0, apply_buff)
        }
    }

    const fn with_cost(self, cost: CostFn) -> CraftingAction {
        CraftingAction { cost, ..self }
    }

    const fn with_success(self, success: SuccessFn) -> CraftingAction {
        CraftingAction { success, ..self }
    }

    const fn with_requirement(self, requirement: RequirementFn) -> CraftingAction {
        CraftingAction { requirement, ..self }
    }

    const fn specialist_only(self) -> CraftingAction {
        CraftingAction { specialist: true, ..self }
    }

    pub fn cp_cost(&self, state: &CraftState) -> u32 {
        (self.cost)(self, state)
    }

    /// Success chance before any buff adjusts it.
    pub fn base_success(&self, state: &CraftState) -> f64 {
        (self.success)(self, state)
    }

    pub fn check(
        &self,
        state: &CraftState,
        stats: &CrafterStats,
    ) -> std::result::Result<(), SkipReason> {
        if stats.level < self.level {
            return Err(SkipReason::LevelTooLow { required: self.level });
        }
        if self.specialist && !stats.specialist {
            return Err(SkipReason::SpecialistOnly);
        }
        (self.requirement)(state)
    }

    pub fn compute(&self, ctx: &EffectContext<'_>) -> Effect {
        (self.effect)(self, ctx)
    }
}

fn flat_cost(action: &CraftingAction, _state: &CraftState) -> u32 {
    action.cp
}

fn standard_touch_cost(action: &CraftingAction, state: &CraftState) -> u32 {
    if state.last_action == Some(ActionId::BasicTouch) {
        18
    } else {
        action.cp
    }
}

fn advanced_touch_cost(action: &CraftingAction, state: &CraftState) -> u32 {
    if state.last_action == Some(ActionId::StandardTouch) {
        18
    } else {
        action.cp
    }
}

fn flat_success(action: &CraftingAction, _state: &CraftState) -> f64 {
    action.probability
}

fn observed_success(action: &CraftingAction, state: &CraftState) -> f64 {
    if state.last_action == Some(ActionId::Observe) {
        1.0
    } else {
        action.probability
    }
}

fn no_requirement(_state: &CraftState) -> std::result::Result<(), SkipReason> {
    Ok(())
}

fn first_step(state: &CraftState) -> std::result::Result<(), SkipReason> {
    if state.step == 0 {
        Ok(())
    } else {
        Err(SkipReason::FirstStepOnly)
    }
}

fn outside_waste_not(state: &CraftState) -> std::result::Result<(), SkipReason> {
    if state.buffs.is_active(BuffKind::WasteNot) {
        Err(SkipReason::ConflictingBuff(BuffKind::WasteNot))
    } else {
        Ok(())
    }
}

fn heart_and_soul_active(state: &CraftState) -> std::result::Result<(), SkipReason> {
    if state.buffs.is_active(BuffKind::HeartAndSoul) {
        Ok(())
    } else {
        Err(SkipReason::MissingBuff(BuffKind::HeartAndSoul))
    }
}

fn heart_and_soul_unused(state: &CraftState) -> std::result::Result<(), SkipReason> {
    if state.heart_and_soul_used {
        Err(SkipReason::AlreadyUsed)
    } else {
        Ok(())
    }
}

fn some_inner_quiet(state: &CraftState) -> std::result::Result<(), SkipReason> {
    if state.buffs.stacks(BuffKind::InnerQuiet) >= 1 {
        Ok(())
    } else {
        Err(SkipReason::NotEnoughInnerQuiet { required: 1 })
    }
}

fn full_inner_quiet(state: &CraftState) -> std::result::Result<(), SkipReason> {
    if state.buffs.stacks(BuffKind::InnerQuiet) >= 10 {
        Ok(())
    } else {
        Err(SkipReason::NotEnoughInnerQuiet { required: 10 })
    }
}

fn synthesis(action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    let mut effect = Effect::default();
    let progress = ctx.progress(action.efficiency, &mut effect);
    effect.progress = progress;
    effect
}

fn groundwork(action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    let efficiency = if (ctx.state.durability as i64) < ctx.durability_cost as i64 {
        action.efficiency / 2
    } else {
        action.efficiency
    };
    let mut effect = Effect::default();
    let progress = ctx.progress(efficiency, &mut effect);
    effect.progress = progress;
    effect
}

fn muscle_memory(action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    let mut effect = synthesis(action, ctx);
    effect.grants.push(EffectiveBuff::timed(BuffKind::MuscleMemory, 5));
    effect
}

fn intensive_synthesis(action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    let mut effect = synthesis(action, ctx);
    effect.consumes.push(BuffKind::HeartAndSoul);
    effect
}

fn touch_with(efficiency: u32, inner_quiet: u8, ctx: &EffectContext<'_>) -> Effect {
    let mut effect = Effect::default();
    let quality = ctx.quality(efficiency, &mut effect);
    effect.quality = quality;
    effect.grants.push(EffectiveBuff::stacked(BuffKind::InnerQuiet, inner_quiet));
    effect
}

fn touch(action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    touch_with(action.efficiency, 1, ctx)
}

fn deep_touch(action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    touch_with(action.efficiency, 2, ctx)
}

fn precise_touch(action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    let mut effect = deep_touch(action, ctx);
    effect.consumes.push(BuffKind::HeartAndSoul);
    effect
}

fn byregots_blessing(action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    let stacks = ctx.buffs.stacks(BuffKind::InnerQuiet) as u32;
    let mut effect = Effect::default();
    let quality = ctx.quality(action.efficiency + 20 * stacks, &mut effect);
    effect.quality = quality;
    effect.consumes.push(BuffKind::InnerQuiet);
    effect
}

fn apply_buff(action: &CraftingAction, _ctx: &EffectContext<'_>) -> Effect {
    let mut effect = Effect::default();
    if let Some((kind, turns)) = action.grants {
        effect.grants.push(EffectiveBuff::timed(kind, turns));
    }
    effect
}

fn heart_and_soul(_action: &CraftingAction, _ctx: &EffectContext<'_>) -> Effect {
    Effect {
        grants: vec![EffectiveBuff::lasting(BuffKind::HeartAndSoul)],
        ..Effect::default()
    }
}

fn tricks_of_the_trade(_action: &CraftingAction, _ctx: &EffectContext<'_>) -> Effect {
    Effect {
        cp_restored: 20,
        consumes: vec![BuffKind::HeartAndSoul],
        ..Effect::default()
    }
}

fn rumination(_action: &CraftingAction, ctx: &EffectContext<'_>) -> Effect {
    let stacks = ctx.buffs.stacks(BuffKind::InnerQuiet) as u32;
    Effect {
        cp_restored: (21 * stacks + 10 - stacks * stacks) / 2,
        consumes: vec![BuffKind::InnerQuiet],
        ..Effect::default()
    }
}

fn masters_mend(_action: &CraftingAction, _ctx: &EffectContext<'_>) -> Effect {
    Effect {
        durability_restored: 30,
        ..Effect::default()
    }
}

fn observe(_action: &CraftingAction, _ctx: &EffectContext<'_>) -> Effect {
    Effect::default()
}

use ActionCategory::*;

// id, key, name, category, level, efficiency, durability, cp, success, effect
#[rustfmt::skip]
pub static ACTIONS: [CraftingAction; 30] = [
    CraftingAction::new(ActionId::BasicSynthesis, "BasicSynthesis", "Basic Synthesis", Progression, 1, 120, 10, 0, 1.0, synthesis),
    CraftingAction::new(ActionId::CarefulSynthesis, "CarefulSynthesis", "Careful Synthesis", Progression, 62, 180, 10, 7, 1.0, synthesis),
    CraftingAction::new(ActionId::RapidSynthesis, "RapidSynthesis", "Rapid Synthesis", Progression, 9, 500, 10, 0, 0.5, synthesis),
    CraftingAction::new(ActionId::FocusedSynthesis, "FocusedSynthesis", "Focused Synthesis", Progression, 67, 200, 10, 5, 0.5, synthesis)
        .with_success(observed_success),
    CraftingAction::new(ActionId::Groundwork, "Groundwork", "Groundwork", Progression, 72, 360, 20, 18, 1.0, groundwork),
    CraftingAction::new(ActionId::PrudentSynthesis, "PrudentSynthesis", "Prudent Synthesis", Progression, 88, 180, 5, 18, 1.0, synthesis)
        .with_requirement(outside_waste_not),
    CraftingAction::new(ActionId::MuscleMemory, "MuscleMemory", "Muscle Memory", Progression, 54, 300, 10, 6, 1.0, muscle_memory)
        .with_requirement(first_step),
    CraftingAction::new(ActionId::IntensiveSynthesis, "IntensiveSynthesis", "Intensive Synthesis", Progression, 78, 400, 10, 6, 1.0, intensive_synthesis)
        .with_requirement(heart_and_soul_active),
    CraftingAction::new(ActionId::BasicTouch, "BasicTouch", "Basic Touch", Quality, 5, 100, 10, 18, 1.0, touch),
    CraftingAction::new(ActionId::HastyTouch, "HastyTouch", "Hasty Touch", Quality, 9, 100, 10, 0, 0.6, touch),
    CraftingAction::new(ActionId::StandardTouch, "StandardTouch", "Standard Touch", Quality, 18, 125, 10, 32, 1.0, touch)
        .with_cost(standard_touch_cost),
    CraftingAction::new(ActionId::AdvancedTouch, "AdvancedTouch", "Advanced Touch", Quality, 84, 150, 10, 46, 1.0, touch)
        .with_cost(advanced_touch_cost),
    CraftingAction::new(ActionId::FocusedTouch, "FocusedTouch", "Focused Touch", Quality, 68, 150, 10, 18, 0.5, touch)
        .with_success(observed_success),
    CraftingAction::new(ActionId::PrudentTouch, "PrudentTouch", "Prudent Touch", Quality, 66, 100, 5, 25, 1.0, touch)
        .with_requirement(outside_waste_not),
    CraftingAction::new(ActionId::PreparatoryTouch, "PreparatoryTouch", "Preparatory Touch", Quality, 71, 200, 20, 40, 1.0, deep_touch),
    CraftingAction::new(ActionId::PreciseTouch, "PreciseTouch", "Precise Touch", Quality, 53, 150, 10, 18, 1.0, precise_touch)
        .with_requirement(heart_and_soul_active),
    CraftingAction::new(ActionId::Reflect, "Reflect", "Reflect", Quality, 69, 100, 10, 6, 1.0, deep_touch)
        .with_requirement(first_step),
    CraftingAction::new(ActionId::TrainedFinesse, "TrainedFinesse", "Trained Finesse", Quality, 90, 100, 0, 32, 1.0, touch)
        .with_requirement(full_inner_quiet),
    CraftingAction::new(ActionId::ByregotsBlessing, "ByregotsBlessing", "Byregot's Blessing", Quality, 50, 100, 10, 24, 1.0, byregots_blessing)
        .with_requirement(some_inner_quiet),
    CraftingAction::buff(ActionId::Innovation, "Innovation", "Innovation", 26, 18, BuffKind::Innovation, 4),
    CraftingAction::buff(ActionId::Veneration, "Veneration", "Veneration", 15, 18, BuffKind::Veneration, 4),
    CraftingAction::buff(ActionId::GreatStrides, "GreatStrides", "Great Strides", 21, 32, BuffKind::GreatStrides, 3),
    CraftingAction::buff(ActionId::WasteNot, "WasteNot", "Waste Not", 15, 56, BuffKind::WasteNot, 4),
    CraftingAction::buff(ActionId::WasteNotII, "WasteNotII", "Waste Not II", 47, 98, BuffKind::WasteNot, 8),
    CraftingAction::buff(ActionId::SteadyHand, "SteadyHand", "Steady Hand", 9, 22, BuffKind::SteadyHand, 5),
    CraftingAction::new(ActionId::TricksOfTheTrade, "TricksOfTheTrade", "Tricks of the Trade", CpRecovery, 13, 0, 0, 0, 1.0, tricks_of_the_trade)
        .with_requirement(heart_and_soul_active),
    CraftingAction::new(ActionId::Rumination, "Rumination", "Rumination", CpRecovery, 15, 0, 0, 0, 1.0, rumination)
        .with_requirement(some_inner_quiet),
    CraftingAction::new(ActionId::MastersMend, "MastersMend", "Master's Mend", Repair, 7, 0, 0, 88, 1.0, masters_mend),
    CraftingAction::new(ActionId::HeartAndSoul, "HeartAndSoul", "Heart and Soul", Specialty, 86, 0, 0, 0, 1.0, heart_and_soul)
        .with_requirement(heart_and_soul_unused)
        .specialist_only(),
    CraftingAction::new(ActionId::Observe, "Observe", "Observe", Other, 13, 0, 0, 7, 1.0, observe),
];

/// Static definition for an id, independent of any catalog filtering.
pub fn action(id: ActionId) -> &'static CraftingAction {
    // ACTIONS is declared in enum order
    &ACTIONS[id as usize]
}

/// The set of actions a rotation may reference.
#[derive(Debug, Clone)]
pub struct Catalog {
    actions: Vec<&'static CraftingAction>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::standard()
    }
}

impl Catalog {
    pub fn standard() -> Catalog {
        Catalog {
            actions: ACTIONS.iter().collect(),
        }
    }

    /// Only the actions a crafter of `level` has learned.
    pub fn for_level(level: u32) -> Catalog {
        Catalog {
            actions: ACTIONS.iter().filter(|a| a.level <= level).collect(),
        }
    }

    pub fn lookup(&self, id: ActionId) -> Result<&'static CraftingAction> {
        self.actions
            .iter()
            .copied()
            .find(|a| a.id == id)
            .ok_or(CraftError::NotFound(id))
    }

    pub fn by_category(&self, category: ActionCategory) -> Vec<&'static CraftingAction> {
        self.actions.iter().copied().filter(|a| a.category == category).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static CraftingAction> + '_ {
        self.actions.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn serialize(actions: &[&CraftingAction]) -> Vec<ActionId> {
        actions.iter().map(|a| a.id).collect()
    }

    pub fn deserialize(&self, ids: &[ActionId]) -> Result<Vec<&'static CraftingAction>> {
        ids.iter()
            .map(|id| {
                self.lookup(*id).map_err(|_| CraftError::UnknownAction(id.key().to_string()))
            })
            .collect()
    }

    /// Same as [`Catalog::deserialize`] for the string keys found in saved data.
    pub fn deserialize_keys<S: AsRef<str>>(
        &self,
        keys: &[S],
    ) -> Result<Vec<&'static CraftingAction>> {
        keys.iter()
            .map(|key| {
                let id: ActionId = key.as_ref().parse()?;
                self.lookup(id).map_err(|_| CraftError::UnknownAction(key.as_ref().to_string()))
            })
            .collect()
    }
}
