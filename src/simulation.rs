use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::actions::{ActionId, Catalog, CraftingAction};
use crate::error::{CraftError, Result};
use crate::recipe::{HqIngredient, Recipe};
use crate::reliability::DEFAULT_TRIALS;
use crate::state::{CraftContext, CraftState, StepOutcome, StepStatus};
use crate::stats::CrafterStats;

/// Upper bound on applied steps before a run is abandoned.
pub const DEFAULT_MAX_STEPS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    pub max_steps: u32,
    /// Success also requires reaching the recipe's quality.
    pub require_quality: bool,
    /// Every roll succeeds, for a deterministic preview of a rotation.
    pub assume_success: bool,
    pub seed: Option<u64>,
    pub trials: usize,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            max_steps: DEFAULT_MAX_STEPS,
            require_quality: false,
            assume_success: false,
            seed: None,
            trials: DEFAULT_TRIALS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TerminationReason {
    /// Progress reached the recipe target.
    Completed,
    DurabilityExhausted,
    /// The named action could not be paid for.
    InsufficientResources(ActionId),
    SafetyCeilingExceeded,
    /// Every action was applied and progress is still short.
    RotationExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub state: CraftState,
    pub success: bool,
    pub reason: TerminationReason,
    pub steps: Vec<StepOutcome>,
    pub hq_percent: u8,
}

/// Replays one rotation for one recipe and crafter.
#[derive(Debug, Clone)]
pub struct Simulation {
    recipe: Recipe,
    stats: CrafterStats,
    actions: Vec<&'static CraftingAction>,
    hq_ingredients: Vec<HqIngredient>,
    options: SimulationOptions,
    starting_quality: u32,
    state: CraftState,
    rng: ChaCha8Rng,
}

impl Simulation {
    pub fn new(
        recipe: Recipe,
        actions: Vec<&'static CraftingAction>,
        stats: CrafterStats,
        hq_ingredients: Vec<HqIngredient>,
    ) -> Result<Simulation> {
        let options = SimulationOptions::default();
        Simulation::with_options(recipe, actions, stats, hq_ingredients, options)
    }

    pub fn with_options(
        recipe: Recipe,
        actions: Vec<&'static CraftingAction>,
        stats: CrafterStats,
        hq_ingredients: Vec<HqIngredient>,
        options: SimulationOptions,
    ) -> Result<Simulation> {
        recipe.validate()?;
        stats.validate()?;
        if options.max_steps == 0 {
            return Err(CraftError::invalid("max_steps", "must be positive"));
        }
        let starting_quality = recipe.starting_quality(&hq_ingredients)?;
        let state = CraftState::initial(&recipe, &stats, starting_quality);
        let rng = match options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Simulation {
            recipe,
            stats,
            actions,
            hq_ingredients,
            options,
            starting_quality,
            state,
            rng,
        })
    }

    /// Builds a simulation from saved action ids.
    pub fn from_rotation(
        catalog: &Catalog,
        recipe: Recipe,
        rotation: &[ActionId],
        stats: CrafterStats,
        hq_ingredients: Vec<HqIngredient>,
    ) -> Result<Simulation> {
        let actions = catalog.deserialize(rotation)?;
        Simulation::new(recipe, actions, stats, hq_ingredients)
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn stats(&self) -> &CrafterStats {
        &self.stats
    }

    pub fn actions(&self) -> &[&'static CraftingAction] {
        &self.actions
    }

    pub fn rotation(&self) -> Vec<ActionId> {
        Catalog::serialize(&self.actions)
    }

    pub fn hq_ingredients(&self) -> &[HqIngredient] {
        &self.hq_ingredients
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    pub fn starting_quality(&self) -> u32 {
        self.starting_quality
    }

    pub fn state(&self) -> &CraftState {
        &self.state
    }

    pub fn context(&self) -> CraftContext<'_> {
        let mut ctx = CraftContext::new(&self.recipe, &self.stats);
        ctx.assume_success = self.options.assume_success;
        ctx
    }

    /// State the craft is in before the first action.
    pub fn initial_state(&self) -> CraftState {
        CraftState::initial(&self.recipe, &self.stats, self.starting_quality)
    }

    pub fn reset(&mut self) {
        self.state = self.initial_state();
    }

    /// Applies the rotation to the current state, drawing rolls from the
    /// simulation's own generator.
    pub fn run(&mut self, collect_trace: bool) -> SimulationResult {
        let mut rng = self.rng.clone();
        let result = self.run_with(&mut rng, collect_trace);
        self.rng = rng;
        result
    }

    pub fn run_with<R: Rng>(&mut self, rng: &mut R, collect_trace: bool) -> SimulationResult {
        let mut state = std::mem::take(&mut self.state);
        let result = self.play(&mut state, rng, collect_trace);
        self.state = state;
        result
    }

    pub(crate) fn play<R: Rng>(
        &self,
        state: &mut CraftState,
        rng: &mut R,
        collect_trace: bool,
    ) -> SimulationResult {
        let ctx = self.context();
        let mut steps = Vec::new();
        let mut reason = TerminationReason::RotationExhausted;
        for action in &self.actions {
            let outcome = state.apply_action(action, &ctx, rng);
            let halted = outcome.status == StepStatus::InsufficientResources;
            if collect_trace {
                steps.push(outcome);
            }
            if halted {
                reason = TerminationReason::InsufficientResources(action.id);
                break;
            }
            if let Some(terminal) = self.terminal(state) {
                reason = terminal;
                break;
            }
        }
        let success = reason == TerminationReason::Completed
            && (!self.options.require_quality || state.quality >= self.recipe.quality);
        let hq_percent = hq_percent(state.quality, self.recipe.quality);
        if collect_trace {
            info!("{:?} after {} steps, success: {}, {}", reason, state.step, success, state);
        } else {
            debug!("{:?} after {} steps, success: {}", reason, state.step, success);
        }
        SimulationResult {
            state: state.clone(),
            success,
            reason,
            steps,
            hq_percent,
        }
    }

    fn terminal(&self, state: &CraftState) -> Option<TerminationReason> {
        if state.is_complete(&self.recipe) {
            Some(TerminationReason::Completed)
        } else if state.is_broken() {
            Some(TerminationReason::DurabilityExhausted)
        } else if state.step > self.options.max_steps {
            Some(TerminationReason::SafetyCeilingExceeded)
        } else {
            None
        }
    }
}

/// Chance of an HQ result by percentage of max quality reached.
const HQ_TABLE: [u8; 101] = [
    1, 1, 1, 1, 1, 2, 2, 2, 2, 3,
    3, 3, 3, 4, 4, 4, 4, 5, 5, 5,
    5, 6, 6, 6, 6, 7, 7, 7, 7, 8,
    8, 8, 9, 9, 9, 10, 10, 10, 11, 11,
    11, 12, 12, 12, 13, 13, 13, 14, 14, 14,
    15, 15, 15, 16, 16, 17, 17, 17, 18, 18,
    18, 19, 19, 20, 20, 21, 22, 23, 24, 26,
    28, 31, 34, 38, 42, 47, 52, 58, 64, 68,
    71, 74, 76, 78, 80, 81, 82, 83, 84, 85,
    86, 87, 88, 89, 90, 91, 92, 94, 96, 98,
    100,
];

/// HQ chance for `quality` out of `max_quality`. Recipes without quality
/// never come out HQ.
pub fn hq_percent(quality: u32, max_quality: u32) -> u8 {
    if max_quality == 0 {
        return 0;
    }
    let ratio = (quality.min(max_quality) as u64 * 100 / max_quality as u64) as usize;
    HQ_TABLE[ratio]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::Ingredient;

    fn stats() -> CrafterStats {
        CrafterStats::new(8, 1300, 1150, 500, 90, false)
    }

    fn sim(recipe: Recipe, ids: &[ActionId]) -> Simulation {
        let options = SimulationOptions { seed: Some(11), ..SimulationOptions::default() };
        let actions = Catalog::standard().deserialize(ids).unwrap();
        Simulation::with_options(recipe, actions, stats(), Vec::new(), options).unwrap()
    }

    #[test]
    fn hq_table_endpoints() {
        assert_eq!(hq_percent(0, 1000), 1);
        assert_eq!(hq_percent(1000, 1000), 100);
        assert_eq!(hq_percent(5000, 1000), 100);
        assert_eq!(hq_percent(500, 1000), 15);
        assert_eq!(hq_percent(10, 0), 0);
    }

    #[test]
    fn one_step_completion() {
        let mut s = sim(Recipe::new(122, 1000, 40), &[ActionId::BasicSynthesis; 2]);
        let result = s.run(true);
        assert!(result.success);
        assert_eq!(result.reason, TerminationReason::Completed);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.state.progress, 122);
    }

    #[test]
    fn progress_is_clamped() {
        let mut s = sim(Recipe::new(50, 1000, 40), &[ActionId::BasicSynthesis]);
        assert_eq!(s.run(false).state.progress, 50);
    }

    #[test]
    fn running_out_of_durability() {
        let mut s = sim(Recipe::new(5000, 1000, 20), &[ActionId::BasicSynthesis; 5]);
        let result = s.run(true);
        assert!(!result.success);
        assert_eq!(result.reason, TerminationReason::DurabilityExhausted);
        assert_eq!(result.steps.len(), 2);
    }

    #[test]
    fn unaffordable_action_halts() {
        let mut s = sim(Recipe::new(5000, 1000, 80), &[ActionId::MastersMend; 8]);
        let result = s.run(true);
        assert_eq!(result.reason, TerminationReason::InsufficientResources(ActionId::MastersMend));
        assert_eq!(result.state.step, 5);
        assert_eq!(result.steps.last().unwrap().status, StepStatus::InsufficientResources);
    }

    #[test]
    fn short_rotation_is_exhausted() {
        let mut s = sim(Recipe::new(5000, 1000, 80), &[ActionId::BasicSynthesis]);
        let result = s.run(false);
        assert_eq!(result.reason, TerminationReason::RotationExhausted);
        assert!(result.steps.is_empty());
    }

    #[test]
    fn quality_requirement() {
        let recipe = Recipe::new(122, 1000, 40);
        let options = SimulationOptions {
            require_quality: true,
            seed: Some(1),
            ..SimulationOptions::default()
        };
        let actions = Catalog::standard().deserialize(&[ActionId::BasicSynthesis]).unwrap();
        let mut s =
            Simulation::with_options(recipe, actions, stats(), Vec::new(), options).unwrap();
        let result = s.run(false);
        assert_eq!(result.reason, TerminationReason::Completed);
        assert!(!result.success);
    }

    #[test]
    fn reset_restores_initial_state() {
        let recipe = Recipe::new(5000, 10000, 80)
            .with_ingredients(vec![Ingredient { id: 100, amount: 2, quality: 300 }]);
        let actions = Catalog::standard().deserialize(&[ActionId::BasicTouch]).unwrap();
        let hq = vec![HqIngredient { id: 100, amount: 1 }];
        let mut s = Simulation::new(recipe, actions, stats(), hq).unwrap();
        assert_eq!(s.state().quality, 300);
        s.run(false);
        assert!(s.state().quality > 300);
        s.reset();
        assert_eq!(s.state(), &s.initial_state());
    }

    #[test]
    fn saved_ids_must_be_in_the_catalog() {
        let recipe = Recipe::new(5000, 1000, 80);
        let ids = [ActionId::BasicSynthesis, ActionId::Groundwork];
        let catalog = Catalog::standard();
        let sim = Simulation::from_rotation(&catalog, recipe.clone(), &ids, stats(), Vec::new())
            .unwrap();
        assert_eq!(sim.rotation(), ids);
        let early = Catalog::for_level(50);
        match Simulation::from_rotation(&early, recipe, &ids, stats(), Vec::new()) {
            Err(CraftError::UnknownAction(key)) => assert_eq!(key, "Groundwork"),
            other => panic!("unexpected {:?}", other.map(|s| s.rotation())),
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        let actions = Catalog::standard().deserialize(&[ActionId::BasicTouch]).unwrap();
        let brittle = Recipe::new(100, 100, 0);
        assert!(Simulation::new(brittle, actions.clone(), stats(), Vec::new()).is_err());
        let weak = CrafterStats::new(8, 0, 100, 100, 10, false);
        let recipe = Recipe::new(100, 100, 40);
        assert!(Simulation::new(recipe, actions.clone(), weak, Vec::new()).is_err());
        let hq = vec![HqIngredient { id: 9, amount: 1 }];
        assert!(matches!(
            Simulation::new(Recipe::new(100, 100, 40), actions, stats(), hq),
            Err(CraftError::InvalidInput { field: "hq_ingredients", .. })
        ));
    }
}
