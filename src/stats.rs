use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CraftError, Result};

/// Stats a crafter brings into a single craft. Built once per run from a
/// gear set and the active consumables, never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrafterStats {
    pub job: u32,
    pub craftsmanship: u32,
    pub control: u32,
    pub cp: u32,
    pub level: u32,
    pub specialist: bool,
}

impl CrafterStats {
    pub fn new(
        job: u32,
        craftsmanship: u32,
        control: u32,
        cp: u32,
        level: u32,
        specialist: bool,
    ) -> CrafterStats {
        CrafterStats {
            job,
            craftsmanship,
            control,
            cp,
            level,
            specialist,
        }
    }

    /// Applies the loadout's food and medicine bonuses on top of a gear set.
    pub fn from_gear_set(set: &GearSet, loadout: &Loadout) -> CrafterStats {
        CrafterStats {
            job: set.job_id,
            craftsmanship: set.craftsmanship
                + loadout.bonus_value(BonusKind::Craftsmanship, set.craftsmanship),
            control: set.control + loadout.bonus_value(BonusKind::Control, set.control),
            cp: set.cp + loadout.bonus_value(BonusKind::Cp, set.cp),
            level: set.level,
            specialist: set.specialist,
        }
    }

    /// Crafter level mapped onto the recipe level scale.
    pub fn clvl(&self) -> u32 {
        CLVL_TABLE[(self.level.clamp(1, 90) - 1) as usize]
    }

    pub fn validate(&self) -> Result<()> {
        if self.craftsmanship == 0 {
            return Err(CraftError::invalid("craftsmanship", "must be positive"));
        }
        if self.control == 0 {
            return Err(CraftError::invalid("control", "must be positive"));
        }
        if self.level == 0 {
            return Err(CraftError::invalid("level", "must be at least 1"));
        }
        Ok(())
    }
}

/// Raw gear stats as stored by the user, before consumables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearSet {
    pub job_id: u32,
    pub level: u32,
    pub craftsmanship: u32,
    pub control: u32,
    pub cp: u32,
    pub specialist: bool,
    pub ilvl: u32,
}

impl Default for GearSet {
    // Used when the user has no set saved for the recipe's job.
    fn default() -> Self {
        GearSet {
            job_id: 10,
            level: 70,
            craftsmanship: 1000,
            control: 1000,
            cp: 450,
            specialist: false,
            ilvl: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusKind {
    Craftsmanship,
    Control,
    #[serde(rename = "CP")]
    Cp,
}

/// Relative bonus with an absolute cap. `percent` is kept as an integer so
/// the ceil matches the game exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumableBonus {
    pub percent: u32,
    pub max: u32,
}

impl ConsumableBonus {
    pub fn new(percent: u32, max: u32) -> ConsumableBonus {
        ConsumableBonus { percent, max }
    }

    /// `min(ceil(base * value), max)`
    pub fn contribution(&self, base: u32) -> u32 {
        let raw = (base as u64 * self.percent as u64).div_ceil(100);
        raw.min(self.max as u64) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumable {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub hq: bool,
    pub bonuses: HashMap<BonusKind, ConsumableBonus>,
}

impl Consumable {
    pub fn get_bonus(&self, kind: BonusKind) -> Option<&ConsumableBonus> {
        self.bonuses.get(&kind)
    }
}

/// Base stat plus the capped contribution of every bonus that applies.
pub fn effective_stat<'a>(
    base: u32,
    bonuses: impl IntoIterator<Item = &'a ConsumableBonus>,
) -> u32 {
    base + bonuses.into_iter().map(|b| b.contribution(base)).sum::<u32>()
}

/// One food slot and one medicine slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    pub food: Option<Consumable>,
    pub medicine: Option<Consumable>,
}

impl Loadout {
    pub fn new(food: Option<Consumable>, medicine: Option<Consumable>) -> Loadout {
        Loadout { food, medicine }
    }

    /// Replaces whatever food was active.
    pub fn select_food(&mut self, food: Consumable) -> Option<Consumable> {
        self.food.replace(food)
    }

    pub fn select_medicine(&mut self, medicine: Consumable) -> Option<Consumable> {
        self.medicine.replace(medicine)
    }

    pub fn clear_food(&mut self) -> Option<Consumable> {
        self.food.take()
    }

    pub fn clear_medicine(&mut self) -> Option<Consumable> {
        self.medicine.take()
    }

    pub fn bonus_value(&self, kind: BonusKind, base: u32) -> u32 {
        effective_stat(base, self.bonuses(kind)) - base
    }

    fn bonuses(&self, kind: BonusKind) -> impl Iterator<Item = &ConsumableBonus> {
        self.food
            .iter()
            .chain(self.medicine.iter())
            .filter_map(move |c| c.get_bonus(kind))
    }
}

pub const CLVL_TABLE: [u32; 90] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10,
    11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
    21, 22, 23, 24, 25, 26, 27, 28, 29, 30,
    31, 32, 33, 34, 35, 36, 37, 38, 39, 40,
    41, 42, 43, 44, 45, 46, 47, 48, 49, 50,
    120, 125, 130, 133, 136, 139, 142, 145, 148, 150,
    260, 265, 270, 273, 276, 279, 282, 285, 288, 290,
    390, 395, 400, 403, 406, 409, 412, 415, 418, 420,
    517, 520, 525, 530, 535, 540, 545, 550, 555, 560
];

#[cfg(test)]
mod tests {
    use super::*;

    fn food() -> Consumable {
        Consumable {
            id: 1,
            name: "Jerked Jhammel".into(),
            hq: true,
            bonuses: HashMap::from([
                (BonusKind::Control, ConsumableBonus::new(4, 29)),
                (BonusKind::Cp, ConsumableBonus::new(22, 44)),
            ]),
        }
    }

    fn medicine() -> Consumable {
        Consumable {
            id: 2,
            name: "Commanding Craftsman's Draught".into(),
            hq: true,
            bonuses: HashMap::from([(BonusKind::Cp, ConsumableBonus::new(6, 21))]),
        }
    }

    #[test]
    fn contribution_is_ceiled_then_capped() {
        let bonus = ConsumableBonus::new(4, 29);
        assert_eq!(bonus.contribution(101), 5);
        assert_eq!(bonus.contribution(1000), 29);
        assert_eq!(bonus.contribution(0), 0);
    }

    #[test]
    fn food_and_medicine_sum() {
        let loadout = Loadout::new(Some(food()), Some(medicine()));
        // 22% of 450 caps at 44, 6% of 450 is 27 capped at 21
        assert_eq!(loadout.bonus_value(BonusKind::Cp, 450), 65);
        assert_eq!(loadout.bonus_value(BonusKind::Craftsmanship, 1000), 0);
    }

    #[test]
    fn selecting_food_replaces_previous() {
        let mut loadout = Loadout::default();
        assert!(loadout.select_food(medicine()).is_none());
        let previous = loadout.select_food(food());
        assert_eq!(previous.map(|c| c.id), Some(2));
        assert_eq!(loadout.bonus_value(BonusKind::Cp, 100), 22);
    }

    #[test]
    fn gear_set_with_loadout() {
        let set = GearSet::default();
        let stats = CrafterStats::from_gear_set(&set, &Loadout::new(Some(food()), None));
        assert_eq!(stats.craftsmanship, 1000);
        assert_eq!(stats.control, 1029);
        assert_eq!(stats.cp, 494);
        assert_eq!(stats.level, 70);
        assert_eq!(stats.clvl(), 290);
    }

    #[test]
    fn rejects_zero_control() {
        let stats = CrafterStats::new(8, 500, 0, 300, 50, false);
        assert!(matches!(stats.validate(), Err(CraftError::InvalidInput { field: "control", .. })));
    }
}
