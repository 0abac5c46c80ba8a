use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffKind {
    InnerQuiet,
    Innovation,
    Veneration,
    GreatStrides,
    MuscleMemory,
    WasteNot,
    SteadyHand,
    HeartAndSoul,
}

/// How a second application of the same buff kind combines with the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackRule {
    /// Stacks add up to `max`, duration is taken from the newer buff.
    Stacking { max: u8 },
    /// Only the duration is refreshed.
    RefreshOnly,
    /// Refreshed like `RefreshOnly`, and spent by the next action that uses it.
    Instant,
}

impl BuffKind {
    pub const fn rule(self) -> StackRule {
        match self {
            BuffKind::InnerQuiet => StackRule::Stacking { max: 10 },
            BuffKind::Innovation
            | BuffKind::Veneration
            | BuffKind::WasteNot
            | BuffKind::SteadyHand => StackRule::RefreshOnly,
            BuffKind::GreatStrides | BuffKind::MuscleMemory | BuffKind::HeartAndSoul => {
                StackRule::Instant
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveBuff {
    pub buff: BuffKind,
    /// Turns left, `None` for buffs that last until spent.
    pub remaining: Option<u8>,
    pub stacks: u8,
}

impl EffectiveBuff {
    pub fn timed(buff: BuffKind, turns: u8) -> EffectiveBuff {
        EffectiveBuff {
            buff,
            remaining: Some(turns),
            stacks: 1,
        }
    }

    pub fn lasting(buff: BuffKind) -> EffectiveBuff {
        EffectiveBuff {
            buff,
            remaining: None,
            stacks: 1,
        }
    }

    pub fn stacked(buff: BuffKind, stacks: u8) -> EffectiveBuff {
        EffectiveBuff {
            buff,
            remaining: None,
            stacks,
        }
    }
}

impl fmt::Display for EffectiveBuff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.buff)?;
        if self.stacks > 1 {
            write!(f, " x{}", self.stacks)?;
        }
        if let Some(turns) = self.remaining {
            write!(f, " ({})", turns)?;
        }
        Ok(())
    }
}

/// Buffs attached to one craft state, in the order they were first applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffLedger {
    buffs: Vec<EffectiveBuff>,
}

impl BuffLedger {
    pub fn new() -> BuffLedger {
        BuffLedger { buffs: Vec::new() }
    }

    /// Advances one turn. Returns the buffs that apply to the current action,
    /// as they stood before the decrement; entries that hit zero are evicted
    /// from the ledger but still appear in the returned set.
    pub fn tick(&mut self) -> BuffLedger {
        let active = self.clone();
        for buff in self.buffs.iter_mut() {
            if let Some(turns) = buff.remaining.as_mut() {
                *turns = turns.saturating_sub(1);
            }
        }
        self.buffs.retain(|b| b.remaining != Some(0));
        active
    }

    pub fn add(&mut self, buff: EffectiveBuff) {
        let rule = buff.buff.rule();
        match self.buffs.iter_mut().find(|b| b.buff == buff.buff) {
            Some(existing) => {
                if let StackRule::Stacking { max } = rule {
                    existing.stacks = existing.stacks.saturating_add(buff.stacks).min(max);
                }
                existing.remaining = buff.remaining;
            }
            None => {
                let mut fresh = buff;
                if let StackRule::Stacking { max } = rule {
                    fresh.stacks = fresh.stacks.min(max);
                }
                if fresh.stacks > 0 && fresh.remaining != Some(0) {
                    self.buffs.push(fresh);
                }
            }
        }
    }

    /// Removes a buff outright, returning it if it was present.
    pub fn consume(&mut self, kind: BuffKind) -> Option<EffectiveBuff> {
        let index = self.buffs.iter().position(|b| b.buff == kind)?;
        Some(self.buffs.remove(index))
    }

    pub fn get(&self, kind: BuffKind) -> Option<&EffectiveBuff> {
        self.buffs.iter().find(|b| b.buff == kind)
    }

    pub fn is_active(&self, kind: BuffKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn stacks(&self, kind: BuffKind) -> u8 {
        self.get(kind).map_or(0, |b| b.stacks)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectiveBuff> {
        self.buffs.iter()
    }

    pub fn len(&self) -> usize {
        self.buffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_evicts_after_last_turn() {
        let mut ledger = BuffLedger::new();
        ledger.add(EffectiveBuff::timed(BuffKind::Innovation, 2));
        let first = ledger.tick();
        assert!(first.is_active(BuffKind::Innovation));
        assert_eq!(ledger.get(BuffKind::Innovation).unwrap().remaining, Some(1));

        // last turn: still applies to this action, gone afterwards
        let second = ledger.tick();
        assert!(second.is_active(BuffKind::Innovation));
        assert!(!ledger.is_active(BuffKind::Innovation));
        assert!(!ledger.tick().is_active(BuffKind::Innovation));
    }

    #[test]
    fn lasting_buffs_never_expire() {
        let mut ledger = BuffLedger::new();
        ledger.add(EffectiveBuff::stacked(BuffKind::InnerQuiet, 3));
        for _ in 0..50 {
            ledger.tick();
        }
        assert_eq!(ledger.stacks(BuffKind::InnerQuiet), 3);
    }

    #[test]
    fn stacking_is_capped() {
        let mut ledger = BuffLedger::new();
        ledger.add(EffectiveBuff::stacked(BuffKind::InnerQuiet, 8));
        ledger.add(EffectiveBuff::stacked(BuffKind::InnerQuiet, 2));
        ledger.add(EffectiveBuff::stacked(BuffKind::InnerQuiet, 2));
        assert_eq!(ledger.stacks(BuffKind::InnerQuiet), 10);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn refresh_takes_new_duration() {
        let mut ledger = BuffLedger::new();
        ledger.add(EffectiveBuff::timed(BuffKind::WasteNot, 8));
        ledger.tick();
        ledger.add(EffectiveBuff::timed(BuffKind::WasteNot, 4));
        let buff = ledger.get(BuffKind::WasteNot).unwrap();
        assert_eq!(buff.remaining, Some(4));
        assert_eq!(buff.stacks, 1);
    }

    #[test]
    fn consume_removes_entry() {
        let mut ledger = BuffLedger::new();
        ledger.add(EffectiveBuff::timed(BuffKind::GreatStrides, 3));
        ledger.add(EffectiveBuff::timed(BuffKind::Innovation, 4));
        assert!(ledger.consume(BuffKind::GreatStrides).is_some());
        assert!(ledger.consume(BuffKind::GreatStrides).is_none());
        assert_eq!(ledger.len(), 1);
    }
}
