//! Per-element side-table of meme records.
//!
//! Every mesh element that carries memes gets an ordered map from
//! [`SlotKey`] to [`MemeId`]. A meme is stored under its owner's key, or
//! under the single reserved [`SlotKey::Boss`] key when it controls the
//! element. Because the map has one `Boss` entry at most, an element can
//! never have two bosses.

use std::collections::{BTreeMap, HashMap};

use crate::error::{invariant, Result};
use crate::meme::MemeId;
use crate::owner::OwnerId;
use crate::simplex::Simplex;

/// Lookup key of a meme record on its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKey {
    /// The reserved key of the element's controlling meme.
    Boss,
    /// Key of a non-boss meme, by owner.
    Owner(OwnerId),
}

/// The meme records attached to one element.
#[derive(Debug, Default, Clone)]
pub struct ElementSlots {
    records: BTreeMap<SlotKey, MemeId>,
}

impl ElementSlots {
    /// Returns the boss meme, if any.
    pub fn boss(&self) -> Option<MemeId> {
        self.records.get(&SlotKey::Boss).copied()
    }

    /// Returns the non-boss meme stored under the owner's key.
    pub fn by_owner(&self, owner: OwnerId) -> Option<MemeId> {
        self.records.get(&SlotKey::Owner(owner)).copied()
    }

    /// Returns the meme belonging to `owner`, boss or not.
    pub fn find(&self, owner: OwnerId) -> Option<MemeId> {
        self.boss()
            .filter(|m| m.owner == owner)
            .or_else(|| self.by_owner(owner))
    }

    /// Returns the key the meme is stored under.
    pub fn key_of(&self, meme: MemeId) -> Option<SlotKey> {
        self.records
            .iter()
            .find_map(|(k, m)| (*m == meme).then_some(*k))
    }

    /// Returns all attached memes, boss first.
    pub fn memes(&self) -> impl Iterator<Item = MemeId> + '_ {
        self.records.values().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Side-table from elements to their meme records.
#[derive(Debug, Default, Clone)]
pub struct SlotTable {
    elements: HashMap<Simplex, ElementSlots>,
}

impl SlotTable {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the records of an element.
    pub fn get(&self, s: Simplex) -> Option<&ElementSlots> {
        self.elements.get(&s)
    }

    pub fn find_boss(&self, s: Simplex) -> Option<MemeId> {
        self.elements.get(&s).and_then(ElementSlots::boss)
    }

    pub fn find_by_owner(&self, s: Simplex, owner: OwnerId) -> Option<MemeId> {
        self.elements.get(&s).and_then(|e| e.by_owner(owner))
    }

    /// Returns the meme put on the element by `owner`, boss or not.
    pub fn find_meme(&self, s: Simplex, owner: OwnerId) -> Option<MemeId> {
        self.elements.get(&s).and_then(|e| e.find(owner))
    }

    /// Returns true if `meme` is stored under the boss key of `s`.
    pub fn is_boss(&self, s: Simplex, meme: MemeId) -> bool {
        self.find_boss(s) == Some(meme)
    }

    /// Stores a new record.
    ///
    /// Fails if the key is taken, or if the meme's owner already has a
    /// record on the element.
    pub fn attach(&mut self, s: Simplex, key: SlotKey, meme: MemeId) -> Result<()> {
        let slots = self.elements.entry(s).or_default();
        if slots.records.contains_key(&key) {
            return Err(invariant!("{s} already has a record under {key:?}"));
        }
        if slots.find(meme.owner).is_some() {
            return Err(invariant!(
                "owner {} already has a meme on {s}",
                meme.owner
            ));
        }
        slots.records.insert(key, meme);
        Ok(())
    }

    /// Moves a record to another key.
    pub fn rekey(&mut self, s: Simplex, meme: MemeId, to: SlotKey) -> Result<()> {
        let slots = self
            .elements
            .get_mut(&s)
            .ok_or_else(|| invariant!("{s} has no meme records"))?;
        let from = slots
            .key_of(meme)
            .ok_or_else(|| invariant!("meme {meme} is not attached to {s}"))?;
        if from == to {
            return Ok(());
        }
        if slots.records.contains_key(&to) {
            return Err(invariant!("{s} already has a record under {to:?}"));
        }
        slots.records.remove(&from);
        slots.records.insert(to, meme);
        Ok(())
    }

    /// Removes a single record. Returns true if it was there.
    pub fn detach(&mut self, s: Simplex, meme: MemeId) -> bool {
        let Some(slots) = self.elements.get_mut(&s) else {
            return false;
        };
        let Some(key) = slots.key_of(meme) else {
            return false;
        };
        slots.records.remove(&key);
        if slots.is_empty() {
            self.elements.remove(&s);
        }
        true
    }

    /// Drops the element's records and returns the memes that were attached.
    pub fn remove_element(&mut self, s: Simplex) -> Vec<MemeId> {
        self.elements
            .remove(&s)
            .map(|slots| slots.records.into_values().collect())
            .unwrap_or_default()
    }

    /// Returns all memes on the element, boss first.
    pub fn memes_on(&self, s: Simplex) -> Vec<MemeId> {
        self.elements
            .get(&s)
            .map(|e| e.memes().collect())
            .unwrap_or_default()
    }

    /// Returns an iterator over all elements that carry records.
    pub fn elements(&self) -> impl Iterator<Item = (Simplex, &ElementSlots)> {
        self.elements.iter().map(|(s, e)| (*s, e))
    }

    /// Returns the number of elements that carry records.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if no element carries a record.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplex::VertId;

    fn meme(owner: u32, serial: u32) -> MemeId {
        MemeId {
            owner: OwnerId(owner),
            serial,
        }
    }

    #[test]
    fn test_attach_and_find() {
        let mut table = SlotTable::new();
        let s = Simplex::Vert(VertId(0));
        table.attach(s, SlotKey::Boss, meme(1, 0)).unwrap();
        table
            .attach(s, SlotKey::Owner(OwnerId(2)), meme(2, 0))
            .unwrap();

        assert_eq!(table.find_boss(s), Some(meme(1, 0)));
        assert_eq!(table.find_meme(s, OwnerId(1)), Some(meme(1, 0)));
        assert_eq!(table.find_meme(s, OwnerId(2)), Some(meme(2, 0)));
        assert_eq!(table.find_by_owner(s, OwnerId(1)), None);
        assert_eq!(table.memes_on(s), vec![meme(1, 0), meme(2, 0)]);
    }

    #[test]
    fn test_second_boss_rejected() {
        let mut table = SlotTable::new();
        let s = Simplex::Vert(VertId(0));
        table.attach(s, SlotKey::Boss, meme(1, 0)).unwrap();
        assert!(table.attach(s, SlotKey::Boss, meme(2, 0)).is_err());
        assert_eq!(table.get(s).map(ElementSlots::len), Some(1));
    }

    #[test]
    fn test_one_record_per_owner() {
        let mut table = SlotTable::new();
        let s = Simplex::Vert(VertId(0));
        table.attach(s, SlotKey::Boss, meme(1, 0)).unwrap();
        assert!(table
            .attach(s, SlotKey::Owner(OwnerId(1)), meme(1, 1))
            .is_err());
    }

    #[test]
    fn test_rekey() {
        let mut table = SlotTable::new();
        let s = Simplex::Vert(VertId(4));
        let m = meme(3, 0);
        table.attach(s, SlotKey::Owner(OwnerId(3)), m).unwrap();
        table.rekey(s, m, SlotKey::Boss).unwrap();
        assert!(table.is_boss(s, m));
        table.rekey(s, m, SlotKey::Owner(OwnerId(3))).unwrap();
        assert!(!table.is_boss(s, m));
        assert_eq!(table.find_by_owner(s, OwnerId(3)), Some(m));
    }

    #[test]
    fn test_rekey_into_taken_boss_slot_fails() {
        let mut table = SlotTable::new();
        let s = Simplex::Vert(VertId(4));
        table.attach(s, SlotKey::Boss, meme(1, 0)).unwrap();
        table
            .attach(s, SlotKey::Owner(OwnerId(2)), meme(2, 0))
            .unwrap();
        assert!(table.rekey(s, meme(2, 0), SlotKey::Boss).is_err());
        assert_eq!(table.find_boss(s), Some(meme(1, 0)));
    }

    #[test]
    fn test_detach_and_remove_element() {
        let mut table = SlotTable::new();
        let s = Simplex::Vert(VertId(1));
        table.attach(s, SlotKey::Boss, meme(1, 0)).unwrap();
        assert!(table.detach(s, meme(1, 0)));
        assert!(!table.detach(s, meme(1, 0)));
        assert!(table.is_empty());

        table.attach(s, SlotKey::Boss, meme(1, 0)).unwrap();
        table
            .attach(s, SlotKey::Owner(OwnerId(2)), meme(2, 5))
            .unwrap();
        let removed = table.remove_element(s);
        assert_eq!(removed.len(), 2);
        assert!(table.get(s).is_none());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn at_most_one_boss(ops in proptest::collection::vec((0u32..4, any::<bool>()), 1..40)) {
                let mut table = SlotTable::new();
                let s = Simplex::Vert(VertId(0));
                for owner in 0..4 {
                    table.attach(s, SlotKey::Owner(OwnerId(owner)), meme(owner, 0)).unwrap();
                }
                for (owner, promote) in ops {
                    let m = meme(owner, 0);
                    let to = if promote { SlotKey::Boss } else { SlotKey::Owner(OwnerId(owner)) };
                    // Rejected rekeys leave the table untouched.
                    let _ = table.rekey(s, m, to);
                    let bosses = table.memes_on(s).into_iter().filter(|&x| table.is_boss(s, x)).count();
                    prop_assert!(bosses <= 1);
                    prop_assert_eq!(table.get(s).map(ElementSlots::len), Some(4));
                }
            }
        }
    }
}
