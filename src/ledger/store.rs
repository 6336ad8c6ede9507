// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory projection of stock per (base, equipment type).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::error::{KernelError, KernelResult};
use crate::ledger::entry::{LedgerDelta, LedgerEntry, LedgerKey};
use crate::types::id::AssetId;

/// Entries keyed by [`LedgerKey`]. Iteration order is the key order, so
/// listings and the digest are deterministic. Entries are never removed.
#[derive(Clone, Debug, Default)]
pub struct LedgerStore {
    entries: BTreeMap<LedgerKey, LedgerEntry>,
    ids: BTreeMap<AssetId, LedgerKey>,
    next_id: u64,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            ids: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Store holding exactly `entries`, ids kept. Entries without an id get
    /// fresh ones after the highest id seen. Used to seed a projection from
    /// another store's listing; no delta validation runs.
    pub fn from_entries<I>(entries: I) -> KernelResult<Self>
    where
        I: IntoIterator<Item = LedgerEntry>,
    {
        let mut store = Self::new();
        let mut unassigned = Vec::new();
        for entry in entries {
            let key = entry.key();
            if store.entries.contains_key(&key) {
                return Err(KernelError::Validation(format!(
                    "duplicate ledger entry {} / {}",
                    key.base, key.equipment_type
                )));
            }
            if !entry.is_persisted() {
                unassigned.push(entry);
                continue;
            }
            if store.ids.insert(entry.id, key.clone()).is_some() {
                return Err(KernelError::Validation(format!("duplicate asset id {}", entry.id.0)));
            }
            store.next_id = store.next_id.max(entry.id.0 + 1);
            store.entries.insert(key, entry);
        }
        for entry in unassigned {
            if store.entries.contains_key(&entry.key()) {
                return Err(KernelError::Validation(format!(
                    "duplicate ledger entry {} / {}",
                    entry.base, entry.equipment_type
                )));
            }
            store.commit(entry);
        }
        Ok(store)
    }

    // --- Read APIs ---

    /// Entry for `key`, or a zero-valued entry with `AssetId(0)` if absent.
    pub fn get(&self, key: &LedgerKey) -> LedgerEntry {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| LedgerEntry::empty(key))
    }

    pub fn get_existing(&self, key: &LedgerKey) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    pub fn by_id(&self, id: AssetId) -> Option<&LedgerEntry> {
        self.ids.get(&id).and_then(|key| self.entries.get(key))
    }

    /// Active entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> + Clone {
        self.entries.values().filter(|entry| !entry.retired)
    }

    /// Every entry, retired ones included.
    pub fn all_entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // --- Write APIs ---

    /// Field-wise signed update of `key`, creating a zeroed entry when absent.
    /// Writing to a retired entry revives it.
    pub fn upsert(&mut self, key: LedgerKey, delta: LedgerDelta) -> KernelResult<&LedgerEntry> {
        let updated = self.preview(&key, &delta)?;
        Ok(self.commit(updated))
    }

    /// What `upsert` would write, without writing it.
    pub fn preview(&self, key: &LedgerKey, delta: &LedgerDelta) -> KernelResult<LedgerEntry> {
        let mut entry = self.get(key);
        entry.apply_delta(delta)?;
        entry.retired = false;
        Ok(entry)
    }

    pub fn set_retired(&mut self, key: &LedgerKey, retired: bool) -> KernelResult<()> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.retired = retired;
                Ok(())
            }
            None => Err(KernelError::EntryNotFound {
                base: key.base.clone(),
                equipment_type: key.equipment_type.clone(),
            }),
        }
    }

    /// Stores a fully computed entry. New entries get the next `AssetId`.
    pub(crate) fn commit(&mut self, mut entry: LedgerEntry) -> &LedgerEntry {
        let key = entry.key();
        if !entry.is_persisted() {
            entry.id = match self.entries.get(&key) {
                Some(existing) => existing.id,
                None => {
                    let id = AssetId(self.next_id.max(1));
                    self.next_id = id.0 + 1;
                    self.ids.insert(id, key.clone());
                    id
                }
            };
        }
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(entry);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(entry),
        }
    }

    /// BLAKE3 over every entry in key order.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.entries.len() as u64).to_le_bytes());
        for entry in self.entries.values() {
            hasher.update(&entry.id.0.to_le_bytes());
            hash_str(&mut hasher, &entry.base);
            hash_str(&mut hasher, entry.equipment_type.as_str());
            hasher.update(&entry.quantity.to_le_bytes());
            hasher.update(&entry.assigned.to_le_bytes());
            hasher.update(&entry.expended.to_le_bytes());
            hasher.update(&[entry.retired as u8]);
        }
        *hasher.finalize().as_bytes()
    }
}

// Length-prefixed so ("ab", "c") and ("a", "bc") hash differently.
fn hash_str(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
