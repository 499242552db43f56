//! Fact store contract and the store compositions built on it.
//!
//! The scheduling engine owns one `FactStore` handle and treats it as a bulk
//! key-value repository scoped by (learner, curriculum level). A store that
//! errors never corrupts engine state; the engine keeps its in-memory copy
//! and retries on the next mutating call.

use std::collections::HashMap;

use log::warn;

use crate::error::{FactError, Result};
use crate::models::FactRecord;

/// Durable mapping from fact id to progress record, per (learner, level)
/// scope. Bulk read, bulk upsert, bulk wipe.
pub trait FactStore {
    fn load_facts_for_scope(
        &mut self,
        learner_id: &str,
        level_code: &str,
    ) -> Result<HashMap<String, FactRecord>>;

    fn save_facts(
        &mut self,
        learner_id: &str,
        level_code: &str,
        facts: &HashMap<String, FactRecord>,
    ) -> Result<()>;

    fn clear_scope(&mut self, learner_id: &str, level_code: &str) -> Result<()>;
}

/// Volatile store backed by a plain map. Serves tests and last-resort tiers.
#[derive(Default)]
pub struct MemoryStore {
    scopes: HashMap<(String, String), HashMap<String, FactRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FactStore for MemoryStore {
    fn load_facts_for_scope(
        &mut self,
        learner_id: &str,
        level_code: &str,
    ) -> Result<HashMap<String, FactRecord>> {
        Ok(self
            .scopes
            .get(&(learner_id.to_string(), level_code.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn save_facts(
        &mut self,
        learner_id: &str,
        level_code: &str,
        facts: &HashMap<String, FactRecord>,
    ) -> Result<()> {
        self.scopes.insert(
            (learner_id.to_string(), level_code.to_string()),
            facts.clone(),
        );
        Ok(())
    }

    fn clear_scope(&mut self, learner_id: &str, level_code: &str) -> Result<()> {
        self.scopes
            .remove(&(learner_id.to_string(), level_code.to_string()));
        Ok(())
    }
}

/// Which tier answered the most recent read from a `TieredStore`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServedBy {
    Primary,
    Fallback,
}

/// Two stores with an explicit trial order: reads try the primary and fall
/// back on error, recording which tier served; writes go to both and succeed
/// if either tier accepts them.
pub struct TieredStore {
    primary: Box<dyn FactStore>,
    fallback: Box<dyn FactStore>,
    last_read_served_by: Option<ServedBy>,
}

impl TieredStore {
    pub fn new(primary: Box<dyn FactStore>, fallback: Box<dyn FactStore>) -> Self {
        Self {
            primary,
            fallback,
            last_read_served_by: None,
        }
    }

    /// Tier that served the most recent successful read, if any read happened.
    pub fn last_read_served_by(&self) -> Option<ServedBy> {
        self.last_read_served_by
    }
}

impl FactStore for TieredStore {
    fn load_facts_for_scope(
        &mut self,
        learner_id: &str,
        level_code: &str,
    ) -> Result<HashMap<String, FactRecord>> {
        match self.primary.load_facts_for_scope(learner_id, level_code) {
            Ok(facts) => {
                self.last_read_served_by = Some(ServedBy::Primary);
                Ok(facts)
            }
            Err(primary_err) => {
                warn!("primary store read failed, trying fallback: {primary_err}");
                let facts = self.fallback.load_facts_for_scope(learner_id, level_code)?;
                self.last_read_served_by = Some(ServedBy::Fallback);
                Ok(facts)
            }
        }
    }

    fn save_facts(
        &mut self,
        learner_id: &str,
        level_code: &str,
        facts: &HashMap<String, FactRecord>,
    ) -> Result<()> {
        let primary = self.primary.save_facts(learner_id, level_code, facts);
        let fallback = self.fallback.save_facts(learner_id, level_code, facts);

        match (primary, fallback) {
            (Err(p), Err(f)) => Err(FactError::AllTiersFailed(format!(
                "primary: {p}; fallback: {f}"
            ))),
            (Err(p), Ok(())) => {
                warn!("primary store write failed, fallback tier holds the data: {p}");
                Ok(())
            }
            (Ok(()), Err(f)) => {
                warn!("fallback store write failed: {f}");
                Ok(())
            }
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn clear_scope(&mut self, learner_id: &str, level_code: &str) -> Result<()> {
        let primary = self.primary.clear_scope(learner_id, level_code);
        let fallback = self.fallback.clear_scope(learner_id, level_code);

        match (primary, fallback) {
            (Err(p), Err(f)) => Err(FactError::AllTiersFailed(format!(
                "primary: {p}; fallback: {f}"
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Store whose every call errors, for resilience tests.
    pub struct FailingStore;

    impl FactStore for FailingStore {
        fn load_facts_for_scope(
            &mut self,
            _learner_id: &str,
            _level_code: &str,
        ) -> Result<HashMap<String, FactRecord>> {
            Err(FactError::Io(std::io::Error::other("store down")))
        }

        fn save_facts(
            &mut self,
            _learner_id: &str,
            _level_code: &str,
            _facts: &HashMap<String, FactRecord>,
        ) -> Result<()> {
            Err(FactError::Io(std::io::Error::other("store down")))
        }

        fn clear_scope(&mut self, _learner_id: &str, _level_code: &str) -> Result<()> {
            Err(FactError::Io(std::io::Error::other("store down")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FailingStore;
    use super::*;
    use crate::models::{FactPayload, FactRecord, Operation};
    use chrono::Utc;

    fn one_fact() -> HashMap<String, FactRecord> {
        let payload = FactPayload {
            operand_a: 2,
            operand_b: 3,
            operation: Operation::Addition,
            answer: 5,
        };
        let record = FactRecord::new("cp-add-2-3", payload, Utc::now());
        HashMap::from([(record.id.clone(), record)])
    }

    #[test]
    fn test_memory_store_round_trip_and_clear() {
        let mut store = MemoryStore::new();
        let facts = one_fact();

        store.save_facts("alice", "cp", &facts).unwrap();
        let loaded = store.load_facts_for_scope("alice", "cp").unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("cp-add-2-3"));

        // Scopes are independent
        assert!(store.load_facts_for_scope("bob", "cp").unwrap().is_empty());

        store.clear_scope("alice", "cp").unwrap();
        assert!(store.load_facts_for_scope("alice", "cp").unwrap().is_empty());
    }

    #[test]
    fn test_tiered_read_served_by_primary_when_healthy() {
        let mut primary = MemoryStore::new();
        primary.save_facts("alice", "cp", &one_fact()).unwrap();

        let mut store = TieredStore::new(Box::new(primary), Box::new(MemoryStore::new()));
        let loaded = store.load_facts_for_scope("alice", "cp").unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(store.last_read_served_by(), Some(ServedBy::Primary));
    }

    #[test]
    fn test_tiered_read_falls_back_when_primary_errors() {
        let mut fallback = MemoryStore::new();
        fallback.save_facts("alice", "cp", &one_fact()).unwrap();

        let mut store = TieredStore::new(Box::new(FailingStore), Box::new(fallback));
        let loaded = store.load_facts_for_scope("alice", "cp").unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(store.last_read_served_by(), Some(ServedBy::Fallback));
    }

    #[test]
    fn test_tiered_write_succeeds_if_one_tier_accepts() {
        let mut store = TieredStore::new(Box::new(FailingStore), Box::new(MemoryStore::new()));
        assert!(store.save_facts("alice", "cp", &one_fact()).is_ok());

        let loaded = store.load_facts_for_scope("alice", "cp").unwrap();
        assert_eq!(store.last_read_served_by(), Some(ServedBy::Fallback));
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_tiered_write_fails_when_both_tiers_fail() {
        let mut store = TieredStore::new(Box::new(FailingStore), Box::new(FailingStore));
        let result = store.save_facts("alice", "cp", &one_fact());
        assert!(matches!(result, Err(FactError::AllTiersFailed(_))));
    }
}
