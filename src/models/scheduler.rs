//! Spaced-repetition scheduling engine.
//!
//! Tracks one learner's progress on one curriculum level's facts: creates
//! records, walks them up and down the knowledge ladder as answers come in,
//! computes due dates, and answers "what is due now". The engine mutates its
//! in-memory map first and treats the store as eventually consistent with it;
//! a failed write is retried on the next mutating call.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::database::FactStore;
use crate::error::{FactError, Result};
use crate::models::{AnswerEvent, FactPayload, FactRecord, KnowledgeLevel, fact_belongs_to};

/// Progress snapshot for one (learner, level) scope.
#[derive(Clone, Debug)]
pub struct ProgressStatistics {
    pub total_count: usize,
    /// Record counts indexed by knowledge-level rank.
    pub level_counts: [usize; 4],
    pub due: Vec<FactRecord>,
    /// Rounded percentage of mastered facts; 0 for an empty scope.
    pub mastered_percentage: u32,
}

impl ProgressStatistics {
    pub fn count_at(&self, level: KnowledgeLevel) -> usize {
        self.level_counts[level.rank() as usize]
    }
}

pub struct SchedulingEngine {
    learner_id: String,
    level_code: String,
    facts: HashMap<String, FactRecord>,
    store: Box<dyn FactStore>,
    dirty: bool,
}

impl SchedulingEngine {
    /// Builds an engine for one (learner, curriculum level) scope, loading
    /// whatever the store already holds for it. A store that cannot be read
    /// starts the scope empty rather than failing the caller.
    pub fn new(
        learner_id: impl Into<String>,
        level_code: impl Into<String>,
        mut store: Box<dyn FactStore>,
    ) -> Self {
        let learner_id = learner_id.into();
        let level_code = level_code.into();

        let facts = match store.load_facts_for_scope(&learner_id, &level_code) {
            Ok(facts) => facts,
            Err(e) => {
                warn!("loading facts for {learner_id}/{level_code} failed, starting empty: {e}");
                HashMap::new()
            }
        };

        Self {
            learner_id,
            level_code,
            facts,
            store,
            dirty: false,
        }
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn level_code(&self) -> &str {
        &self.level_code
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn get_fact(&self, id: &str) -> Option<&FactRecord> {
        self.facts.get(id)
    }

    /// Registers a fact on first exposure. Creating an id that already exists
    /// is a no-op; existing progress is never overwritten.
    pub fn create_fact(&mut self, id: &str, payload: FactPayload) -> Result<()> {
        self.create_fact_at(id, payload, Utc::now())
    }

    pub fn create_fact_at(
        &mut self,
        id: &str,
        payload: FactPayload,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(FactError::EmptyId);
        }
        if !fact_belongs_to(id, &self.level_code) {
            return Err(FactError::NamespaceMismatch {
                id: id.to_string(),
                level_code: self.level_code.clone(),
            });
        }
        if self.facts.contains_key(id) {
            return Ok(());
        }

        self.facts
            .insert(id.to_string(), FactRecord::new(id, payload, now));
        self.persist();
        Ok(())
    }

    /// Batched creation. Items already present or outside the namespace are
    /// skipped; returns how many records were actually added.
    pub fn create_many_facts(&mut self, batch: Vec<(String, FactPayload)>) -> Result<usize> {
        self.create_many_facts_at(batch, Utc::now())
    }

    pub fn create_many_facts_at(
        &mut self,
        batch: Vec<(String, FactPayload)>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        if batch.is_empty() {
            return Err(FactError::EmptyBatch);
        }

        let mut added = 0;
        for (id, payload) in batch {
            if id.is_empty() || !fact_belongs_to(&id, &self.level_code) {
                debug!("skipping out-of-namespace fact '{id}' for level {}", self.level_code);
                continue;
            }
            if self.facts.contains_key(&id) {
                continue;
            }
            self.facts
                .insert(id.clone(), FactRecord::new(id, payload, now));
            added += 1;
        }

        if added > 0 {
            self.persist();
        }
        debug!("registered {added} new facts for {}/{}", self.learner_id, self.level_code);
        Ok(added)
    }

    /// Applies one answer to a fact and reschedules it.
    ///
    /// A correct answer bumps the consecutive-success counter and promotes one
    /// level once the counter reaches the level's threshold; an incorrect
    /// answer zeroes the counter and demotes one level. A single answer never
    /// moves a fact more than one step.
    pub fn record_answer(
        &mut self,
        id: &str,
        was_correct: bool,
        response_time_secs: Option<f64>,
    ) -> Result<FactRecord> {
        self.record_answer_at(id, was_correct, response_time_secs, Utc::now())
    }

    pub fn record_answer_at(
        &mut self,
        id: &str,
        was_correct: bool,
        response_time_secs: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<FactRecord> {
        let record = self
            .facts
            .get_mut(id)
            .ok_or_else(|| FactError::UnknownFact(id.to_string()))?;

        if was_correct {
            record.success_count += 1;
            if let Some(threshold) = record.level.success_threshold() {
                if record.success_count >= threshold {
                    record.level = record.level.promoted();
                    record.success_count = 0;
                }
            }
        } else {
            record.success_count = 0;
            record.level = record.level.demoted();
        }

        record.last_reviewed = now;
        record.next_review = now + Duration::days(record.level.review_interval_days());
        record.history.push(AnswerEvent {
            date: now,
            was_correct,
            response_time_secs: response_time_secs.unwrap_or(0.0),
        });

        let updated = record.clone();
        self.persist();
        Ok(updated)
    }

    /// Facts whose scheduled review instant has passed. No ordering is
    /// guaranteed.
    pub fn facts_due_now(&mut self) -> Vec<FactRecord> {
        self.facts_due_at(Utc::now())
    }

    pub fn facts_due_at(&mut self, reference: DateTime<Utc>) -> Vec<FactRecord> {
        self.sweep_foreign_records();
        self.facts
            .values()
            .filter(|record| record.is_due(reference))
            .cloned()
            .collect()
    }

    /// Totals, per-level counts, the due list, and the mastered percentage.
    pub fn progress_statistics(&mut self) -> ProgressStatistics {
        self.progress_statistics_at(Utc::now())
    }

    pub fn progress_statistics_at(&mut self, reference: DateTime<Utc>) -> ProgressStatistics {
        let due = self.facts_due_at(reference);

        let mut level_counts = [0usize; 4];
        for record in self.facts.values() {
            level_counts[record.level.rank() as usize] += 1;
        }

        let total_count = self.facts.len();
        let mastered = level_counts[KnowledgeLevel::Mastered.rank() as usize];
        let mastered_percentage = if total_count == 0 {
            0
        } else {
            (100.0 * mastered as f64 / total_count as f64).round() as u32
        };

        ProgressStatistics {
            total_count,
            level_counts,
            due,
            mastered_percentage,
        }
    }

    /// Bulk wipe of the scope, invoked by the host application only.
    pub fn clear_all_progress(&mut self) -> Result<()> {
        self.facts.clear();
        self.dirty = false;
        self.store.clear_scope(&self.learner_id, &self.level_code)
    }

    /// Drops records that leaked in from another curriculum level. Runs
    /// lazily before every due-query so the stored set self-heals.
    fn sweep_foreign_records(&mut self) {
        let before = self.facts.len();
        let level_code = self.level_code.clone();
        self.facts.retain(|_, record| record.belongs_to(&level_code));

        let swept = before - self.facts.len();
        if swept > 0 {
            warn!("purged {swept} facts outside level {level_code}");
            self.persist();
        }
    }

    /// Pushes the full scope map to the store. A failing store leaves the
    /// in-memory state authoritative; the dirty flag makes the next mutating
    /// call retry.
    fn persist(&mut self) {
        match self
            .store
            .save_facts(&self.learner_id, &self.level_code, &self.facts)
        {
            Ok(()) => self.dirty = false,
            Err(e) => {
                warn!(
                    "persisting {}/{} failed, keeping in-memory state: {e}",
                    self.learner_id, self.level_code
                );
                self.dirty = true;
            }
        }
    }

    #[cfg(test)]
    fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::test_support::FailingStore;
    use crate::database::{FactStore as _, MemoryStore};
    use crate::models::Operation;

    fn payload(a: i64, b: i64) -> FactPayload {
        FactPayload {
            operand_a: a,
            operand_b: b,
            operation: Operation::Addition,
            answer: a + b,
        }
    }

    fn engine() -> SchedulingEngine {
        SchedulingEngine::new("alice", "cp", Box::new(MemoryStore::new()))
    }

    #[test]
    fn test_create_fact_starts_at_new_and_due() {
        let mut engine = engine();
        engine.create_fact("cp-add-2-3", payload(2, 3)).unwrap();

        let record = engine.get_fact("cp-add-2-3").unwrap();
        assert_eq!(record.level, KnowledgeLevel::New);
        assert_eq!(record.success_count, 0);
        assert_eq!(engine.facts_due_now().len(), 1);
    }

    #[test]
    fn test_create_fact_is_idempotent() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();
        engine.record_answer_at("cp-add-2-3", true, Some(2.0), now).unwrap();

        // Re-creation must not reset existing progress
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();

        let record = engine.get_fact("cp-add-2-3").unwrap();
        assert_eq!(record.success_count, 1);
        assert_eq!(record.history.len(), 1);
        assert_eq!(engine.fact_count(), 1);
    }

    #[test]
    fn test_create_fact_rejects_empty_and_foreign_ids() {
        let mut engine = engine();

        assert!(matches!(
            engine.create_fact("", payload(1, 1)),
            Err(FactError::EmptyId)
        ));
        assert!(matches!(
            engine.create_fact("ce1-add-2-3", payload(2, 3)),
            Err(FactError::NamespaceMismatch { .. })
        ));
        assert_eq!(engine.fact_count(), 0);
    }

    #[test]
    fn test_create_many_skips_foreign_and_existing() {
        let mut engine = engine();
        engine.create_fact("cp-add-1-1", payload(1, 1)).unwrap();

        let batch = vec![
            ("cp-add-1-1".to_string(), payload(1, 1)), // already present
            ("cp-add-1-2".to_string(), payload(1, 2)),
            ("cp-add-1-3".to_string(), payload(1, 3)),
            ("cp-add-1-4".to_string(), payload(1, 4)),
            ("ce1-add-9-9".to_string(), payload(9, 9)), // wrong level
        ];
        let added = engine.create_many_facts(batch).unwrap();

        assert_eq!(added, 3);
        assert_eq!(engine.fact_count(), 4);
        assert!(engine.get_fact("ce1-add-9-9").is_none());
        assert!(engine.facts_due_now().iter().all(|r| r.belongs_to("cp")));
    }

    #[test]
    fn test_create_many_rejects_empty_batch() {
        let mut engine = engine();
        assert!(matches!(
            engine.create_many_facts(Vec::new()),
            Err(FactError::EmptyBatch)
        ));
    }

    #[test]
    fn test_record_answer_unknown_fact_is_an_error() {
        let mut engine = engine();
        assert!(matches!(
            engine.record_answer("cp-add-9-9", true, None),
            Err(FactError::UnknownFact(_))
        ));
    }

    #[test]
    fn test_two_correct_answers_promote_new_to_learning() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();

        let after_one = engine
            .record_answer_at("cp-add-2-3", true, Some(3.0), now)
            .unwrap();
        assert_eq!(after_one.level, KnowledgeLevel::New);
        assert_eq!(after_one.success_count, 1);

        let after_two = engine
            .record_answer_at("cp-add-2-3", true, Some(3.0), now)
            .unwrap();
        assert_eq!(after_two.level, KnowledgeLevel::Learning);
        assert_eq!(after_two.success_count, 0);
        assert_eq!(after_two.next_review, now + Duration::days(1));
    }

    #[test]
    fn test_incorrect_answer_demotes_and_resets_counter() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();

        // Reach Learning with one banked success
        for _ in 0..3 {
            engine.record_answer_at("cp-add-2-3", true, None, now).unwrap();
        }
        let record = engine.get_fact("cp-add-2-3").unwrap();
        assert_eq!(record.level, KnowledgeLevel::Learning);
        assert_eq!(record.success_count, 1);

        let after_miss = engine
            .record_answer_at("cp-add-2-3", false, None, now)
            .unwrap();
        assert_eq!(after_miss.level, KnowledgeLevel::New);
        assert_eq!(after_miss.success_count, 0);
        // New is due immediately
        assert_eq!(after_miss.next_review, now);
    }

    #[test]
    fn test_level_moves_at_most_one_step_per_answer() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();

        let mut previous = KnowledgeLevel::New;
        for i in 0..30 {
            let correct = i % 5 != 0;
            let record = engine
                .record_answer_at("cp-add-2-3", correct, None, now)
                .unwrap();
            let step = record.level.rank() as i32 - previous.rank() as i32;
            assert!(step.abs() <= 1, "answer moved level by {step}");
            previous = record.level;
        }
    }

    #[test]
    fn test_full_climb_to_mastered_and_cap() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();

        // 2 + 3 + 4 consecutive correct answers climb New → Mastered
        for _ in 0..9 {
            engine.record_answer_at("cp-add-2-3", true, None, now).unwrap();
        }
        let record = engine.get_fact("cp-add-2-3").unwrap();
        assert_eq!(record.level, KnowledgeLevel::Mastered);
        assert_eq!(record.next_review, now + Duration::days(7));

        // Mastered is terminal for promotion
        let still = engine.record_answer_at("cp-add-2-3", true, None, now).unwrap();
        assert_eq!(still.level, KnowledgeLevel::Mastered);
    }

    #[test]
    fn test_miss_at_mastered_drops_to_reviewing() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();
        for _ in 0..9 {
            engine.record_answer_at("cp-add-2-3", true, None, now).unwrap();
        }

        let after_miss = engine
            .record_answer_at("cp-add-2-3", false, None, now)
            .unwrap();
        assert_eq!(after_miss.level, KnowledgeLevel::Reviewing);
        assert_eq!(after_miss.success_count, 0);
        assert_eq!(after_miss.next_review, now + Duration::days(3));
    }

    #[test]
    fn test_interval_matches_new_level_after_every_answer() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();

        for i in 0..12 {
            let record = engine
                .record_answer_at("cp-add-2-3", i % 3 != 0, None, now)
                .unwrap();
            assert_eq!(
                record.next_review - record.last_reviewed,
                Duration::days(record.level.review_interval_days())
            );
        }
    }

    #[test]
    fn test_history_is_append_only_and_records_response_time() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();

        engine.record_answer_at("cp-add-2-3", true, Some(4.5), now).unwrap();
        engine.record_answer_at("cp-add-2-3", false, None, now).unwrap();

        let record = engine.get_fact("cp-add-2-3").unwrap();
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.history[0].response_time_secs, 4.5);
        assert!(record.history[0].was_correct);
        // Missing response time is recorded as zero
        assert_eq!(record.history[1].response_time_secs, 0.0);
        assert!(!record.history[1].was_correct);
    }

    #[test]
    fn test_due_query_inclusive_boundary() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();
        // Promote to Learning: due again in exactly one day
        engine.record_answer_at("cp-add-2-3", true, None, now).unwrap();
        engine.record_answer_at("cp-add-2-3", true, None, now).unwrap();

        let due_instant = now + Duration::days(1);
        assert!(engine.facts_due_at(due_instant - Duration::seconds(1)).is_empty());
        assert_eq!(engine.facts_due_at(due_instant).len(), 1);
    }

    #[test]
    fn test_foreign_records_are_swept_from_queries_and_store() {
        // Seed the store with one record from another curriculum level
        let mut seeded = MemoryStore::new();
        let mut facts = HashMap::new();
        let now = Utc::now();
        facts.insert(
            "cp-add-2-3".to_string(),
            FactRecord::new("cp-add-2-3", payload(2, 3), now),
        );
        facts.insert(
            "ce1-add-2-3".to_string(),
            FactRecord::new("ce1-add-2-3", payload(2, 3), now),
        );
        seeded.save_facts("alice", "cp", &facts).unwrap();

        let mut engine = SchedulingEngine::new("alice", "cp", Box::new(seeded));
        assert_eq!(engine.fact_count(), 2);

        let due = engine.facts_due_at(now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "cp-add-2-3");
        assert_eq!(engine.fact_count(), 1);
    }

    #[test]
    fn test_statistics_counts_and_percentage() {
        let mut engine = engine();
        let now = Utc::now();
        engine.create_fact_at("cp-add-1-1", payload(1, 1), now).unwrap();
        engine.create_fact_at("cp-add-1-2", payload(1, 2), now).unwrap();
        for _ in 0..9 {
            engine.record_answer_at("cp-add-1-1", true, None, now).unwrap();
        }

        let stats = engine.progress_statistics_at(now);
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.count_at(KnowledgeLevel::Mastered), 1);
        assert_eq!(stats.count_at(KnowledgeLevel::New), 1);
        assert_eq!(stats.mastered_percentage, 50);
        // The mastered fact is a week out; only the new one is due
        assert_eq!(stats.due.len(), 1);
    }

    #[test]
    fn test_statistics_on_empty_scope() {
        let mut engine = engine();
        let stats = engine.progress_statistics();
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.mastered_percentage, 0);
        assert!(stats.due.is_empty());
    }

    #[test]
    fn test_engine_survives_a_failing_store() {
        let mut engine = SchedulingEngine::new("alice", "cp", Box::new(FailingStore));
        let now = Utc::now();

        engine.create_fact_at("cp-add-2-3", payload(2, 3), now).unwrap();
        assert!(engine.is_dirty());

        let record = engine
            .record_answer_at("cp-add-2-3", true, Some(1.5), now)
            .unwrap();
        assert_eq!(record.success_count, 1);
        assert_eq!(engine.facts_due_at(now).len(), 1);
    }

    #[test]
    fn test_clear_all_progress_empties_scope() {
        let mut engine = engine();
        engine.create_fact("cp-add-2-3", payload(2, 3)).unwrap();
        engine.clear_all_progress().unwrap();

        assert_eq!(engine.fact_count(), 0);
        assert!(engine.facts_due_now().is_empty());
    }
}
