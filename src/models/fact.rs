//! An arithmetic fact and the per-learner progress record attached to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::KnowledgeLevel;

/// Arithmetic operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    /// Short code used inside fact identifiers, e.g. "cp-add-2-3".
    pub fn code(self) -> &'static str {
        match self {
            Operation::Addition => "add",
            Operation::Subtraction => "sub",
            Operation::Multiplication => "mul",
            Operation::Division => "div",
        }
    }
}

/// The question half of a fact: operands, operation, and the expected answer.
/// The scheduling engine carries this through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactPayload {
    pub operand_a: i64,
    pub operand_b: i64,
    pub operation: Operation,
    pub answer: i64,
}

/// One answered exercise, appended to a fact's history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub date: DateTime<Utc>,
    pub was_correct: bool,
    pub response_time_secs: f64,
}

/// Per-learner progress for one fact.
///
/// The id never changes after creation and is namespaced by curriculum level
/// code ("cp-add-2-3" belongs to level "cp"). Progress is mutated only by the
/// engine's record-answer operation; history is append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FactRecord {
    pub id: String,
    pub level: KnowledgeLevel,
    pub success_count: u32,
    pub last_reviewed: DateTime<Utc>,
    pub next_review: DateTime<Utc>,
    pub history: Vec<AnswerEvent>,
    pub payload: FactPayload,
}

impl FactRecord {
    /// Fresh record for a fact seen for the first time: level New, no
    /// successes, due immediately.
    pub fn new(id: impl Into<String>, payload: FactPayload, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            level: KnowledgeLevel::New,
            success_count: 0,
            last_reviewed: now,
            next_review: now,
            history: Vec::new(),
            payload,
        }
    }

    /// Due when the scheduled instant has passed. The comparison is on the
    /// full timestamp, not the calendar day, and the boundary is inclusive.
    pub fn is_due(&self, at: DateTime<Utc>) -> bool {
        self.next_review <= at
    }

    /// Namespace check: does this fact belong to the given curriculum level?
    pub fn belongs_to(&self, level_code: &str) -> bool {
        fact_belongs_to(&self.id, level_code)
    }
}

/// Prefix namespace check shared by record and raw-id call sites.
pub fn fact_belongs_to(fact_id: &str, level_code: &str) -> bool {
    !level_code.is_empty() && fact_id.starts_with(level_code)
}
