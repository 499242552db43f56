//! Knowledge levels and the scheduling tables attached to them.
//!
//! The model is a four-step ladder: NEW → LEARNING → REVIEWING → MASTERED.
//! Each level carries a review interval (days until the fact comes back) and
//! a success threshold (consecutive correct answers needed to climb one step).
//! Answers move a fact by at most one level in either direction.

use serde::{Deserialize, Serialize};

/// Mastery rank of a single arithmetic fact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KnowledgeLevel {
    New,
    Learning,
    Reviewing,
    Mastered,
}

impl KnowledgeLevel {
    /// All levels in ascending rank order.
    pub const ALL: [KnowledgeLevel; 4] = [
        KnowledgeLevel::New,
        KnowledgeLevel::Learning,
        KnowledgeLevel::Reviewing,
        KnowledgeLevel::Mastered,
    ];

    /// Integer rank, 0 (New) through 3 (Mastered).
    pub fn rank(self) -> u8 {
        match self {
            KnowledgeLevel::New => 0,
            KnowledgeLevel::Learning => 1,
            KnowledgeLevel::Reviewing => 2,
            KnowledgeLevel::Mastered => 3,
        }
    }

    /// Level for a stored integer rank, if valid.
    pub fn from_rank(rank: u8) -> Option<KnowledgeLevel> {
        KnowledgeLevel::ALL.into_iter().find(|l| l.rank() == rank)
    }

    /// The next level up, capped at Mastered.
    pub fn promoted(self) -> KnowledgeLevel {
        match self {
            KnowledgeLevel::New => KnowledgeLevel::Learning,
            KnowledgeLevel::Learning => KnowledgeLevel::Reviewing,
            KnowledgeLevel::Reviewing | KnowledgeLevel::Mastered => KnowledgeLevel::Mastered,
        }
    }

    /// The next level down, floored at New.
    pub fn demoted(self) -> KnowledgeLevel {
        match self {
            KnowledgeLevel::New | KnowledgeLevel::Learning => KnowledgeLevel::New,
            KnowledgeLevel::Reviewing => KnowledgeLevel::Learning,
            KnowledgeLevel::Mastered => KnowledgeLevel::Reviewing,
        }
    }

    /// Days until the next review for a fact sitting at this level.
    pub fn review_interval_days(self) -> i64 {
        match self {
            KnowledgeLevel::New => 0,
            KnowledgeLevel::Learning => 1,
            KnowledgeLevel::Reviewing => 3,
            KnowledgeLevel::Mastered => 7,
        }
    }

    /// Consecutive correct answers required at this level before promotion.
    /// Mastered is terminal and has no threshold.
    pub fn success_threshold(self) -> Option<u32> {
        match self {
            KnowledgeLevel::New => Some(2),
            KnowledgeLevel::Learning => Some(3),
            KnowledgeLevel::Reviewing => Some(4),
            KnowledgeLevel::Mastered => None,
        }
    }
}
