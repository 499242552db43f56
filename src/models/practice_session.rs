//! One bounded practice run over the facts the engine says are due.
//!
//! The session owns an ordered list of facts and a cursor. Recording an
//! outcome and moving to the next exercise are separate actions so the caller
//! decides when to move on (e.g. after the learner has seen the feedback).

use log::debug;

use crate::error::Result;
use crate::models::{CurriculumLevel, FactRecord, SchedulingEngine};

/// Hard cap on session length; anything due beyond it waits for a later run.
pub const MAX_SESSION_FACTS: usize = 10;

/// How many facts to pull from the curriculum when nothing is due.
pub const FALLBACK_FACT_COUNT: usize = 5;

/// Aggregated results of a finished (or running) session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionStats {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    /// Rounded percentage of correct answers; 0 when nothing was answered.
    pub success_rate: u32,
    /// Mean response time in seconds, rounded to one decimal place.
    pub average_response_time_secs: f64,
}

pub struct PracticeSession<'a> {
    engine: &'a mut SchedulingEngine,
    facts: Vec<FactRecord>,
    cursor: usize,
    complete: bool,
    correct_count: u32,
    incorrect_count: u32,
    total_response_time_secs: f64,
}

impl<'a> PracticeSession<'a> {
    /// Builds a session from the facts due now. When nothing is due, draws up
    /// to [`FALLBACK_FACT_COUNT`] facts from the curriculum's first unit and
    /// registers them with the engine. A session can come up empty; that is a
    /// normal state, not an error.
    pub fn initialize(
        engine: &'a mut SchedulingEngine,
        curriculum: &CurriculumLevel,
    ) -> Result<Self> {
        Self::initialize_at(engine, curriculum, chrono::Utc::now())
    }

    pub fn initialize_at(
        engine: &'a mut SchedulingEngine,
        curriculum: &CurriculumLevel,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self> {
        let mut due = engine.facts_due_at(now);

        if due.is_empty() {
            let fallback = curriculum.fallback_facts(FALLBACK_FACT_COUNT);
            if !fallback.is_empty() {
                engine.create_many_facts_at(fallback, now)?;
                due = engine.facts_due_at(now);
            }
        }

        due.truncate(MAX_SESSION_FACTS);
        debug!("session starts with {} facts", due.len());

        let complete = due.is_empty();
        Ok(Self {
            engine,
            facts: due,
            cursor: 0,
            complete,
            correct_count: 0,
            incorrect_count: 0,
            total_response_time_secs: 0.0,
        })
    }

    /// The exercise the learner is looking at, if the session is running.
    pub fn current_fact(&self) -> Option<&FactRecord> {
        if self.complete {
            None
        } else {
            self.facts.get(self.cursor)
        }
    }

    /// Moves to the next exercise, or completes the session when the cursor
    /// is already on the last one.
    pub fn advance(&mut self) {
        if self.cursor + 1 < self.facts.len() {
            self.cursor += 1;
        } else {
            self.complete = true;
        }
    }

    /// Books one answered exercise: bumps the session counters and forwards
    /// the outcome to the scheduling engine. Does not advance the cursor.
    pub fn record_outcome(
        &mut self,
        fact_id: &str,
        was_correct: bool,
        response_time_secs: f64,
    ) -> Result<FactRecord> {
        self.record_outcome_at(fact_id, was_correct, response_time_secs, chrono::Utc::now())
    }

    pub fn record_outcome_at(
        &mut self,
        fact_id: &str,
        was_correct: bool,
        response_time_secs: f64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<FactRecord> {
        let updated =
            self.engine
                .record_answer_at(fact_id, was_correct, Some(response_time_secs), now)?;

        if was_correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }
        self.total_response_time_secs += response_time_secs;

        Ok(updated)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True when the session ever had exercises, letting the caller tell
    /// "all done, great job" apart from "nothing due today".
    pub fn had_facts(&self) -> bool {
        !self.facts.is_empty()
    }

    /// Fraction of the session already passed, in 0.0..=1.0.
    pub fn progress_fraction(&self) -> f64 {
        if self.complete || self.facts.is_empty() {
            1.0
        } else {
            self.cursor as f64 / self.facts.len() as f64
        }
    }

    pub fn statistics(&self) -> SessionStats {
        let total = self.correct_count + self.incorrect_count;

        let success_rate = if total == 0 {
            0
        } else {
            (100.0 * self.correct_count as f64 / total as f64).round() as u32
        };

        let average_response_time_secs = if total == 0 {
            0.0
        } else {
            let avg = self.total_response_time_secs / total as f64;
            (avg * 10.0).round() / 10.0
        };

        SessionStats {
            total,
            correct: self.correct_count,
            incorrect: self.incorrect_count,
            success_rate,
            average_response_time_secs,
        }
    }
}
