//! Curriculum levels and their units of arithmetic facts.
//!
//! A curriculum level (a school-grade-like grouping such as "cp") partitions
//! facts into namespaces and supplies the fallback pool a session draws from
//! when nothing is due.

use serde::{Deserialize, Serialize};

use super::{FactPayload, Operation};

/// A named batch of facts inside a curriculum level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurriculumUnit {
    pub name: String,
    pub facts: Vec<(String, FactPayload)>,
}

/// A curriculum level: its namespace code plus ordered units.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurriculumLevel {
    pub code: String,
    pub units: Vec<CurriculumUnit>,
}

impl CurriculumLevel {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            units: Vec::new(),
        }
    }

    /// Builds the fact id for an operation in this level's namespace,
    /// e.g. "cp-add-2-3".
    pub fn fact_id(&self, operation: Operation, a: i64, b: i64) -> String {
        format!("{}-{}-{}-{}", self.code, operation.code(), a, b)
    }

    /// Appends a unit of generated facts for one operation over operand pairs.
    pub fn add_unit(
        &mut self,
        name: impl Into<String>,
        operation: Operation,
        pairs: &[(i64, i64)],
    ) {
        let facts = pairs
            .iter()
            .map(|&(a, b)| {
                let answer = match operation {
                    Operation::Addition => a + b,
                    Operation::Subtraction => a - b,
                    Operation::Multiplication => a * b,
                    Operation::Division => a / b,
                };
                let payload = FactPayload {
                    operand_a: a,
                    operand_b: b,
                    operation,
                    answer,
                };
                (self.fact_id(operation, a, b), payload)
            })
            .collect();

        self.units.push(CurriculumUnit {
            name: name.into(),
            facts,
        });
    }

    /// Up to `n` facts for a session with nothing due. Always drawn from the
    /// first unit, matching the original behavior; a policy that tracks the
    /// learner's position in the curriculum would pick a better unit.
    pub fn fallback_facts(&self, n: usize) -> Vec<(String, FactPayload)> {
        self.units
            .first()
            .map(|unit| unit.facts.iter().take(n).cloned().collect())
            .unwrap_or_default()
    }
}
