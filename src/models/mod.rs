pub mod curriculum;
pub mod fact;
pub mod knowledge;
pub mod practice_session;
pub mod scheduler;

pub use curriculum::{CurriculumLevel, CurriculumUnit};
pub use fact::{AnswerEvent, FactPayload, FactRecord, Operation, fact_belongs_to};
pub use knowledge::KnowledgeLevel;
pub use practice_session::{FALLBACK_FACT_COUNT, MAX_SESSION_FACTS, PracticeSession, SessionStats};
pub use scheduler::{ProgressStatistics, SchedulingEngine};
