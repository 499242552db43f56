pub mod database;
pub mod error;
pub mod models;

pub use database::{FactStore, JsonFileStore, MemoryStore, ServedBy, SqliteStore, TieredStore};
pub use error::{FactError, Result};
pub use models::{
    CurriculumLevel, CurriculumUnit, FactPayload, FactRecord, KnowledgeLevel, PracticeSession,
    ProgressStatistics, SchedulingEngine, SessionStats,
};
