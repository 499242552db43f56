//! JSON-file fact store, the fallback persistence tier.
//! One pretty-printed JSON file per (learner, level) scope in a base directory.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::FactStore;
use crate::error::Result;
use crate::models::FactRecord;

pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    /// Uses `base_dir` for scope files, creating it if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn scope_path(&self, learner_id: &str, level_code: &str) -> PathBuf {
        self.base_dir.join(format!("{learner_id}_{level_code}.json"))
    }
}

impl FactStore for JsonFileStore {
    fn load_facts_for_scope(
        &mut self,
        learner_id: &str,
        level_code: &str,
    ) -> Result<HashMap<String, FactRecord>> {
        let path = self.scope_path(learner_id, level_code);

        // A scope that was never saved is an empty scope, not an error.
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        let facts: HashMap<String, FactRecord> = serde_json::from_str(&contents)?;
        Ok(facts)
    }

    fn save_facts(
        &mut self,
        learner_id: &str,
        level_code: &str,
        facts: &HashMap<String, FactRecord>,
    ) -> Result<()> {
        let json_string = serde_json::to_string_pretty(facts)?;
        let mut file = File::create(self.scope_path(learner_id, level_code))?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }

    fn clear_scope(&mut self, learner_id: &str, level_code: &str) -> Result<()> {
        let path = self.scope_path(learner_id, level_code);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
