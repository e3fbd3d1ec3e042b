use crate::error::{StoreError, StoreResult};
use crate::subscriber::KEYSPACE_PREFIX;
use crate::utils::config_io::load_cfg;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_separator() -> String {
    ":".to_string()
}

/// Where a logical database lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DbConfig {
    pub name: String,
    /// `host:port` or `unix:/path/to/socket`.
    pub address: String,
    pub db_id: u32,
    /// Separator between table name and key.
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl DbConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>, db_id: u32) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            db_id,
            separator: default_separator(),
        }
    }

    /// Key-space channel pattern matching every key of `table` in this database.
    pub fn keyspace_pattern(&self, table: &str) -> String {
        format!(
            "{KEYSPACE_PREFIX}@{}__:{table}{}*",
            self.db_id, self.separator
        )
    }

    /// Full key of `key` inside `table`.
    pub fn table_key(&self, table: &str, key: &str) -> String {
        format!("{table}{}{key}", self.separator)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DbRegistryConfig {
    pub databases: Vec<DbConfig>,
}

/// Name → database lookup.
#[derive(Debug, Clone, Default)]
pub struct DbRegistry {
    databases: HashMap<String, DbConfig>,
}

impl DbRegistry {
    pub fn new(cfg: DbRegistryConfig) -> Self {
        let mut databases = HashMap::with_capacity(cfg.databases.len());
        for db in cfg.databases {
            if databases.contains_key(&db.name) {
                tracing::warn!("[DbRegistry] duplicate database '{}', keeping first", db.name);
                continue;
            }
            databases.insert(db.name.clone(), db);
        }
        Self { databases }
    }

    /// Loads the registry from a config file (any format the `config` crate reads).
    pub fn load(path: impl AsRef<str>) -> anyhow::Result<Self> {
        let cfg: DbRegistryConfig = load_cfg(path)?;
        Ok(Self::new(cfg))
    }

    pub fn insert(&mut self, db: DbConfig) {
        self.databases.insert(db.name.clone(), db);
    }

    pub fn get(&self, name: &str) -> StoreResult<&DbConfig> {
        self.databases
            .get(name)
            .ok_or_else(|| StoreError::UnknownDatabase(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}
