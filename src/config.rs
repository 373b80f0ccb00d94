//! Settings loaded from `treeql.toml`.
//!
//! ```toml
//! [compiler]
//! dialect = "sqlite"
//!
//! [database]
//! url = "sqlite::memory:"
//! ```
//!
//! Both sections are optional. The dialect defaults to ANSI.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::engine::{Database, QueryExecutor};
use crate::error::{TreeqlError, TreeqlResult};
use crate::transpiler::{Dialect, SqlEmitter};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    #[serde(default)]
    compiler: CompilerSection,
    database: Option<DatabaseSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompilerSection {
    dialect: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseSection {
    url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    dialect: Dialect,
    database_url: Option<String>,
}

impl Settings {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            database_url: None,
        }
    }

    pub fn from_toml_str(content: &str) -> TreeqlResult<Self> {
        let file: SettingsFile =
            toml::from_str(content).map_err(|e| TreeqlError::Config(e.to_string()))?;

        let dialect = match file.compiler.dialect {
            Some(name) => name.parse()?,
            None => Dialect::default(),
        };
        Ok(Self {
            dialect,
            database_url: file.database.map(|db| db.url),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> TreeqlResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TreeqlError::Config(format!(
                "{} not found",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn emitter(&self) -> SqlEmitter {
        SqlEmitter::new(self.dialect)
    }

    pub fn executor(&self) -> QueryExecutor {
        QueryExecutor::new(self.dialect)
    }

    /// Open a pool on the configured `[database] url`.
    pub async fn connect(&self) -> TreeqlResult<Database> {
        let url = self
            .database_url()
            .ok_or_else(|| TreeqlError::Config("missing [database] url".to_string()))?;
        Database::connect(url, self.dialect).await
    }
}
