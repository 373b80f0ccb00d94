use serde::{Deserialize, Serialize};

use crate::error::TreeqlError;
use crate::transpiler::sql::ansi::AnsiGenerator;
use crate::transpiler::sql::postgres::PostgresGenerator;
use crate::transpiler::sql::sqlite::SqliteGenerator;
use crate::transpiler::traits::SqlGenerator;

/// Supported SQL dialects. Fixed when an emitter is built; never detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Ansi,
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn generator(&self) -> Box<dyn SqlGenerator + Send + Sync> {
        match self {
            Dialect::Ansi => Box::new(AnsiGenerator),
            Dialect::Sqlite => Box::new(SqliteGenerator),
            Dialect::Postgres => Box::new(PostgresGenerator),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Ansi => write!(f, "ansi"),
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = TreeqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ansi" => Ok(Dialect::Ansi),
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            other => Err(TreeqlError::Config(format!(
                "unknown dialect '{}'. Expected: ansi, sqlite or postgres",
                other
            ))),
        }
    }
}
