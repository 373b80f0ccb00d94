use super::super::traits::SqlGenerator;

/// SQLite generator.
///
/// Placeholders are numbered `?N` (1-based) because the sqlx SQLite driver
/// only binds `?`, `?NNN` and `$NNN` parameters.
pub struct SqliteGenerator;

impl SqlGenerator for SqliteGenerator {
    fn placeholder(&self, index: usize) -> String {
        format!("?{}", index + 1)
    }

    fn bool_literal(&self, val: bool) -> String {
        if val {
            "1".to_string()
        } else {
            "0".to_string()
        }
    }

    fn limit_offset(&self, skip: usize, take: Option<usize>) -> String {
        // A negative limit is unbounded in SQLite.
        match take {
            Some(n) => format!(" limit {} offset {}", n, skip),
            None => format!(" limit -1 offset {}", skip),
        }
    }
}
