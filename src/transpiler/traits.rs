//! Dialect hooks for SQL generation.

/// Quote an identifier with square brackets, doubling any closing bracket.
pub fn bracket_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Trait for dialect-specific SQL generation.
///
/// The default methods render ANSI SQL; dialects override what differs.
pub trait SqlGenerator {
    /// Quote an identifier (table, alias or column name).
    fn quote_identifier(&self, name: &str) -> String {
        bracket_identifier(name)
    }

    /// Placeholder text for the parameter with the given zero-based index.
    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    /// Boolean literal (true/false vs 1/0).
    fn bool_literal(&self, val: bool) -> String {
        if val { "true".to_string() } else { "false".to_string() }
    }

    fn null_literal(&self) -> &str {
        "null"
    }

    /// Pagination clause, including its leading space. Only called when
    /// `skip > 0` or `take` is set; `take == None` means unbounded.
    fn limit_offset(&self, skip: usize, take: Option<usize>) -> String {
        match take {
            Some(n) => format!(" offset {} rows fetch next {} rows only", skip, n),
            None => format!(" offset {} rows", skip),
        }
    }
}
