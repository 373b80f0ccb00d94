pub mod ansi;
pub mod postgres;
pub mod sqlite;
