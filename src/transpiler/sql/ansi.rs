use crate::transpiler::traits::SqlGenerator;

/// ANSI generator: bracket identifiers, `@pN` placeholders, `offset .. fetch next`.
pub struct AnsiGenerator;

impl SqlGenerator for AnsiGenerator {}
