use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Bad dimensions, bad grouping, oversized table, or invalid registration.
    Configuration(String),
    /// A named column is absent from the data source.
    MissingVariable(String),
    /// Unrecognized statistical test name.
    UnknownTest(String),
    /// Grid access outside the blueprint's dimensions.
    Index { row: u32, col: u32, rows: u32, cols: u32 },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::MissingVariable(name) => write!(f, "variable '{name}' not found in data"),
            Self::UnknownTest(name) => write!(f, "unknown test: '{name}'"),
            Self::Index { row, col, rows, cols } => {
                write!(f, "cell ({row},{col}) out of bounds for {rows}x{cols} grid")
            }
        }
    }
}

impl std::error::Error for EngineError {}
