//! Source locations attached to instructions and surfaced in reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Debug location of an instruction (file, 1-based line, 1-based column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_file_line() {
        let loc = SourceLoc::new("main.c", 42, 7);
        assert_eq!(loc.to_string(), "main.c:42");
    }
}
