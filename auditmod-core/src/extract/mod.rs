//! Signal extraction from raw source text.
//!
//! Two kinds of signal are produced per unit:
//! - single-line [`Occurrence`]s of a [`LinePattern`] (e.g. `Arc<Mutex<T>>`),
//!   each with a small context window;
//! - multi-line [`DeclarationUnit`]s (trait declarations), located by a header
//!   regex and then a brace-depth walk to the matching `}`.
//!
//! # Limitations
//!
//! There is no parser here. The depth walk counts every `{` and `}` it sees,
//! including ones inside string literals, char literals and comments, so a
//! body containing an unbalanced brace in a literal is cut at the wrong place
//! (or dropped). Detection results are advisory and may contain false
//! positives and negatives.
//!
//! # Example
//!
//! ```ignore
//! use auditmod_core::extract::{extract_occurrences, extract_trait_declarations, LinePattern};
//!
//! let occurrences = extract_occurrences(&unit, LinePattern::arc_mutex(), 3);
//! let traits = extract_trait_declarations(&unit);
//! ```

pub mod declaration;
pub mod occurrence;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

pub use declaration::{
    extract_trait_declarations, find_block_end, strip_line_comment, DeclarationUnit,
};
pub use occurrence::{extract_occurrences, LinePattern, Occurrence, DEFAULT_CONTEXT_LINES};

/// Unit path plus 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// Byte offset → 1-based line number lookup for one text.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts = Vec::with_capacity(text.len() / 32 + 1);
        starts.push(0);
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub(crate) fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let text = "a\nbc\n\nd";
        let idx = LineIndex::new(text);
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(2), 2);
        assert_eq!(idx.line_of(3), 2);
        assert_eq!(idx.line_of(5), 3);
        assert_eq!(idx.line_of(6), 4);
    }

    #[test]
    fn test_location_display() {
        let loc = Location {
            path: PathBuf::from("src/lib.rs"),
            line: 12,
        };
        assert_eq!(loc.to_string(), "src/lib.rs:12");
    }
}
