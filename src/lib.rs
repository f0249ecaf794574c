use std::fmt;
use thiserror::Error;

pub mod differ;
mod edit;
pub mod matcher;
pub mod normalize;
mod patch;
#[cfg(test)]
mod test_utils;

// Re-export the common entry points for convenience
pub use differ::{generate_diff_string, unified_diff, DiffResult};
pub use edit::{apply_edit, edit_file, EditOptions, EditResult};
pub use matcher::{
    find_edit_match, MatchCandidate, MatchOptions, MatchOutcome, DEFAULT_FUZZY_THRESHOLD,
};
pub use normalize::{LineEnding, NormalizedText};
pub use patch::{Chunk, Operation, Patch};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "Found {occurrences} {kind} of the text in {path}. The text must be unique. Please provide more context to make it unique.",
        kind = occurrence_kind(.fuzzy)
    )]
    AmbiguousMatch {
        path: String,
        occurrences: usize,
        fuzzy: bool,
    },

    #[error("{0}")]
    NoMatch(Box<NoMatchError>),

    #[error("No changes made to {path}. The replacement produced identical content.")]
    NoOpEdit { path: String },

    #[error("The old text must not be empty")]
    EmptyOldText,

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Cannot edit {path}: {reason}")]
    UnsupportedFile { path: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Error::AmbiguousMatch { .. })
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, Error::NoMatch(_))
    }
}

fn occurrence_kind(fuzzy: &bool) -> &'static str {
    if *fuzzy {
        "equally close matches"
    } else {
        "occurrences"
    }
}

/// Details of a failed lookup, for the agent to correct its old text.
#[derive(Debug, Clone, PartialEq)]
pub struct NoMatchError {
    pub path: String,
    /// The old text as it was searched for, after line-ending normalization.
    pub old_text: String,
    pub closest: Option<MatchCandidate>,
    pub fuzzy_matches: Vec<MatchCandidate>,
    pub allow_fuzzy: bool,
    pub similarity_threshold: f64,
    pub fuzzy_skipped: bool,
}

impl fmt::Display for NoMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not find the text to replace in {}. The old text must match the file exactly, including whitespace and newlines.",
            self.path
        )?;

        if !self.allow_fuzzy {
            write!(f, "\nFuzzy matching is disabled.")?;
        } else if self.fuzzy_skipped {
            write!(
                f,
                "\nFuzzy matching was skipped because the file is too large to scan for this text."
            )?;
        }

        if let Some(closest) = &self.closest {
            write!(
                f,
                "\nClosest match at line {} ({:.0}% similar, {:.0}% required):\n{}",
                closest.line,
                closest.similarity * 100.0,
                self.similarity_threshold * 100.0,
                closest.actual_text
            )?;
        }

        let others: Vec<String> = self
            .fuzzy_matches
            .iter()
            .filter(|candidate| Some(*candidate) != self.closest.as_ref())
            .map(|candidate| {
                format!(
                    "line {} ({:.0}%)",
                    candidate.line,
                    candidate.similarity * 100.0
                )
            })
            .collect();
        if !others.is_empty() {
            write!(f, "\nOther candidates: {}", others.join(", "))?;
        }

        Ok(())
    }
}
