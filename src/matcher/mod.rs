mod exact;
mod fuzzy;

use tracing::debug;

pub use exact::find_exact;
pub use fuzzy::{normalize_for_fuzzy, similarity_score, FuzzyMatcher, FuzzyOutcome};

/// Default similarity a fuzzy candidate needs to be accepted.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Default lowest similarity still worth reporting as a near miss.
pub const DEFAULT_REPORT_FLOOR: f64 = 0.5;

/// Default number of near misses kept for diagnostics.
pub const DEFAULT_MAX_FUZZY_MATCHES: usize = 3;

/// Default content size (bytes) above which fuzzy matching is skipped.
pub const DEFAULT_FUZZY_CONTENT_LIMIT: usize = 512 * 1024;

/// Default number of Levenshtein cells one fuzzy scan may compute.
///
/// Scoring a window costs its length times the needle's length in chars, so a
/// long needle over a file well under the content limit can still be too slow.
pub const DEFAULT_FUZZY_WORK_LIMIT: u64 = 1_000_000_000;

/// A located occurrence of the needle in normalized content.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    /// Byte offset into the normalized content.
    pub start_index: usize,
    /// Verbatim slice of the normalized content at `start_index`.
    pub actual_text: String,
    /// 1.0 for text identical to the needle (after whitespace normalization).
    pub similarity: f64,
    /// 1-based line where the candidate starts.
    pub line: usize,
}

impl MatchCandidate {
    pub(crate) fn from_span(content: &str, start: usize, end: usize, similarity: f64) -> Self {
        Self {
            start_index: start,
            actual_text: content[start..end].to_string(),
            similarity,
            line: line_number_at(content, start),
        }
    }

    /// Byte offset one past the end of the candidate.
    pub fn end_index(&self) -> usize {
        self.start_index + self.actual_text.len()
    }
}

/// Result of looking up an edit's old text.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Exactly one location matched.
    Unique(MatchCandidate),
    /// Several locations matched equally well, so no edit is safe.
    Ambiguous {
        occurrences: usize,
        /// True when the tie was between fuzzy candidates rather than exact hits.
        fuzzy: bool,
    },
    /// Nothing matched. Carries near misses for diagnostics.
    NotFound {
        closest: Option<MatchCandidate>,
        fuzzy_matches: Vec<MatchCandidate>,
        /// Fuzzy matching was skipped because the content or the scan cost
        /// exceeded its limit.
        fuzzy_skipped: bool,
    },
}

impl MatchOutcome {
    pub fn matched(&self) -> Option<&MatchCandidate> {
        match self {
            MatchOutcome::Unique(candidate) => Some(candidate),
            _ => None,
        }
    }

    /// 1 for a unique hit, N for an ambiguous one, 0 when nothing matched.
    pub fn occurrences(&self) -> usize {
        match self {
            MatchOutcome::Unique(_) => 1,
            MatchOutcome::Ambiguous { occurrences, .. } => *occurrences,
            MatchOutcome::NotFound { .. } => 0,
        }
    }

    fn not_found() -> Self {
        MatchOutcome::NotFound {
            closest: None,
            fuzzy_matches: Vec::new(),
            fuzzy_skipped: false,
        }
    }
}

/// Knobs for [`find_edit_match`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    pub allow_fuzzy: bool,
    pub similarity_threshold: f64,
    pub report_floor: f64,
    pub max_fuzzy_matches: usize,
    /// `None` disables the size guard.
    pub fuzzy_content_limit: Option<usize>,
    /// `None` disables the scan cost guard.
    pub fuzzy_work_limit: Option<u64>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            allow_fuzzy: true,
            similarity_threshold: DEFAULT_FUZZY_THRESHOLD,
            report_floor: DEFAULT_REPORT_FLOOR,
            max_fuzzy_matches: DEFAULT_MAX_FUZZY_MATCHES,
            fuzzy_content_limit: Some(DEFAULT_FUZZY_CONTENT_LIMIT),
            fuzzy_work_limit: Some(DEFAULT_FUZZY_WORK_LIMIT),
        }
    }
}

impl MatchOptions {
    pub fn allow_fuzzy(mut self, allow: bool) -> Self {
        self.allow_fuzzy = allow;
        self
    }

    /// Clamped to `[0, 1]`.
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn report_floor(mut self, floor: f64) -> Self {
        self.report_floor = floor.clamp(0.0, 1.0);
        self
    }

    pub fn max_fuzzy_matches(mut self, max: usize) -> Self {
        self.max_fuzzy_matches = max;
        self
    }

    pub fn fuzzy_content_limit(mut self, limit: Option<usize>) -> Self {
        self.fuzzy_content_limit = limit;
        self
    }

    pub fn fuzzy_work_limit(mut self, limit: Option<u64>) -> Self {
        self.fuzzy_work_limit = limit;
        self
    }
}

/// Locate `needle` in `content`, both already LF-normalized.
///
/// Exact hits win. A single exact hit is returned with similarity 1.0, several
/// are reported as ambiguous. Only when there is no exact hit does the fuzzy
/// matcher run, and its top candidate is accepted only if it clears the
/// threshold on its own.
pub fn find_edit_match(content: &str, needle: &str, options: &MatchOptions) -> MatchOutcome {
    if needle.is_empty() {
        return MatchOutcome::not_found();
    }

    let exact = find_exact(content, needle);
    match exact.len() {
        1 => {
            let start = exact[0];
            debug!(start, "unique exact match");
            return MatchOutcome::Unique(MatchCandidate::from_span(
                content,
                start,
                start + needle.len(),
                1.0,
            ));
        }
        0 => {}
        occurrences => {
            debug!(occurrences, "ambiguous exact match");
            return MatchOutcome::Ambiguous {
                occurrences,
                fuzzy: false,
            };
        }
    }

    match FuzzyMatcher::new(options).find(content, needle) {
        FuzzyOutcome::Accepted(candidate) => {
            debug!(
                start = candidate.start_index,
                similarity = candidate.similarity,
                "accepted fuzzy match"
            );
            MatchOutcome::Unique(candidate)
        }
        FuzzyOutcome::Tied { occurrences } => {
            debug!(occurrences, "ambiguous fuzzy match");
            MatchOutcome::Ambiguous {
                occurrences,
                fuzzy: true,
            }
        }
        FuzzyOutcome::Rejected {
            closest,
            fuzzy_matches,
        } => {
            debug!(
                closest = closest.as_ref().map(|c| c.similarity),
                "no match above threshold"
            );
            MatchOutcome::NotFound {
                closest,
                fuzzy_matches,
                fuzzy_skipped: false,
            }
        }
        FuzzyOutcome::Skipped => MatchOutcome::NotFound {
            closest: None,
            fuzzy_matches: Vec::new(),
            fuzzy_skipped: true,
        },
        FuzzyOutcome::Disabled => MatchOutcome::not_found(),
    }
}

/// 1-based line number of the byte offset `index`.
pub(crate) fn line_number_at(content: &str, index: usize) -> usize {
    content.as_bytes()[..index]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}
