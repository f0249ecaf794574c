use super::{MatchCandidate, MatchOptions};
use levenshtein::levenshtein;
use std::borrow::Cow;
use std::cmp::Ordering;
use tracing::{debug, warn};

// Scores closer than this are treated as a tie.
const SCORE_EPSILON: f64 = 1e-9;

/// Whitespace-tolerant matcher over line-aligned windows of the content.
pub struct FuzzyMatcher<'a> {
    options: &'a MatchOptions,
}

/// What the fuzzy scan concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum FuzzyOutcome {
    /// A single window scored at or above the threshold.
    Accepted(MatchCandidate),
    /// Several windows share the top score at or above the threshold.
    Tied { occurrences: usize },
    /// No window cleared the threshold.
    Rejected {
        closest: Option<MatchCandidate>,
        fuzzy_matches: Vec<MatchCandidate>,
    },
    /// The content, or the cost of scoring it, is over the configured limit.
    Skipped,
    /// Fuzzy matching is turned off.
    Disabled,
}

/// A scored window, kept as byte offsets until it is reported.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: usize,
    end: usize,
    score: f64,
}

/// Byte span of a content line, newline excluded.
#[derive(Debug, Clone, Copy)]
struct LineSpan {
    start: usize,
    end: usize,
}

impl<'a> FuzzyMatcher<'a> {
    pub fn new(options: &'a MatchOptions) -> Self {
        Self { options }
    }

    /// Scan `content` for windows resembling `needle`. Both must be LF-normalized.
    pub fn find(&self, content: &str, needle: &str) -> FuzzyOutcome {
        if !self.options.allow_fuzzy {
            return FuzzyOutcome::Disabled;
        }
        if let Some(limit) = self.options.fuzzy_content_limit {
            if content.len() > limit {
                warn!(
                    content_len = content.len(),
                    limit, "content exceeds fuzzy matching limit, skipping fuzzy search"
                );
                return FuzzyOutcome::Skipped;
            }
        }

        match self.score_windows(content, needle) {
            Some(windows) => self.rank(content, windows),
            None => FuzzyOutcome::Skipped,
        }
    }

    /// Score every line window, or `None` once the work limit is exceeded.
    fn score_windows(&self, content: &str, needle: &str) -> Option<Vec<Window>> {
        if content.is_empty() || needle.is_empty() {
            return Some(Vec::new());
        }

        // A trailing newline belongs to the needle's last line, not a line of its own.
        let (body, trailing_newline) = match needle.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (needle, false),
        };
        let needle_norm = normalize_for_fuzzy(body);
        let needle_line_count = body.split('\n').count();

        let spans = line_spans(content);
        if needle_line_count > spans.len() {
            return Some(Vec::new());
        }
        let normalized_lines: Vec<String> = spans
            .iter()
            .map(|span| normalize_line(&content[span.start..span.end]).into_owned())
            .collect();

        // offsets[i] is the char count of lines before i, newlines included.
        let mut offsets = Vec::with_capacity(normalized_lines.len() + 1);
        offsets.push(0usize);
        for line in &normalized_lines {
            let prev = offsets[offsets.len() - 1];
            offsets.push(prev + line.chars().count() + 1);
        }
        let window_len = |first: usize| offsets[first + needle_line_count] - offsets[first] - 1;

        let needle_len = needle_norm.chars().count();
        let floor = self.options.report_floor;
        let window_count = spans.len() - needle_line_count + 1;
        let cost = |len: usize| (len as u64).saturating_mul(needle_len as u64);

        // Windows within the floor's length ratio are always scored.
        if let Some(limit) = self.options.fuzzy_work_limit {
            let committed = (0..window_count)
                .map(&window_len)
                .filter(|&len| length_ratio(len, needle_len) >= floor)
                .map(&cost)
                .fold(0u64, u64::saturating_add);
            if committed > limit {
                warn!(
                    work = committed,
                    limit, "fuzzy scan would exceed its work limit, skipping fuzzy search"
                );
                return None;
            }
        }

        let mut best = f64::NEG_INFINITY;
        let mut work = 0u64;
        let mut windows = Vec::with_capacity(window_count);

        for first in 0..window_count {
            let last = first + needle_line_count - 1;

            // Similarity can never exceed the ratio of the two lengths.
            let len = window_len(first);
            let upper_bound = length_ratio(len, needle_len);
            if upper_bound < best && upper_bound < floor {
                continue;
            }

            work = work.saturating_add(cost(len));
            if let Some(limit) = self.options.fuzzy_work_limit {
                if work > limit {
                    warn!(work, limit, "fuzzy scan exceeded its work limit, skipping fuzzy search");
                    return None;
                }
            }

            let window_norm = normalized_lines[first..=last].join("\n");
            let score = similarity_score(&window_norm, &needle_norm);
            if score > best {
                best = score;
            }

            let mut end = spans[last].end;
            if trailing_newline && end < content.len() {
                end += 1;
            }
            windows.push(Window {
                start: spans[first].start,
                end,
                score,
            });
        }

        debug!(
            windows = windows.len(),
            lines = spans.len(),
            needle_lines = needle_line_count,
            work,
            "scored fuzzy windows"
        );
        Some(windows)
    }

    fn rank(&self, content: &str, mut windows: Vec<Window>) -> FuzzyOutcome {
        windows.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.start.cmp(&b.start),
            other => other,
        });

        let Some(top) = windows.first().copied() else {
            return FuzzyOutcome::Rejected {
                closest: None,
                fuzzy_matches: Vec::new(),
            };
        };

        if top.score >= self.options.similarity_threshold {
            let ties = windows
                .iter()
                .take_while(|w| (top.score - w.score).abs() < SCORE_EPSILON)
                .count();
            if ties > 1 {
                return FuzzyOutcome::Tied { occurrences: ties };
            }
            return FuzzyOutcome::Accepted(to_candidate(content, top));
        }

        let fuzzy_matches = windows
            .iter()
            .take_while(|w| w.score >= self.options.report_floor)
            .take(self.options.max_fuzzy_matches)
            .map(|w| to_candidate(content, *w))
            .collect();

        FuzzyOutcome::Rejected {
            closest: Some(to_candidate(content, top)),
            fuzzy_matches,
        }
    }
}

fn to_candidate(content: &str, window: Window) -> MatchCandidate {
    MatchCandidate::from_span(content, window.start, window.end, window.score)
}

fn line_spans(content: &str) -> Vec<LineSpan> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (idx, b) in content.bytes().enumerate() {
        if b == b'\n' {
            spans.push(LineSpan { start, end: idx });
            start = idx + 1;
        }
    }
    spans.push(LineSpan {
        start,
        end: content.len(),
    });
    spans
}

fn length_ratio(a: usize, b: usize) -> f64 {
    let max = a.max(b);
    if max == 0 {
        1.0
    } else {
        a.min(b) as f64 / max as f64
    }
}

/// Fold typographic look-alikes onto their ASCII forms.
fn fold_char(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
        '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
        _ => c,
    }
}

/// Trim a line, collapse inner whitespace runs to one space and fold look-alikes.
fn normalize_line(line: &str) -> Cow<'_, str> {
    let trimmed = line.trim();
    let already_normal = !trimmed.contains("  ")
        && !trimmed
            .chars()
            .any(|c| (c.is_whitespace() && c != ' ') || fold_char(c) != c);
    if already_normal {
        return Cow::Borrowed(trimmed);
    }

    let mut result = String::with_capacity(trimmed.len());
    for word in trimmed.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.extend(word.chars().map(fold_char));
    }
    Cow::Owned(result)
}

/// Normalize text for fuzzy comparison, line by line.
///
/// Indentation, trailing blanks and spacing inside a line are ignored, as are
/// curly quotes, unicode dashes and unicode spaces. Line breaks and the order of
/// tokens are kept.
pub fn normalize_for_fuzzy(text: &str) -> String {
    text.split('\n')
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Levenshtein similarity of two already-normalized strings, in `[0, 1]`.
pub fn similarity_score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }

    let distance = levenshtein(a, b) as f64;
    let max_len = len_a.max(len_b) as f64;
    (1.0 - (distance / max_len)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> MatchOptions {
        MatchOptions::default()
    }

    #[test]
    fn test_normalize_for_fuzzy() {
        assert_eq!(normalize_for_fuzzy("    return value;"), "return value;");
        assert_eq!(normalize_for_fuzzy("a  =\t b  "), "a = b");
        assert_eq!(
            normalize_for_fuzzy("  if x {\n\t\ty();\n  }"),
            "if x {\ny();\n}"
        );
        assert_eq!(
            normalize_for_fuzzy("say(\u{201C}hi\u{201D}) \u{2014} it\u{2019}s"),
            "say(\"hi\") - it's"
        );
        assert_eq!(normalize_for_fuzzy("a\u{00A0}b"), "a b");
    }

    #[test]
    fn test_similarity_score_properties() {
        assert_eq!(similarity_score("abc", "abc"), 1.0);
        assert_eq!(similarity_score("", ""), 1.0);
        assert_eq!(similarity_score("abc", ""), 0.0);
        let ab = similarity_score("return value;", "return valu;");
        let ba = similarity_score("return valu;", "return value;");
        assert_eq!(ab, ba);
        assert!(ab < 1.0);
        let further = similarity_score("return value;", "return val;");
        assert!(further < ab);
    }

    #[test]
    fn test_indentation_drift_scores_one() {
        let matcher_options = options();
        let matcher = FuzzyMatcher::new(&matcher_options);
        match matcher.find("fn f() {\n    return value;\n}", "return  value;") {
            FuzzyOutcome::Accepted(candidate) => {
                assert_eq!(candidate.similarity, 1.0);
                assert_eq!(candidate.actual_text, "    return value;");
                assert_eq!(candidate.start_index, 9);
            }
            other => panic!("expected Accepted, got {:?}", other),
        }
    }

    #[test]
    fn test_other_identifier_rejected() {
        let score = similarity_score(
            &normalize_for_fuzzy("return value;"),
            &normalize_for_fuzzy("return other;"),
        );
        assert!(score < 0.85, "score was {}", score);

        let matcher_options = options();
        let outcome = FuzzyMatcher::new(&matcher_options).find("return other;", "return value;");
        match outcome {
            FuzzyOutcome::Rejected { closest, .. } => {
                let closest = closest.expect("closest expected");
                assert_eq!(closest.actual_text, "return other;");
                assert!((closest.similarity - score).abs() < 1e-12);
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_multiline_window_with_trailing_newline() {
        let content = "a\n  b\n  c\nd\n";
        let matcher_options = options();
        let outcome = FuzzyMatcher::new(&matcher_options).find(content, "b\nc\n");
        match outcome {
            FuzzyOutcome::Accepted(candidate) => {
                assert_eq!(candidate.actual_text, "  b\n  c\n");
                assert_eq!(candidate.line, 2);
            }
            other => panic!("expected Accepted, got {:?}", other),
        }
    }

    #[test]
    fn test_needle_longer_than_content() {
        let matcher_options = options();
        let outcome = FuzzyMatcher::new(&matcher_options).find("one line", "one\ntwo\nthree");
        assert_eq!(
            outcome,
            FuzzyOutcome::Rejected {
                closest: None,
                fuzzy_matches: Vec::new()
            }
        );
    }

    #[test]
    fn test_fuzzy_matches_are_ranked_and_capped() {
        let content = "let total = a + b;\nlet totl = a + b;\nlet tot = a + b;\nlet t = a + b;\nunrelated();\n";
        let matcher_options = options().similarity_threshold(1.0).max_fuzzy_matches(2);
        let outcome = FuzzyMatcher::new(&matcher_options).find(content, "let totals = a + b;");
        match outcome {
            FuzzyOutcome::Rejected {
                closest,
                fuzzy_matches,
            } => {
                assert_eq!(fuzzy_matches.len(), 2);
                assert_eq!(fuzzy_matches[0].line, 1);
                assert_eq!(fuzzy_matches[1].line, 2);
                assert!(fuzzy_matches[0].similarity > fuzzy_matches[1].similarity);
                assert_eq!(closest.as_ref(), fuzzy_matches.first());
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_and_skipped() {
        let disabled = options().allow_fuzzy(false);
        assert_eq!(
            FuzzyMatcher::new(&disabled).find("abc", "abd"),
            FuzzyOutcome::Disabled
        );

        let capped = options().fuzzy_content_limit(Some(2));
        assert_eq!(
            FuzzyMatcher::new(&capped).find("abc", "abd"),
            FuzzyOutcome::Skipped
        );
    }

    #[test]
    fn test_work_limit_skips_costly_scan() {
        let content = "let a = 1;\nlet b = 2;\nlet c = 3;\n";
        let needle = "let d = 4;";

        // Three ten-char lines scored against a ten-char needle cost 300 cells.
        let tight = options().fuzzy_work_limit(Some(50));
        assert_eq!(
            FuzzyMatcher::new(&tight).find(content, needle),
            FuzzyOutcome::Skipped
        );

        let roomy = options().fuzzy_work_limit(Some(400));
        let outcome = FuzzyMatcher::new(&roomy).find(content, needle);
        assert!(matches!(
            outcome,
            FuzzyOutcome::Rejected {
                closest: Some(_),
                ..
            }
        ));

        let unlimited = options().fuzzy_work_limit(None);
        assert_eq!(FuzzyMatcher::new(&unlimited).find(content, needle), outcome);
    }

    #[test]
    fn test_trailing_newline_needle_at_end_without_newline() {
        let matcher_options = options();
        match FuzzyMatcher::new(&matcher_options).find("a\n  b", "b\n") {
            FuzzyOutcome::Accepted(candidate) => {
                assert_eq!(candidate.actual_text, "  b");
                assert_eq!(candidate.line, 2);
            }
            other => panic!("expected Accepted, got {:?}", other),
        }
    }
}
