use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::differ::{generate_diff_string, unified_diff, DEFAULT_CONTEXT_LINES};
use crate::matcher::{find_edit_match, MatchCandidate, MatchOptions, MatchOutcome};
use crate::normalize::{normalize_to_lf, NormalizedText};
use crate::{Error, NoMatchError, Patch};

/// Settings for a single edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOptions {
    pub match_options: MatchOptions,
    /// Unchanged lines shown around each change in the rendered diff.
    pub context_lines: usize,
    /// Compute the edit without writing the file.
    pub dry_run: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            match_options: MatchOptions::default(),
            context_lines: DEFAULT_CONTEXT_LINES,
            dry_run: false,
        }
    }
}

impl EditOptions {
    pub fn match_options(mut self, options: MatchOptions) -> Self {
        self.match_options = options;
        self
    }

    pub fn allow_fuzzy(mut self, allow: bool) -> Self {
        self.match_options = self.match_options.allow_fuzzy(allow);
        self
    }

    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.match_options = self.match_options.similarity_threshold(threshold);
        self
    }

    pub fn context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A successful edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditResult {
    /// Final file content with the original line endings and BOM restored.
    pub content: String,
    /// Numbered line diff for display.
    pub diff: String,
    /// 1-based line of the first change, for editor navigation.
    pub first_changed_line: Option<usize>,
    /// Where the old text was found.
    pub matched: MatchCandidate,
    before: String,
    after: String,
}

impl EditResult {
    pub fn summary(&self, path: &str) -> String {
        format!("Successfully replaced text in {}.", path)
    }

    /// The edit as a unified diff over the normalized content.
    pub fn unified(&self, path: &str, context_lines: usize) -> Patch {
        unified_diff(&self.before, &self.after, path, context_lines)
    }
}

/// Replace the unique occurrence of `old_text` in `raw` with `new_text`.
///
/// `path` is only used in error messages. Matching happens on BOM-less,
/// LF-normalized text, and the file's own conventions are restored afterwards.
pub fn apply_edit(
    path: &str,
    raw: &str,
    old_text: &str,
    new_text: &str,
    options: &EditOptions,
) -> Result<EditResult, Error> {
    if old_text.is_empty() {
        return Err(Error::EmptyOldText);
    }

    let source = NormalizedText::new(raw);
    let old_text = normalize_to_lf(old_text);
    let new_text = normalize_to_lf(new_text);

    let matched = match find_edit_match(&source.text, &old_text, &options.match_options) {
        MatchOutcome::Unique(candidate) => candidate,
        MatchOutcome::Ambiguous { occurrences, fuzzy } => {
            return Err(Error::AmbiguousMatch {
                path: path.to_string(),
                occurrences,
                fuzzy,
            });
        }
        MatchOutcome::NotFound {
            closest,
            fuzzy_matches,
            fuzzy_skipped,
        } => {
            return Err(Error::NoMatch(Box::new(NoMatchError {
                path: path.to_string(),
                old_text: old_text.into_owned(),
                closest,
                fuzzy_matches,
                allow_fuzzy: options.match_options.allow_fuzzy,
                similarity_threshold: options.match_options.similarity_threshold,
                fuzzy_skipped,
            })));
        }
    };

    // A needle ending in a newline can match a last line that has none.
    let replacement = match new_text.strip_suffix('\n') {
        Some(trimmed) if old_text.ends_with('\n') && !matched.actual_text.ends_with('\n') => {
            trimmed
        }
        _ => &*new_text,
    };

    let mut after =
        String::with_capacity(source.text.len() - matched.actual_text.len() + replacement.len());
    after.push_str(&source.text[..matched.start_index]);
    after.push_str(replacement);
    after.push_str(&source.text[matched.end_index()..]);

    if after == source.text {
        return Err(Error::NoOpEdit {
            path: path.to_string(),
        });
    }

    let diff = generate_diff_string(&source.text, &after, options.context_lines);
    debug!(
        path,
        line = matched.line,
        similarity = matched.similarity,
        ending = %source.original_ending,
        bom = source.bom,
        "replaced text"
    );

    Ok(EditResult {
        content: source.render(&after),
        diff: diff.diff,
        first_changed_line: diff.first_changed_line,
        matched,
        before: source.text,
        after,
    })
}

/// Apply an edit to the file at `path`, writing it back unless `dry_run` is set.
///
/// The file is left untouched on any error.
pub fn edit_file<P: AsRef<Path>>(
    path: P,
    old_text: &str,
    new_text: &str,
    options: &EditOptions,
) -> Result<EditResult, Error> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    if path.extension().is_some_and(|ext| ext == "ipynb") {
        return Err(Error::UnsupportedFile {
            path: shown,
            reason: "Jupyter notebooks must be edited with a notebook-aware tool".to_string(),
        });
    }
    if !path.is_file() {
        return Err(Error::FileNotFound { path: shown });
    }

    let raw = fs::read_to_string(path)?;
    let result = apply_edit(&shown, &raw, old_text, new_text, options)?;

    if options.dry_run {
        debug!(path = %shown, "dry run, not writing");
    } else {
        fs::write(path, &result.content)?;
        info!(path = %shown, line = ?result.first_changed_line, "edited file");
    }

    Ok(result)
}
