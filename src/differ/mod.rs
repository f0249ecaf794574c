mod unified;

use similar::{ChangeTag, TextDiff};

pub use unified::unified_diff;

/// Default number of unchanged lines shown around each change.
pub const DEFAULT_CONTEXT_LINES: usize = 4;

/// A rendered line diff of an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    /// One line per entry: `" N text"` for context, `"-N text"` for removed
    /// lines (old numbering) and `"+N text"` for added lines (new numbering).
    pub diff: String,
    /// 1-based line in the new content where the first change lands.
    /// `None` only when both sides are identical.
    pub first_changed_line: Option<usize>,
}

/// A run of consecutive lines sharing one change tag. Lines keep their newline.
struct Run<'a> {
    tag: ChangeTag,
    lines: Vec<&'a str>,
}

impl Run<'_> {
    fn is_change(&self) -> bool {
        self.tag != ChangeTag::Equal
    }
}

/// Render a numbered line diff between two LF-normalized texts.
///
/// Unchanged stretches are trimmed to `context_lines` on each side of a change,
/// and whatever is cut is shown as a single `...` line. When only one side ends
/// in a newline, its changed last line is followed by a no-newline marker.
pub fn generate_diff_string(old: &str, new: &str, context_lines: usize) -> DiffResult {
    let runs = collect_runs(old, new);

    let max_line = old.split('\n').count().max(new.split('\n').count()).max(1);
    let mut out = DiffWriter {
        lines: Vec::new(),
        width: max_line.to_string().len(),
        old_line: 1,
        new_line: 1,
        mark_missing_newline: old.ends_with('\n') != new.ends_with('\n'),
    };
    let mut first_changed_line = None;

    for (idx, run) in runs.iter().enumerate() {
        match run.tag {
            ChangeTag::Delete => {
                first_changed_line.get_or_insert(out.new_line);
                for line in &run.lines {
                    out.removed(line);
                }
            }
            ChangeTag::Insert => {
                first_changed_line.get_or_insert(out.new_line);
                for line in &run.lines {
                    out.added(line);
                }
            }
            ChangeTag::Equal => {
                let after_change = idx > 0 && runs[idx - 1].is_change();
                let before_change = runs.get(idx + 1).is_some_and(Run::is_change);
                out.context(&run.lines, after_change, before_change, context_lines);
            }
        }
    }

    DiffResult {
        diff: out.lines.join("\n"),
        first_changed_line,
    }
}

fn collect_runs<'a>(old: &'a str, new: &'a str) -> Vec<Run<'a>> {
    let diff = TextDiff::from_lines(old, new);
    let mut runs: Vec<Run<'a>> = Vec::new();
    for change in diff.iter_all_changes() {
        let line = change.value();
        match runs.last_mut() {
            Some(run) if run.tag == change.tag() => run.lines.push(line),
            _ => runs.push(Run {
                tag: change.tag(),
                lines: vec![line],
            }),
        }
    }
    runs
}

struct DiffWriter {
    lines: Vec<String>,
    width: usize,
    old_line: usize,
    new_line: usize,
    mark_missing_newline: bool,
}

impl DiffWriter {
    fn removed(&mut self, line: &str) {
        self.lines.push(format!(
            "-{:>w$} {}",
            self.old_line,
            strip_newline(line),
            w = self.width
        ));
        self.old_line += 1;
        self.missing_newline(line);
    }

    fn added(&mut self, line: &str) {
        self.lines.push(format!(
            "+{:>w$} {}",
            self.new_line,
            strip_newline(line),
            w = self.width
        ));
        self.new_line += 1;
        self.missing_newline(line);
    }

    fn missing_newline(&mut self, line: &str) {
        if self.mark_missing_newline && !line.ends_with('\n') {
            self.lines.push("\\ No newline at end of file".to_string());
        }
    }

    fn unchanged(&mut self, line: &str) {
        self.lines.push(format!(
            " {:>w$} {}",
            self.old_line,
            strip_newline(line),
            w = self.width
        ));
        self.old_line += 1;
        self.new_line += 1;
    }

    fn skip(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.lines.push(format!(" {} ...", " ".repeat(self.width)));
        self.old_line += count;
        self.new_line += count;
    }

    /// Emit an unchanged run, keeping only the lines that border a change.
    fn context(&mut self, lines: &[&str], after_change: bool, before_change: bool, ctx: usize) {
        let len = lines.len();
        let head = if after_change { ctx.min(len) } else { 0 };
        let tail = if before_change {
            ctx.min(len - head)
        } else {
            0
        };

        for line in &lines[..head] {
            self.unchanged(line);
        }
        if head == 0 && tail == 0 {
            // Nothing to show, only advance the counters.
            self.old_line += len;
            self.new_line += len;
            return;
        }
        self.skip(len - head - tail);
        for line in &lines[len - tail..] {
            self.unchanged(line);
        }
    }
}

fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}
