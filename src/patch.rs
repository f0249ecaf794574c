use std::fmt;

/// One line of a hunk, with its newline unless it is the last line of a file
/// that has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Context(String),
    Add(String),
    Remove(String),
}

/// A contiguous group of operations with its `@@` header ranges.
///
/// Starts are 0-based here and printed 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub operations: Vec<Operation>,
}

/// A single-file unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub old_file: String,
    pub new_file: String,
    pub chunks: Vec<Chunk>,
}

impl Operation {
    pub(crate) fn to_char(&self) -> char {
        match self {
            Operation::Add(_) => '+',
            Operation::Remove(_) => '-',
            Operation::Context(_) => ' ',
        }
    }

    pub(crate) fn line(&self) -> &str {
        match self {
            Operation::Add(line) => line,
            Operation::Remove(line) => line,
            Operation::Context(line) => line,
        }
    }
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of added and removed lines across all chunks.
    pub fn stats(&self) -> (usize, usize) {
        self.chunks
            .iter()
            .flat_map(|chunk| &chunk.operations)
            .fold((0, 0), |(added, removed), op| match op {
                Operation::Add(_) => (added + 1, removed),
                Operation::Remove(_) => (added, removed + 1),
                Operation::Context(_) => (added, removed),
            })
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{},{} +{},{} @@",
            header_start(self.old_start, self.old_lines),
            self.old_lines,
            header_start(self.new_start, self.new_lines),
            self.new_lines
        )?;

        for op in &self.operations {
            let line = op.line();
            write!(f, "{}{}", op.to_char(), line)?;
            if !line.ends_with('\n') {
                writeln!(f)?;
                writeln!(f, "\\ No newline at end of file")?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- a/{}", self.old_file.trim_start_matches('/'))?;
        writeln!(f, "+++ b/{}", self.new_file.trim_start_matches('/'))?;

        for chunk in &self.chunks {
            write!(f, "{}", chunk)?;
        }

        Ok(())
    }
}

// An empty range is printed at the line before it, as git does.
fn header_start(start: usize, lines: usize) -> usize {
    if lines == 0 {
        start
    } else {
        start + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_patch() {
        let patch = Patch {
            old_file: "src/lib.rs".to_string(),
            new_file: "src/lib.rs".to_string(),
            chunks: vec![Chunk {
                old_start: 0,
                old_lines: 3,
                new_start: 0,
                new_lines: 3,
                operations: vec![
                    Operation::Context("line1\n".to_string()),
                    Operation::Remove("line2\n".to_string()),
                    Operation::Add("line2 modified\n".to_string()),
                    Operation::Context("line3\n".to_string()),
                ],
            }],
        };

        let expected = "\
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@
 line1
-line2
+line2 modified
 line3
";
        assert_eq!(patch.to_string(), expected);
        assert_eq!(patch.stats(), (1, 1));
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_empty_range_header() {
        let chunk = Chunk {
            old_start: 0,
            old_lines: 0,
            new_start: 0,
            new_lines: 1,
            operations: vec![Operation::Add("first\n".to_string())],
        };
        assert_eq!(chunk.to_string(), "@@ -0,0 +1,1 @@\n+first\n");
    }

    #[test]
    fn test_missing_newline_marker() {
        let chunk = Chunk {
            old_start: 0,
            old_lines: 1,
            new_start: 0,
            new_lines: 1,
            operations: vec![
                Operation::Remove("last".to_string()),
                Operation::Add("last\n".to_string()),
            ],
        };
        assert_eq!(
            chunk.to_string(),
            "@@ -1,1 +1,1 @@\n-last\n\\ No newline at end of file\n+last\n"
        );
    }

    #[test]
    fn test_absolute_paths_are_not_doubled() {
        let patch = Patch {
            old_file: "/tmp/notes.txt".to_string(),
            new_file: "/tmp/notes.txt".to_string(),
            chunks: Vec::new(),
        };
        assert_eq!(patch.to_string(), "--- a/tmp/notes.txt
+++ b/tmp/notes.txt
");
    }
}
