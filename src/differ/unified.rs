use crate::patch::{Chunk, Operation, Patch};
use similar::{Algorithm as SimilarAlgorithm, DiffTag, TextDiff};

/// Build a git-style unified diff of an edit to `path`.
///
/// Hunks carry `context_lines` unchanged lines on each side, and hunks whose
/// context overlaps are merged. Lines keep their newline, so a change to the
/// final newline alone still produces a hunk.
pub fn unified_diff(old: &str, new: &str, path: &str, context_lines: usize) -> Patch {
    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();

    let diff = TextDiff::configure()
        .algorithm(SimilarAlgorithm::Patience)
        .diff_slices(&old_lines, &new_lines);

    let mut chunks = Vec::new();
    for group in diff.grouped_ops(context_lines) {
        let (Some(first_op), Some(last_op)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first_op.old_range().start;
        let new_start = first_op.new_range().start;
        let old_len = last_op.old_range().end - old_start;
        let new_len = last_op.new_range().end - new_start;

        let mut operations = Vec::new();
        for op in &group {
            match op.tag() {
                DiffTag::Equal => {
                    for i in op.old_range() {
                        operations.push(Operation::Context(old_lines[i].to_string()));
                    }
                }
                DiffTag::Delete => {
                    for i in op.old_range() {
                        operations.push(Operation::Remove(old_lines[i].to_string()));
                    }
                }
                DiffTag::Insert => {
                    for j in op.new_range() {
                        operations.push(Operation::Add(new_lines[j].to_string()));
                    }
                }
                DiffTag::Replace => {
                    for i in op.old_range() {
                        operations.push(Operation::Remove(old_lines[i].to_string()));
                    }
                    for j in op.new_range() {
                        operations.push(Operation::Add(new_lines[j].to_string()));
                    }
                }
            }
        }

        if operations
            .iter()
            .any(|op| !matches!(op, Operation::Context(_)))
        {
            chunks.push(Chunk {
                old_start,
                old_lines: old_len,
                new_start,
                new_lines: new_len,
                operations,
            });
        }
    }

    Patch {
        old_file: path.to_string(),
        new_file: path.to_string(),
        chunks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::load_fixture;

    #[test]
    fn test_modify_line() {
        let patch = unified_diff("line1\nline2\nline3", "line1\nline2_modified\nline3", "f.txt", 3);
        assert_eq!(patch.chunks.len(), 1);
        let chunk = &patch.chunks[0];
        assert_eq!((chunk.old_start, chunk.old_lines), (0, 3));
        assert_eq!((chunk.new_start, chunk.new_lines), (0, 3));
        assert_eq!(
            chunk.operations,
            vec![
                Operation::Context("line1\n".to_string()),
                Operation::Remove("line2\n".to_string()),
                Operation::Add("line2_modified\n".to_string()),
                Operation::Context("line3".to_string()),
            ]
        );
    }

    #[test]
    fn test_added_final_newline() {
        let patch = unified_diff("a\nb", "a\nb\n", "f.txt", 3);
        assert_eq!(patch.stats(), (1, 1));
        let expected = "\
--- a/f.txt
+++ b/f.txt
@@ -1,2 +1,2 @@
 a
-b
\\ No newline at end of file
+b
";
        assert_eq!(patch.to_string(), expected);
    }

    #[test]
    fn test_identical_content_is_empty() {
        let patch = unified_diff("a\nb", "a\nb", "f.txt", 3);
        assert!(patch.is_empty());
        assert_eq!(patch.to_string(), "--- a/f.txt\n+++ b/f.txt\n");
    }

    #[test]
    fn test_distant_changes_split_into_hunks() {
        let old: Vec<String> = (1..=30).map(|i| format!("line{}", i)).collect();
        let mut new = old.clone();
        new[2] = "third".to_string();
        new[26] = "twenty-seventh".to_string();
        let patch = unified_diff(&old.join("\n"), &new.join("\n"), "f.txt", 2);
        assert_eq!(patch.chunks.len(), 2);
        assert_eq!(patch.chunks[1].old_start, 24);
        assert_eq!(patch.stats(), (2, 2));
    }

    #[test]
    fn test_fixture_edit() {
        let old = load_fixture("handler_before.rs");
        let new = load_fixture("handler_after.rs");
        let patch = unified_diff(&old, &new, "handler.rs", 3);
        assert!(!patch.is_empty());
        let rendered = patch.to_string();
        assert!(rendered.starts_with("--- a/handler.rs\n+++ b/handler.rs\n@@ -"));
        // Every removed line comes from the old file, every added line from the new one.
        for chunk in &patch.chunks {
            for op in &chunk.operations {
                match op {
                    Operation::Remove(line) => {
                        assert!(old.split_inclusive('\n').any(|l| l == line))
                    }
                    Operation::Add(line) => assert!(new.split_inclusive('\n').any(|l| l == line)),
                    Operation::Context(_) => {}
                }
            }
        }
    }
}
