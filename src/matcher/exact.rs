/// Start offsets of every non-overlapping occurrence of `needle`, left to right.
///
/// Scanning resumes after the end of each hit, so `"aa"` occurs once in `"aaa"`.
pub fn find_exact(content: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    content.match_indices(needle).map(|(idx, _)| idx).collect()
}
