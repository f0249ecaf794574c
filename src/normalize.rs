use std::borrow::Cow;
use std::fmt;

const BOM: char = '\u{FEFF}';

/// The dominant line-ending convention of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    /// Both `\r\n` and bare `\n` appear. Restored as LF after an edit.
    Mixed,
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEnding::Lf => write!(f, "LF"),
            LineEnding::CrLf => write!(f, "CRLF"),
            LineEnding::Mixed => write!(f, "Mixed"),
        }
    }
}

/// File content in canonical form: no BOM, `\n` separators only.
///
/// Keeps what was stripped so the original rendering can be restored with
/// [`NormalizedText::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    pub bom: bool,
    pub original_ending: LineEnding,
}

impl NormalizedText {
    /// Strip the BOM, detect the line ending and collapse `\r\n` to `\n`.
    pub fn new(raw: &str) -> Self {
        let (bom, content) = strip_bom(raw);
        let original_ending = detect_line_ending(content);
        Self {
            text: normalize_to_lf(content).into_owned(),
            bom,
            original_ending,
        }
    }

    /// Render canonical `text` with this file's line ending and BOM.
    pub fn render(&self, text: &str) -> String {
        let restored = restore_line_endings(text, self.original_ending);
        let mut out = String::with_capacity(restored.len() + BOM.len_utf8());
        if self.bom {
            out.push(BOM);
        }
        out.push_str(&restored);
        out
    }
}

/// Remove a leading byte-order mark, reporting whether one was present.
pub fn strip_bom(raw: &str) -> (bool, &str) {
    match raw.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, raw),
    }
}

/// Classify the line endings used in `text`. Text without newlines is LF.
pub fn detect_line_ending(text: &str) -> LineEnding {
    let bytes = text.as_bytes();
    let mut crlf = false;
    let mut lf = false;

    for (i, &b) in bytes.iter().enumerate() {
        if b != b'\n' {
            continue;
        }
        if i > 0 && bytes[i - 1] == b'\r' {
            crlf = true;
        } else {
            lf = true;
        }
        if crlf && lf {
            return LineEnding::Mixed;
        }
    }

    if crlf {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    }
}

/// Replace every `\r\n` with `\n`. Borrows when there is nothing to replace.
///
/// A run of carriage returns directly before a newline collapses with it, so
/// `"\r\r\n"` becomes `"\n"` and the result never contains `\r\n`.
pub fn normalize_to_lf(text: &str) -> Cow<'_, str> {
    if !text.contains("\r\n") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut pending_cr = 0usize;
    for c in text.chars() {
        match c {
            '\r' => pending_cr += 1,
            '\n' => {
                pending_cr = 0;
                out.push('\n');
            }
            _ => {
                out.extend(std::iter::repeat('\r').take(pending_cr));
                pending_cr = 0;
                out.push(c);
            }
        }
    }
    out.extend(std::iter::repeat('\r').take(pending_cr));
    Cow::Owned(out)
}

/// Re-apply `ending` to LF-normalized text. LF and mixed text is returned as is.
pub fn restore_line_endings(text: &str, ending: LineEnding) -> Cow<'_, str> {
    match ending {
        LineEnding::CrLf if text.contains('\n') => Cow::Owned(text.replace('\n', "\r\n")),
        _ => Cow::Borrowed(text),
    }
}
