const TAB_STOP: usize = 4;

/// One input line after tab expansion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Line {
    /// The whole line, tabs expanded.
    pub(crate) body: String,
    /// Number of leading spaces in `body`.
    pub(crate) indent: usize,
    /// `body` without its leading spaces.
    pub(crate) text: String,
}

impl Line {
    pub(crate) fn new(raw: &str) -> Self {
        let body = expand_tabs(raw);
        let indent = body.bytes().take_while(|byte| *byte == b' ').count();
        let text = body[indent..].to_string();
        Self { body, indent, text }
    }

    /// First byte of the unindented text; blank lines never reach the block
    /// handlers, so this is only a fallback for direct callers.
    pub(crate) fn marker(&self) -> u8 {
        self.text.as_bytes().first().copied().unwrap_or(b' ')
    }
}

/// Unifies line endings, drops surrounding newlines and splits into raw lines.
pub(crate) fn split_lines(source: &str) -> Vec<String> {
    let unified = source.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = unified.trim_matches('\n');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('\n').map(str::to_string).collect()
}

pub(crate) fn is_blank(raw: &str) -> bool {
    raw.trim_end_matches([' ', '\t', '\n', '\r', '\0', '\x0B'])
        .is_empty()
}

/// Pads every tab to the next multiple of four columns, counted in chars.
fn expand_tabs(raw: &str) -> String {
    if !raw.contains('\t') {
        return raw.to_string();
    }
    let mut parts = raw.split('\t');
    let mut line = parts.next().unwrap_or_default().to_string();
    let mut width = line.chars().count();
    for part in parts {
        let shortage = TAB_STOP - width % TAB_STOP;
        line.extend(std::iter::repeat_n(' ', shortage));
        line.push_str(part);
        width += shortage + part.chars().count();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{Line, is_blank, split_lines};

    #[test]
    fn line_endings_are_unified_and_outer_newlines_trimmed() {
        let lines = split_lines("\n\r\na\r\nb\rc\n\n");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(split_lines("").is_empty());
        assert!(split_lines("\n\n\r\n").is_empty());
    }

    #[test]
    fn tabs_expand_to_next_stop() {
        let line = Line::new("\tcode");
        assert_eq!(line.body, "    code");
        assert_eq!(line.indent, 4);
        assert_eq!(line.text, "code");

        let line = Line::new("ab\tc");
        assert_eq!(line.body, "ab  c");
    }

    #[test]
    fn tab_stops_count_chars_not_bytes() {
        let line = Line::new("é\tx");
        assert_eq!(line.body, "é   x");
    }

    #[test]
    fn whitespace_only_lines_are_blank() {
        assert!(is_blank("   \t "));
        assert!(is_blank(""));
        assert!(!is_blank("  x"));
    }
}
