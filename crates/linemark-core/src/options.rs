use serde::{Deserialize, Serialize};

/// Conversion switches. Missing fields deserialize to their defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Every newline inside a paragraph becomes a hard break.
    pub line_breaks_on_newline: bool,
    /// Raw HTML and comments are escaped instead of passed through.
    pub raw_html_escaped: bool,
    /// `http(s)://` URLs in running text become links.
    pub bare_url_autolinking: bool,
    /// Unsafe URL schemes and event handlers are neutralized and raw HTML is
    /// disabled.
    pub safe_mode: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            line_breaks_on_newline: false,
            raw_html_escaped: false,
            bare_url_autolinking: true,
            safe_mode: false,
        }
    }
}

impl Options {
    /// Whether raw HTML blocks, inline tags and comments are recognized.
    pub fn raw_html_disabled(&self) -> bool {
        self.raw_html_escaped || self.safe_mode
    }
}

#[cfg(test)]
mod tests {
    use super::Options;

    #[test]
    fn safe_mode_disables_raw_html() {
        let options = Options {
            safe_mode: true,
            ..Options::default()
        };
        assert!(options.raw_html_disabled());
        assert!(!Options::default().raw_html_disabled());
    }
}
