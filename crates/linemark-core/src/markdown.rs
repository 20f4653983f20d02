use crate::error::Error;
use crate::inline::InlineSet;
use crate::line::split_lines;
use crate::options::Options;
use crate::reference::ReferenceTable;

/// Deepest nesting of quotes, list items and inline spans that is still parsed.
pub(crate) const MAX_NESTING: usize = 32;

/// State of one conversion: the options in force, the reference definitions
/// seen so far, and the current nesting depth.
pub(crate) struct Session<'a> {
    pub(crate) options: &'a Options,
    pub(crate) references: ReferenceTable,
    pub(crate) depth: usize,
}

impl<'a> Session<'a> {
    pub(crate) fn new(options: &'a Options) -> Self {
        Self {
            options,
            references: ReferenceTable::default(),
            depth: 0,
        }
    }

    fn text(&mut self, text: &str) -> String {
        self.references.clear();
        let lines = split_lines(text);
        let markup = self.lines(&lines);
        tracing::debug!(
            lines = lines.len(),
            references = self.references.len(),
            "converted document"
        );
        markup.trim_matches('\n').to_string()
    }
}

/// A configured Markdown to HTML converter.
///
/// Conversions share nothing but the options, so one instance can serve any
/// number of threads.
///
/// ```
/// use linemark_core::Markdown;
///
/// let html = Markdown::new().with_safe_mode(true).convert("# Hello");
/// assert_eq!(html, "<h1>Hello</h1>");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Markdown {
    options: Options,
}

impl Markdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// Turns every newline inside a paragraph into `<br />`.
    pub fn with_line_breaks_on_newline(mut self, enabled: bool) -> Self {
        self.options.line_breaks_on_newline = enabled;
        self
    }

    /// Escapes raw HTML and comments instead of passing them through.
    pub fn with_raw_html_escaped(mut self, enabled: bool) -> Self {
        self.options.raw_html_escaped = enabled;
        self
    }

    pub fn with_bare_url_autolinking(mut self, enabled: bool) -> Self {
        self.options.bare_url_autolinking = enabled;
        self
    }

    /// Neutralizes unsafe URLs and event-handler attributes and disables raw
    /// HTML, whatever [`Markdown::with_raw_html_escaped`] says.
    pub fn with_safe_mode(mut self, enabled: bool) -> Self {
        self.options.safe_mode = enabled;
        self
    }

    /// Converts a whole document.
    pub fn convert(&self, text: &str) -> String {
        tracing::debug!(
            len = text.len(),
            options = ?self.options,
            "converting document"
        );
        Session::new(&self.options).text(text)
    }

    /// Validates UTF-8, then converts.
    pub fn convert_bytes(&self, bytes: &[u8]) -> Result<String, Error> {
        let text = std::str::from_utf8(bytes)?;
        Ok(self.convert(text))
    }

    /// Renders one logical line of inline markup without block structure.
    pub fn render_inline(&self, text: &str) -> String {
        Session::new(&self.options).line(text, InlineSet::EMPTY)
    }
}

/// Converts `text` with the default options.
pub fn convert(text: &str) -> String {
    Markdown::default().convert(text)
}
