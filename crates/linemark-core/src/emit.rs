use std::borrow::Cow;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::block::Body;
use crate::element::{Attributes, Content, Element};
use crate::markdown::{MAX_NESTING, Session};

/// URL prefixes kept verbatim in `href`/`src` under safe mode.
const SAFE_LINK_SCHEMES: &[&str] = &[
    "http://",
    "https://",
    "ftp://",
    "ftps://",
    "mailto:",
    "data:image/png;base64,",
    "data:image/gif;base64,",
    "data:image/jpeg;base64,",
    "irc:",
    "ircs:",
    "git:",
    "ssh:",
    "news:",
    "steam:",
];

impl Session<'_> {
    /// Block-parses `lines` and renders every visible block, each preceded by
    /// a newline.
    pub(crate) fn lines(&mut self, lines: &[String]) -> String {
        let mut markup = String::new();
        for block in self.parse_blocks(lines) {
            let rendered = match block.body {
                Body::Hidden => continue,
                Body::Markup(raw) => raw,
                Body::Element(element) => self.element(&element),
            };
            markup.push('\n');
            markup.push_str(&rendered);
        }
        markup.push('\n');
        markup
    }

    pub(crate) fn element(&mut self, element: &Element) -> String {
        let attributes = if self.options.safe_mode {
            Cow::Owned(sanitize(&element.name, &element.attributes))
        } else {
            Cow::Borrowed(&element.attributes)
        };
        let mut markup = open_tag(&element.name, &attributes);
        let inner = match &element.content {
            Content::Void => {
                markup.push_str(" />");
                return markup;
            }
            Content::Text(text) => encode_text(text).into_owned(),
            Content::Inline(text) => {
                self.nested(text, |session| session.line(text, element.non_nestable))
            }
            Content::Blocks(lines) => {
                self.nested(&lines.join("\n"), |session| session.lines(lines))
            }
            Content::ListItem(lines) => self.nested(&lines.join("\n"), |session| session.li(lines)),
            Content::Elements(children) => self.elements(children),
            Content::Element(child) => self.element(child),
        };
        markup.push('>');
        markup.push_str(&inner);
        markup.push_str("</");
        markup.push_str(&element.name);
        markup.push('>');
        markup
    }

    fn elements(&mut self, elements: &[Element]) -> String {
        let mut markup = String::new();
        for element in elements {
            markup.push('\n');
            markup.push_str(&self.element(element));
        }
        markup.push('\n');
        markup
    }

    /// A tight item (no blank line among its lines) loses the paragraph that
    /// would otherwise wrap its first block.
    fn li(&mut self, lines: &[String]) -> String {
        let markup = self.lines(lines);
        if !lines.iter().any(String::is_empty)
            && let Some(rest) = markup.trim().strip_prefix("<p>")
        {
            return rest.replacen("</p>", "", 1);
        }
        markup
    }

    /// Re-emits a bare inline tag with its attributes sanitized.
    pub(crate) fn tag(&self, element: &Element, self_closing: bool) -> String {
        let mut markup = open_tag(&element.name, &sanitize(&element.name, &element.attributes));
        markup.push_str(if self_closing { " />" } else { ">" });
        markup
    }

    /// Runs a nested parse one level deeper. Past [`MAX_NESTING`] the source
    /// text is emitted escaped instead.
    fn nested(&mut self, source: &str, render: impl FnOnce(&mut Self) -> String) -> String {
        if self.depth >= MAX_NESTING {
            tracing::debug!(depth = self.depth, "nesting limit reached; emitting literal text");
            return encode_text(source).into_owned();
        }
        self.depth += 1;
        let markup = render(self);
        self.depth -= 1;
        markup
    }
}

fn open_tag(name: &str, attributes: &Attributes) -> String {
    let mut markup = format!("<{name}");
    for (key, value) in attributes.present() {
        markup.push(' ');
        markup.push_str(key);
        markup.push_str("=\"");
        markup.push_str(&encode_double_quoted_attribute(value));
        markup.push('"');
    }
    markup
}

/// Neutralizes unknown URL schemes on links and images, then drops attributes
/// with odd names or event handlers.
fn sanitize(name: &str, attributes: &Attributes) -> Attributes {
    let mut attributes = attributes.clone();
    let url_attribute = match name {
        "a" => Some("href"),
        "img" => Some("src"),
        _ => None,
    };
    if let Some(url) = url_attribute.and_then(|key| attributes.get_mut(key))
        && !SAFE_LINK_SCHEMES
            .iter()
            .any(|scheme| starts_with_ignore_case(url, scheme))
    {
        *url = url.replace(':', "%3A");
    }
    attributes.retain(|key| is_good_attribute(key) && !starts_with_ignore_case(key, "on"));
    attributes
}

fn is_good_attribute(name: &str) -> bool {
    let mut bytes = name.bytes();
    bytes.next().is_some_and(|first| first.is_ascii_alphanumeric())
        && bytes.all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
