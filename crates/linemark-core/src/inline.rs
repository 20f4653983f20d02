use once_cell::sync::Lazy;
use regex::Regex;

use crate::element::{Attributes, Content, Element};
use crate::markdown::Session;

/// Bytes that can start an inline span.
const MARKERS: &[u8] = b"!\"*_&[:<>`~\\";

/// Characters a backslash makes literal.
const ESCAPABLE: &[u8] = b"\\`*_{}[]()>#+-.!|";

/// Elements whose tags may appear inside a paragraph.
pub(crate) const TEXT_LEVEL_ELEMENTS: &[&str] = &[
    "a", "br", "bdo", "abbr", "blink", "nextid", "acronym", "basefont", "b", "em", "big", "cite",
    "small", "spacer", "listing", "i", "rp", "del", "code", "strike", "marquee", "q", "rt", "ins",
    "font", "strong", "s", "tt", "kbd", "mark", "u", "xm", "sub", "nobr", "sup", "ruby", "var",
    "span", "wbr", "time",
];

pub(crate) const ATTRIBUTE: &str = r#"[a-zA-Z_:][\w:.-]*(?:\s*=\s*(?:[^"'=<>`\s]+|"[^"]*"|'[^']*'))?"#;

pub(crate) static OPENING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^<(\w[\w-]*)((?:[ ]*{ATTRIBUTE})*)[ ]*(/)?>"))
        .expect("opening tag pattern is valid")
});
static TAG_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z_:][\w:.-]*)(?:\s*=\s*([^"'=<>`\s]+|"[^"]*"|'[^']*'))?"#)
        .expect("attribute pattern is valid")
});
static CLOSING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</(\w[\w-]*)[ ]*>").expect("closing tag pattern is valid"));
static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!---?[^>-](?:-?[^-])*-->").expect("comment pattern is valid"));
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^&#?\w+;").expect("entity pattern is valid"));
static URL_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^<(\w+://[^ >]+)>").expect("url tag pattern is valid"));
static EMAIL_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^<((mailto:)?\S+?@\S+?)>").expect("email tag pattern is valid")
});
static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bhttps?://[^\s<]+\b/*").expect("url pattern is valid"));
static CODE_NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ ]*\n").expect("code newline pattern is valid"));
static HARD_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ ][ ]+\n").expect("hard break pattern is valid"));

// Content of a delimited run: the closing delimiter may only appear escaped or
// as a balanced inner run.
static STRONG_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\\\*|[^*]|\*[^*]*\*)+$").expect("strong pattern is valid"));
static STRONG_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\\_|[^_]|_[^_]*_)+$").expect("strong pattern is valid"));
static EM_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\\\*|[^*]|\*\*[^*]+\*\*)+$").expect("em pattern is valid"));
static EM_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\\_|[^_]|__[^_]*__)+$").expect("em pattern is valid"));

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum InlineKind {
    Code,
    EmailTag,
    Emphasis,
    EscapeSequence,
    Image,
    Link,
    Markup,
    SpecialCharacter,
    Strikethrough,
    Url,
    UrlTag,
}

type Matcher = fn(&Session<'_>, &Excerpt<'_>) -> Option<Span>;

impl InlineKind {
    /// Kinds registered for a marker byte, in priority order.
    fn for_marker(marker: u8) -> &'static [InlineKind] {
        use InlineKind::*;
        match marker {
            b'"' | b'&' | b'>' => &[SpecialCharacter],
            b'!' => &[Image],
            b'*' | b'_' => &[Emphasis],
            b':' => &[Url],
            b'<' => &[UrlTag, EmailTag, Markup, SpecialCharacter],
            b'[' => &[Link],
            b'`' => &[Code],
            b'~' => &[Strikethrough],
            b'\\' => &[EscapeSequence],
            _ => &[],
        }
    }

    fn matcher(self) -> Matcher {
        match self {
            InlineKind::Code => code,
            InlineKind::EmailTag => email_tag,
            InlineKind::Emphasis => emphasis,
            InlineKind::EscapeSequence => escape_sequence,
            InlineKind::Image => image,
            InlineKind::Link => link,
            InlineKind::Markup => markup,
            InlineKind::SpecialCharacter => special_character,
            InlineKind::Strikethrough => strikethrough,
            InlineKind::Url => url,
            InlineKind::UrlTag => url_tag,
        }
    }

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// A small set of inline kinds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct InlineSet(u16);

impl InlineSet {
    pub(crate) const EMPTY: InlineSet = InlineSet(0);

    pub(crate) const fn of(kinds: &[InlineKind]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < kinds.len() {
            bits |= kinds[i].bit();
            i += 1;
        }
        InlineSet(bits)
    }

    pub(crate) fn contains(self, kind: InlineKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub(crate) fn union(self, other: InlineSet) -> Self {
        InlineSet(self.0 | other.0)
    }
}

/// Text handed to a matcher: `text` starts at the marker, `context` is the
/// whole unscanned remainder of the line.
pub(crate) struct Excerpt<'a> {
    pub(crate) text: &'a str,
    pub(crate) context: &'a str,
}

pub(crate) enum Payload {
    Element(Element),
    /// A bare opening tag, re-emitted after sanitizing its attributes. The
    /// flag records a self-closing `/>`.
    Tag(Element, bool),
    Markup(String),
}

pub(crate) struct Span {
    pub(crate) extent: usize,
    /// Offset into the context where the span begins; `None` means the marker.
    pub(crate) position: Option<usize>,
    pub(crate) payload: Payload,
}

impl Span {
    fn element(extent: usize, element: Element) -> Self {
        Self {
            extent,
            position: None,
            payload: Payload::Element(element),
        }
    }

    fn markup(extent: usize, markup: impl Into<String>) -> Self {
        Self {
            extent,
            position: None,
            payload: Payload::Markup(markup.into()),
        }
    }
}

impl Session<'_> {
    /// Scans one line of text into HTML.
    pub(crate) fn line(&mut self, text: &str, non_nestable: InlineSet) -> String {
        let mut html = String::new();
        let mut text = text;
        while let Some(marker_position) = text.bytes().position(|byte| MARKERS.contains(&byte)) {
            let marker = text.as_bytes()[marker_position];
            let excerpt = Excerpt {
                text: &text[marker_position..],
                context: text,
            };
            match self.best_span(marker, marker_position, &excerpt, non_nestable) {
                Some((position, span)) => {
                    html.push_str(&self.unmarked_text(&text[..position]));
                    let rendered = match span.payload {
                        Payload::Element(mut element) => {
                            element.non_nestable = element.non_nestable.union(non_nestable);
                            self.element(&element)
                        }
                        Payload::Tag(element, self_closing) => self.tag(&element, self_closing),
                        Payload::Markup(raw) => raw,
                    };
                    html.push_str(&rendered);
                    text = &text[position + span.extent..];
                }
                None => {
                    html.push_str(&self.unmarked_text(&text[..=marker_position]));
                    text = &text[marker_position + 1..];
                }
            }
        }
        html.push_str(&self.unmarked_text(text));
        html
    }

    /// Runs every kind registered for `marker` and keeps the earliest match;
    /// ties go to the kind registered first. Matches past the marker belong to
    /// a later marker and are ignored.
    fn best_span(
        &self,
        marker: u8,
        marker_position: usize,
        excerpt: &Excerpt<'_>,
        non_nestable: InlineSet,
    ) -> Option<(usize, Span)> {
        let mut best: Option<(usize, Span)> = None;
        for &kind in InlineKind::for_marker(marker) {
            if non_nestable.contains(kind) {
                continue;
            }
            let Some(span) = (kind.matcher())(self, excerpt) else {
                continue;
            };
            let position = span.position.unwrap_or(marker_position);
            if position > marker_position {
                continue;
            }
            if best.as_ref().is_none_or(|(best_position, _)| position < *best_position) {
                best = Some((position, span));
            }
        }
        best
    }

    fn unmarked_text(&self, text: &str) -> String {
        if self.options.line_breaks_on_newline {
            CODE_NEWLINE.replace_all(text, "<br />\n").into_owned()
        } else {
            HARD_BREAK
                .replace_all(text, "<br />\n")
                .replace(" \n", "\n")
        }
    }
}

fn code(_: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    let bytes = excerpt.text.as_bytes();
    let run = count_run(bytes, 0, b'`');
    let mut i = run;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let close = count_run(bytes, i, b'`');
        if close == run {
            let raw = &excerpt.text[run..i];
            let trimmed = raw.trim_matches(' ');
            let content = if trimmed.is_empty() { " " } else { trimmed };
            let content = CODE_NEWLINE.replace_all(content, " ").into_owned();
            return Some(Span::element(
                i + close,
                Element::new("code", Content::Text(content)),
            ));
        }
        i += close;
    }
    None
}

fn emphasis(_: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    let bytes = excerpt.text.as_bytes();
    let marker = bytes[0];
    if bytes.len() < 2 {
        return None;
    }
    let (strong, em) = if marker == b'*' {
        (&*STRONG_STAR, &*EM_STAR)
    } else {
        (&*STRONG_UNDERSCORE, &*EM_UNDERSCORE)
    };
    let strong_match = if bytes[1] == marker {
        delimited(excerpt.text, 2, strong, false)
    } else {
        None
    };
    let (name, (extent, content)) = match strong_match {
        Some(found) => ("strong", found),
        None => ("em", delimited(excerpt.text, 1, em, marker == b'_')?),
    };
    Some(Span::element(
        extent,
        Element::new(name, Content::Inline(content.to_string())),
    ))
}

/// Finds the nearest closing run of `width` markers whose enclosed content is
/// accepted by `content`. An escaped marker never closes. The closing run may
/// not be followed by another marker, nor by a word character when
/// `word_boundary` is set.
fn delimited<'a>(
    text: &'a str,
    width: usize,
    content: &Regex,
    word_boundary: bool,
) -> Option<(usize, &'a str)> {
    let bytes = text.as_bytes();
    let marker = bytes[0];
    if bytes.len() < width || !bytes[..width].iter().all(|byte| *byte == marker) {
        return None;
    }
    let mut close = width;
    while close + width <= bytes.len() {
        if bytes[close] == b'\\' && bytes.get(close + 1) == Some(&marker) {
            close += 2;
            continue;
        }
        let end = close + width;
        if close > width
            && bytes[close..end].iter().all(|byte| *byte == marker)
            && bytes.get(end) != Some(&marker)
            && !(word_boundary && starts_with_word_char(&text[end..]))
            && content.is_match(&text[width..close])
        {
            return Some((end, &text[width..close]));
        }
        close += 1;
    }
    None
}

fn starts_with_word_char(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
}

fn escape_sequence(_: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    match excerpt.text.as_bytes().get(1) {
        Some(b'\n') => {
            // The break swallows the spaces in front of the backslash.
            let marker_position = excerpt.context.len() - excerpt.text.len();
            let before = &excerpt.context[..marker_position];
            let spaces = before.len() - before.trim_end_matches(' ').len();
            Some(Span {
                extent: spaces + 2,
                position: Some(marker_position - spaces),
                payload: Payload::Markup("<br />\n".to_string()),
            })
        }
        Some(&byte) if ESCAPABLE.contains(&byte) => Some(Span::markup(2, char::from(byte))),
        _ => None,
    }
}

struct LinkMatch<'a> {
    extent: usize,
    label: &'a str,
    href: String,
    title: Option<String>,
}

fn link(session: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    let found = match_link(session, excerpt.text)?;
    let element = Element {
        name: "a".to_string(),
        attributes: Attributes::new()
            .with("href", Some(found.href))
            .with("title", found.title),
        content: Content::Inline(found.label.to_string()),
        non_nestable: InlineSet::of(&[InlineKind::Url, InlineKind::Link]),
    };
    Some(Span::element(found.extent, element))
}

fn image(session: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    if excerpt.text.as_bytes().get(1) != Some(&b'[') {
        return None;
    }
    let found = match_link(session, &excerpt.text[1..])?;
    let element = Element::void("img")
        .with_attribute("src", Some(found.href))
        .with_attribute("alt", Some(found.label.to_string()))
        .with_attribute("title", found.title);
    Some(Span::element(found.extent + 1, element))
}

/// `[label](href "title")`, `[label][id]`, `[label][]` or `[label]`.
/// Reference forms fail unless the id resolves.
fn match_link<'a>(session: &Session<'_>, text: &'a str) -> Option<LinkMatch<'a>> {
    let (label, mut extent) = bracketed(text)?;
    let remainder = &text[extent..];
    if let Some((href, title, consumed)) = inline_target(remainder) {
        return Some(LinkMatch {
            extent: extent + consumed,
            label,
            href: href.to_string(),
            title: title.map(str::to_string),
        });
    }
    let id = match reference_id(remainder) {
        Some((id, consumed)) => {
            extent += consumed;
            if id.is_empty() { label } else { id }
        }
        None => label,
    };
    let definition = session.references.get(id)?;
    Some(LinkMatch {
        extent,
        label,
        href: definition.url.clone(),
        title: definition.title.clone(),
    })
}

/// Balanced `[...]` at the start of `text`: returns the inner text and the
/// length consumed.
fn bracketed(text: &str) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut depth = 0usize;
    for (idx, byte) in bytes.iter().enumerate() {
        match byte {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[1..idx], idx + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// `(href "title")` directly after the label.
fn inline_target(text: &str) -> Option<(&str, Option<&str>, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'(') {
        return None;
    }
    let mut pos = skip_whitespace(bytes, 1);
    let href_start = pos;
    loop {
        match bytes.get(pos) {
            Some(b' ' | b')') | None => break,
            Some(b'(') => {
                let mut end = pos + 1;
                while end < bytes.len() && bytes[end] != b' ' && bytes[end] != b')' {
                    end += 1;
                }
                if end == pos + 1 || bytes.get(end) != Some(&b')') {
                    break;
                }
                pos = end + 1;
            }
            Some(_) => pos += 1,
        }
    }
    if pos == href_start {
        return None;
    }
    let href = &text[href_start..pos];

    let mut title = None;
    let spaces = bytes[pos..].iter().take_while(|byte| **byte == b' ').count();
    if spaces > 0
        && let Some(&quote) = bytes.get(pos + spaces)
        && (quote == b'"' || quote == b'\'')
    {
        let open = pos + spaces + 1;
        if let Some(len) = bytes[open..].iter().position(|byte| *byte == quote) {
            title = Some(&text[open..open + len]);
            pos = open + len + 1;
        }
    }

    pos = skip_whitespace(bytes, pos);
    if bytes.get(pos) != Some(&b')') {
        return None;
    }
    Some((href, title, pos + 1))
}

/// `[id]` after optional whitespace, on one line.
fn reference_id(text: &str) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let open = skip_whitespace(bytes, 0);
    if bytes.get(open) != Some(&b'[') {
        return None;
    }
    let len = bytes[open + 1..]
        .iter()
        .position(|byte| *byte == b']' || *byte == b'\n')?;
    let close = open + 1 + len;
    if bytes[close] != b']' {
        return None;
    }
    Some((&text[open + 1..close], close + 1))
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\n' | b'\r' | b'\x0B' | b'\x0C')
    {
        pos += 1;
    }
    pos
}

fn markup(session: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    if !excerpt.text.contains('>') {
        return None;
    }
    if session.options.safe_mode {
        return text_level_tag(excerpt.text);
    }
    if session.options.raw_html_disabled() {
        return None;
    }
    let found = match excerpt.text.as_bytes().get(1) {
        Some(b'/') => CLOSING_TAG.find(excerpt.text),
        Some(b'!') => COMMENT.find(excerpt.text),
        Some(b' ') | None => None,
        Some(_) => OPENING_TAG.find(excerpt.text),
    }?;
    Some(Span::markup(found.end(), found.as_str()))
}

/// In safe mode only tags of text-level elements survive, rebuilt from their
/// parsed name and attributes so the renderer can sanitize them.
fn text_level_tag(text: &str) -> Option<Span> {
    if text.as_bytes().get(1) == Some(&b'/') {
        let captures = CLOSING_TAG.captures(text)?;
        let name = captures.get(1)?.as_str().to_ascii_lowercase();
        if !TEXT_LEVEL_ELEMENTS.contains(&name.as_str()) {
            return None;
        }
        return Some(Span::markup(captures.get(0)?.end(), format!("</{name}>")));
    }
    let captures = OPENING_TAG.captures(text)?;
    let name = captures.get(1)?.as_str().to_ascii_lowercase();
    if !TEXT_LEVEL_ELEMENTS.contains(&name.as_str()) {
        return None;
    }
    let mut tag = Element::void(name);
    let attributes = captures.get(2).map_or("", |found| found.as_str());
    for attribute in TAG_ATTRIBUTE.captures_iter(attributes) {
        let Some(key) = attribute.get(1) else {
            continue;
        };
        let value = attribute.get(2).map_or("", |found| unquote(found.as_str()));
        tag.attributes
            .set(&key.as_str().to_ascii_lowercase(), Some(value.to_string()));
    }
    Some(Span {
        extent: captures.get(0)?.end(),
        position: None,
        payload: Payload::Tag(tag, captures.get(3).is_some()),
    })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .or_else(|| {
            value
                .strip_prefix('\'')
                .and_then(|inner| inner.strip_suffix('\''))
        })
        .unwrap_or(value)
}

fn special_character(_: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    let entity = match excerpt.text.as_bytes()[0] {
        b'&' if ENTITY.is_match(excerpt.text) => return None,
        b'&' => "&amp;",
        b'>' => "&gt;",
        b'<' => "&lt;",
        b'"' => "&quot;",
        _ => return None,
    };
    Some(Span::markup(1, entity))
}

fn strikethrough(_: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    let text = excerpt.text;
    let bytes = text.as_bytes();
    if bytes.get(1) != Some(&b'~') {
        return None;
    }
    let first = text[2..].chars().next()?;
    if first.is_whitespace() {
        return None;
    }
    let mut close = 2 + first.len_utf8();
    while close + 1 < bytes.len() {
        if bytes[close] == b'\n' {
            return None;
        }
        if bytes[close] == b'~'
            && bytes[close + 1] == b'~'
            && text[..close]
                .chars()
                .next_back()
                .is_some_and(|ch| !ch.is_whitespace())
        {
            return Some(Span::element(
                close + 2,
                Element::new("del", Content::Inline(text[2..close].to_string())),
            ));
        }
        close += 1;
    }
    None
}

fn url(session: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    if !session.options.bare_url_autolinking || excerpt.text.as_bytes().get(2) != Some(&b'/') {
        return None;
    }
    let found = BARE_URL.find(excerpt.context)?;
    let url = found.as_str().to_string();
    Some(Span {
        extent: found.len(),
        position: Some(found.start()),
        payload: Payload::Element(
            Element::new("a", Content::Text(url.clone())).with_attribute("href", Some(url)),
        ),
    })
}

fn url_tag(_: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    let captures = URL_TAG.captures(excerpt.text)?;
    let url = captures.get(1)?.as_str().to_string();
    Some(Span::element(
        captures.get(0)?.end(),
        Element::new("a", Content::Text(url.clone())).with_attribute("href", Some(url)),
    ))
}

fn email_tag(_: &Session<'_>, excerpt: &Excerpt<'_>) -> Option<Span> {
    let captures = EMAIL_TAG.captures(excerpt.text)?;
    let address = captures.get(1)?.as_str();
    let href = if captures.get(2).is_some() {
        address.to_string()
    } else {
        format!("mailto:{address}")
    };
    Some(Span::element(
        captures.get(0)?.end(),
        Element::new("a", Content::Text(address.to_string())).with_attribute("href", Some(href)),
    ))
}

fn count_run(bytes: &[u8], start: usize, needle: u8) -> usize {
    bytes[start..]
        .iter()
        .take_while(|byte| **byte == needle)
        .count()
}
