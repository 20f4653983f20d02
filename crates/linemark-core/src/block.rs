use once_cell::sync::Lazy;
use regex::Regex;

use crate::element::{Content, Element};
use crate::inline::{ATTRIBUTE, OPENING_TAG, TEXT_LEVEL_ELEMENTS};
use crate::line::{Line, is_blank};
use crate::markdown::Session;
use crate::reference::parse_definition;

/// Tags that never take content; on a line of their own they form a closed block.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "link", "meta",
    "param", "source",
];

/// An opening tag without the self-closing slash.
static OPENING_TAG_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^<(\w[\w-]*)(?:[ ]*{ATTRIBUTE})*[ ]*>"))
        .expect("opening tag pattern is valid")
});

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BlockKind {
    Code,
    Comment,
    FencedCode,
    Header,
    List,
    Markup,
    Quote,
    Reference,
    Rule,
    Table,
    TextHeader,
}

type Start = fn(&mut Session<'_>, &Line, Option<&Block>) -> Option<Block>;
/// Returns `false`, leaving the block untouched, when the line does not belong to it.
type Extend = fn(&mut Session<'_>, &Line, &mut Block) -> bool;
type Complete = fn(&mut Block);

pub(crate) struct Handlers {
    start: Start,
    extend: Option<Extend>,
    complete: Option<Complete>,
}

impl BlockKind {
    /// Kinds worth trying for a line starting with `marker`, in priority order.
    /// Indented code needs no marker and is always tried first.
    fn candidates(marker: u8) -> &'static [BlockKind] {
        use BlockKind::*;
        match marker {
            b'#' => &[Code, Header],
            b'*' => &[Code, Rule, List],
            b'+' => &[Code, List],
            b'-' => &[Code, TextHeader, Table, Rule, List],
            b'0'..=b'9' => &[Code, List],
            b':' => &[Code, Table],
            b'<' => &[Code, Comment, Markup],
            b'=' => &[Code, TextHeader],
            b'>' => &[Code, Quote],
            b'[' => &[Code, Reference],
            b'_' => &[Code, Rule],
            b'`' | b'~' => &[Code, FencedCode],
            b'|' => &[Code, Table],
            _ => &[Code],
        }
    }

    pub(crate) fn handlers(self) -> Handlers {
        let (start, extend, complete): (Start, Option<Extend>, Option<Complete>) = match self {
            BlockKind::Code => (code, Some(code_extend), None),
            BlockKind::Comment => (comment, Some(comment_extend), None),
            BlockKind::FencedCode => (fenced_code, Some(fenced_code_extend), Some(fenced_code_complete)),
            BlockKind::Header => (header, None, None),
            BlockKind::List => (list, Some(list_extend), Some(list_complete)),
            BlockKind::Markup => (markup, Some(markup_extend), None),
            BlockKind::Quote => (quote, Some(quote_extend), None),
            BlockKind::Reference => (reference, None, None),
            BlockKind::Rule => (rule, None, None),
            BlockKind::Table => (table, Some(table_extend), None),
            BlockKind::TextHeader => (text_header, None, None),
        };
        Handlers {
            start,
            extend,
            complete,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Body {
    Element(Element),
    /// Raw HTML emitted as-is.
    Markup(String),
    /// Consumed input with no output, such as a reference definition.
    Hidden,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ListPattern {
    Bullet,
    Ordered,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Alignment {
    Left,
    Right,
    Center,
}

impl Alignment {
    fn style(self) -> String {
        let name = match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
        };
        format!("text-align: {name};")
    }
}

#[derive(Clone, Debug)]
pub(crate) enum State {
    None,
    Fence { marker: u8, len: usize, complete: bool },
    List { indent: usize, pattern: ListPattern, loose: bool },
    Markup { name: String, depth: usize, closed: bool },
    Comment { closed: bool },
    Table { alignments: Vec<Option<Alignment>> },
}

/// An open or finished block region.
#[derive(Clone, Debug)]
pub(crate) struct Block {
    /// `None` for the implicit paragraph.
    pub(crate) kind: Option<BlockKind>,
    pub(crate) body: Body,
    pub(crate) state: State,
    /// A blank line was seen while the block was open.
    pub(crate) interrupted: bool,
    /// The block replaces the current one instead of following it.
    pub(crate) identified: bool,
    pub(crate) continuable: bool,
}

impl Block {
    fn new(body: Body, state: State) -> Self {
        Self {
            kind: None,
            body,
            state,
            interrupted: false,
            identified: false,
            continuable: false,
        }
    }

    fn element(element: Element) -> Self {
        Self::new(Body::Element(element), State::None)
    }

    fn paragraph(line: &Line) -> Self {
        let mut block = Self::element(Element::new("p", Content::Inline(line.text.clone())));
        block.identified = true;
        block
    }

    /// The open implicit paragraph, the only block a setext underline or a
    /// table divider may build on.
    fn is_open_paragraph(block: Option<&Block>) -> bool {
        block.is_some_and(|block| block.kind.is_none() && !block.interrupted)
    }

    fn element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.body {
            Body::Element(element) => Some(element),
            _ => None,
        }
    }

    fn markup_mut(&mut self) -> Option<&mut String> {
        match &mut self.body {
            Body::Markup(markup) => Some(markup),
            _ => None,
        }
    }
}

impl Session<'_> {
    /// Splits a line sequence into blocks; inline content stays unparsed.
    pub(crate) fn parse_blocks(&mut self, lines: &[String]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut current: Option<Block> = None;

        for raw in lines {
            if is_blank(raw) {
                if let Some(block) = current.as_mut() {
                    block.interrupted = true;
                }
                continue;
            }
            let line = Line::new(raw);

            if let Some(mut block) = current.take() {
                match block.kind.filter(|_| block.continuable) {
                    Some(kind) => {
                        let handlers = kind.handlers();
                        if let Some(extend) = handlers.extend
                            && extend(self, &line, &mut block)
                        {
                            current = Some(block);
                            continue;
                        }
                        if let Some(complete) = handlers.complete {
                            complete(&mut block);
                        }
                        blocks.push(block);
                    }
                    None => current = Some(block),
                }
            }

            let started = BlockKind::candidates(line.marker())
                .iter()
                .find_map(|&kind| {
                    (kind.handlers().start)(self, &line, current.as_ref()).map(|block| (kind, block))
                });
            if let Some((kind, mut block)) = started {
                block.kind = Some(kind);
                if !block.identified {
                    blocks.extend(current.take());
                    block.identified = true;
                }
                block.continuable = kind.handlers().extend.is_some();
                current = Some(block);
                continue;
            }

            match current.as_mut() {
                Some(block) if block.kind.is_none() && !block.interrupted => {
                    if let Some(text) = block.element_mut().and_then(Element::text_mut) {
                        text.push('\n');
                        text.push_str(&line.text);
                    }
                }
                _ => {
                    blocks.extend(current.take());
                    current = Some(Block::paragraph(&line));
                }
            }
        }

        if let Some(block) = current.as_mut()
            && block.continuable
            && let Some(complete) = block.kind.and_then(|kind| kind.handlers().complete)
        {
            complete(block);
        }
        blocks.extend(current);
        blocks
    }
}

fn code(_: &mut Session<'_>, line: &Line, current: Option<&Block>) -> Option<Block> {
    if Block::is_open_paragraph(current) || line.indent < 4 {
        return None;
    }
    let code = Element::new("code", Content::Text(line.body[4..].to_string()));
    Some(Block::element(Element::new(
        "pre",
        Content::Element(Box::new(code)),
    )))
}

fn code_extend(_: &mut Session<'_>, line: &Line, block: &mut Block) -> bool {
    if line.indent < 4 {
        return false;
    }
    let interrupted = std::mem::take(&mut block.interrupted);
    if let Some(text) = block.element_mut().and_then(Element::text_mut) {
        if interrupted {
            text.push('\n');
        }
        text.push('\n');
        text.push_str(&line.body[4..]);
    }
    true
}

fn comment(session: &mut Session<'_>, line: &Line, _: Option<&Block>) -> Option<Block> {
    if session.options.raw_html_disabled() || !line.text.starts_with("<!--") {
        return None;
    }
    let closed = line.text.ends_with("-->");
    Some(Block::new(
        Body::Markup(line.body.clone()),
        State::Comment { closed },
    ))
}

fn comment_extend(_: &mut Session<'_>, line: &Line, block: &mut Block) -> bool {
    if matches!(block.state, State::Comment { closed: true }) {
        return false;
    }
    if let Some(markup) = block.markup_mut() {
        markup.push('\n');
        markup.push_str(&line.body);
    }
    block.state = State::Comment {
        closed: line.text.ends_with("-->"),
    };
    true
}

fn fenced_code(_: &mut Session<'_>, line: &Line, _: Option<&Block>) -> Option<Block> {
    let marker = line.marker();
    let len = count_leading(&line.text, marker);
    let info = &line.text[len..];
    if len < 3 || info.contains('`') {
        return None;
    }
    let mut code = Element::new("code", Content::Text(String::new()));
    let info = info.trim_start_matches(' ');
    let language = info
        .split([' ', '\t', '\n', '\x0C', '\r'])
        .next()
        .unwrap_or_default();
    if !language.is_empty() {
        code.attributes
            .set("class", Some(format!("language-{language}")));
    }
    Some(Block::new(
        Body::Element(Element::new("pre", Content::Element(Box::new(code)))),
        State::Fence {
            marker,
            len,
            complete: false,
        },
    ))
}

fn fenced_code_extend(_: &mut Session<'_>, line: &Line, block: &mut Block) -> bool {
    let State::Fence {
        marker,
        len,
        complete: false,
    } = block.state
    else {
        return false;
    };
    let interrupted = std::mem::take(&mut block.interrupted);
    let closing = is_closing_fence(&line.text, marker, len);
    if let Some(text) = block.element_mut().and_then(Element::text_mut) {
        if interrupted {
            text.push('\n');
        }
        if closing {
            strip_leading_newline(text);
        } else {
            text.push('\n');
            text.push_str(&line.body);
        }
    }
    if closing {
        block.state = State::Fence {
            marker,
            len,
            complete: true,
        };
    }
    true
}

/// An unclosed fence keeps its content, minus the separator newline every
/// appended line starts with.
fn fenced_code_complete(block: &mut Block) {
    let State::Fence {
        marker,
        len,
        complete: false,
    } = block.state
    else {
        return;
    };
    if let Some(text) = block.element_mut().and_then(Element::text_mut) {
        strip_leading_newline(text);
    }
    block.state = State::Fence {
        marker,
        len,
        complete: true,
    };
}

fn is_closing_fence(text: &str, marker: u8, len: usize) -> bool {
    let run = count_leading(text, marker);
    run >= len && text[run..].bytes().all(|byte| byte == b' ')
}

fn strip_leading_newline(text: &mut String) {
    if text.starts_with('\n') {
        text.remove(0);
    }
}

fn header(_: &mut Session<'_>, line: &Line, _: Option<&Block>) -> Option<Block> {
    if line.text.len() < 2 {
        return None;
    }
    let level = count_leading(&line.text, b'#');
    if level > 6 {
        return None;
    }
    let text = line.text.trim_matches(['#', ' ']);
    Some(Block::element(Element::new(
        format!("h{level}"),
        Content::Inline(text.to_string()),
    )))
}

/// Splits `- item` or `12. item` into the marker and the item text. A bare
/// marker yields an empty item only when `bare` is set.
fn list_item(text: &str, pattern: ListPattern, bare: bool) -> Option<(&str, &str)> {
    let marker_len = match pattern {
        ListPattern::Bullet => usize::from(matches!(
            text.as_bytes().first(),
            Some(b'*' | b'+' | b'-')
        )),
        ListPattern::Ordered => {
            let digits = text.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 0 && text.as_bytes().get(digits) == Some(&b'.') {
                digits + 1
            } else {
                0
            }
        }
    };
    if marker_len == 0 {
        return None;
    }
    let (marker, rest) = text.split_at(marker_len);
    if rest.starts_with(' ') {
        Some((marker, rest.trim_start_matches(' ')))
    } else if bare && rest.is_empty() {
        Some((marker, rest))
    } else {
        None
    }
}

fn list(_: &mut Session<'_>, line: &Line, _: Option<&Block>) -> Option<Block> {
    let (name, pattern) = if line.marker().is_ascii_digit() {
        ("ol", ListPattern::Ordered)
    } else {
        ("ul", ListPattern::Bullet)
    };
    let (marker, item) = list_item(&line.text, pattern, false)?;
    let li = Element::new("li", Content::ListItem(vec![item.to_string()]));
    let mut list = Element::new(name, Content::Elements(vec![li]));
    if pattern == ListPattern::Ordered {
        let start = marker.trim_end_matches('.');
        if start != "1" {
            list.attributes.set("start", Some(start.to_string()));
        }
    }
    Some(Block::new(
        Body::Element(list),
        State::List {
            indent: line.indent,
            pattern,
            loose: false,
        },
    ))
}

fn list_extend(session: &mut Session<'_>, line: &Line, block: &mut Block) -> bool {
    let State::List {
        indent, pattern, ..
    } = block.state
    else {
        return false;
    };
    if indent == line.indent
        && let Some((_, item)) = list_item(&line.text, pattern, true)
    {
        let interrupted = std::mem::take(&mut block.interrupted);
        if interrupted && let State::List { loose, .. } = &mut block.state {
            *loose = true;
        }
        if let Some(items) = block.element_mut().and_then(Element::children_mut) {
            if interrupted && let Some(lines) = items.last_mut().and_then(Element::lines_mut) {
                lines.push(String::new());
            }
            items.push(Element::new("li", Content::ListItem(vec![item.to_string()])));
        }
        return true;
    }
    if line.marker() == b'[' && reference(session, line, None).is_some() {
        return true;
    }
    if block.interrupted && line.indent == 0 {
        return false;
    }
    let interrupted = std::mem::take(&mut block.interrupted);
    if let Some(lines) = block
        .element_mut()
        .and_then(Element::children_mut)
        .and_then(|items| items.last_mut())
        .and_then(Element::lines_mut)
    {
        if interrupted {
            lines.push(String::new());
        }
        lines.push(strip_item_indent(&line.body).to_string());
    }
    true
}

/// Loose lists end every item with a blank line so its body renders as paragraphs.
fn list_complete(block: &mut Block) {
    if !matches!(block.state, State::List { loose: true, .. }) {
        return;
    }
    if let Some(items) = block.element_mut().and_then(Element::children_mut) {
        for lines in items.iter_mut().filter_map(Element::lines_mut) {
            if lines.last().is_none_or(|last| !last.is_empty()) {
                lines.push(String::new());
            }
        }
    }
}

fn strip_item_indent(body: &str) -> &str {
    let spaces = body.bytes().take(4).take_while(|byte| *byte == b' ').count();
    &body[spaces..]
}

fn markup(session: &mut Session<'_>, line: &Line, _: Option<&Block>) -> Option<Block> {
    if session.options.raw_html_disabled() {
        return None;
    }
    let captures = OPENING_TAG.captures(&line.text)?;
    let name = captures.get(1)?.as_str();
    if TEXT_LEVEL_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
        return None;
    }
    let self_closing = captures.get(3).is_some() || VOID_ELEMENTS.contains(&name);
    let remainder = &line.text[captures.get(0)?.end()..];
    let closed = if remainder.trim().is_empty() {
        self_closing
    } else if self_closing {
        return None;
    } else {
        ends_with_closing_tag(remainder, name)
    };
    Some(Block::new(
        Body::Markup(line.text.clone()),
        State::Markup {
            name: name.to_string(),
            depth: 0,
            closed,
        },
    ))
}

fn markup_extend(_: &mut Session<'_>, line: &Line, block: &mut Block) -> bool {
    let State::Markup {
        name,
        depth,
        closed,
    } = &mut block.state
    else {
        return false;
    };
    if *closed {
        return false;
    }
    if let Some(captures) = OPENING_TAG_ONLY.captures(&line.text)
        && captures
            .get(1)
            .is_some_and(|found| found.as_str().eq_ignore_ascii_case(name))
    {
        *depth += 1;
    }
    if ends_with_closing_tag(&line.text, name) {
        if *depth > 0 {
            *depth -= 1;
        } else {
            *closed = true;
        }
    }
    let interrupted = std::mem::take(&mut block.interrupted);
    if let Some(markup) = block.markup_mut() {
        if interrupted {
            markup.push('\n');
        }
        markup.push('\n');
        markup.push_str(&line.body);
    }
    true
}

fn ends_with_closing_tag(text: &str, name: &str) -> bool {
    let text = text.trim_end_matches(' ');
    let tag = format!("</{name}>");
    text.len() >= tag.len()
        && text.is_char_boundary(text.len() - tag.len())
        && text[text.len() - tag.len()..].eq_ignore_ascii_case(&tag)
}

fn quote(_: &mut Session<'_>, line: &Line, _: Option<&Block>) -> Option<Block> {
    let text = quoted(&line.text)?;
    Some(Block::element(Element::new(
        "blockquote",
        Content::Blocks(vec![text.to_string()]),
    )))
}

fn quote_extend(_: &mut Session<'_>, line: &Line, block: &mut Block) -> bool {
    let quoted = quoted(&line.text);
    if quoted.is_none() && block.interrupted {
        return false;
    }
    let interrupted = std::mem::take(&mut block.interrupted);
    if let Some(lines) = block.element_mut().and_then(Element::lines_mut) {
        match quoted {
            Some(text) => {
                if interrupted {
                    lines.push(String::new());
                }
                lines.push(text.to_string());
            }
            None => lines.push(line.text.clone()),
        }
    }
    true
}

fn quoted(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn reference(session: &mut Session<'_>, line: &Line, _: Option<&Block>) -> Option<Block> {
    let (id, definition) = parse_definition(&line.text)?;
    session.references.insert(&id, definition);
    Some(Block::new(Body::Hidden, State::None))
}

fn rule(_: &mut Session<'_>, line: &Line, _: Option<&Block>) -> Option<Block> {
    let marker = line.marker();
    let bytes = line.text.as_bytes();
    let only_marker_and_spaces = bytes.iter().all(|byte| *byte == marker || *byte == b' ');
    let count = bytes.iter().filter(|byte| **byte == marker).count();
    if !only_marker_and_spaces || count < 3 {
        return None;
    }
    Some(Block::element(Element::void("hr")))
}

fn text_header(_: &mut Session<'_>, line: &Line, current: Option<&Block>) -> Option<Block> {
    if !Block::is_open_paragraph(current) {
        return None;
    }
    let marker = line.marker();
    if !line.text.bytes().all(|byte| byte == marker) {
        return None;
    }
    let mut block = current?.clone();
    if let Some(element) = block.element_mut() {
        element.name = if marker == b'=' { "h1" } else { "h2" }.to_string();
    }
    Some(block)
}

fn table(_: &mut Session<'_>, line: &Line, current: Option<&Block>) -> Option<Block> {
    if !Block::is_open_paragraph(current) {
        return None;
    }
    let header = match &current?.body {
        Body::Element(Element {
            content: Content::Inline(text),
            ..
        }) => text,
        _ => return None,
    };
    if !header.contains('|') || !line.text.bytes().all(|byte| b" -:|".contains(&byte)) {
        return None;
    }

    let alignments: Vec<Option<Alignment>> = trim_pipes(&line.text)
        .split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(|cell| match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Some(Alignment::Center),
            (true, false) => Some(Alignment::Left),
            (false, true) => Some(Alignment::Right),
            (false, false) => None,
        })
        .collect();

    let cells = trim_pipes(header)
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect();
    let head = Element::new(
        "thead",
        Content::Elements(vec![row("th", cells, &alignments)]),
    );
    let body = Element::new("tbody", Content::Elements(Vec::new()));
    let table = Element::new("table", Content::Elements(vec![head, body]));

    let mut block = Block::new(Body::Element(table), State::Table { alignments });
    block.identified = true;
    Some(block)
}

fn table_extend(_: &mut Session<'_>, line: &Line, block: &mut Block) -> bool {
    if block.interrupted || !line.text.contains('|') {
        return false;
    }
    let State::Table { alignments } = &block.state else {
        return false;
    };
    let cells = split_row(trim_pipes(&line.text))
        .into_iter()
        .map(|cell| cell.trim().to_string())
        .collect();
    let tr = row("td", cells, alignments);
    if let Some(body) = block
        .element_mut()
        .and_then(Element::children_mut)
        .and_then(|parts| parts.get_mut(1))
        .and_then(Element::children_mut)
    {
        body.push(tr);
    }
    true
}

fn row(cell: &str, cells: Vec<String>, alignments: &[Option<Alignment>]) -> Element {
    let cells = cells
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let style = alignments.get(index).copied().flatten().map(Alignment::style);
            Element::new(cell, Content::Inline(text)).with_attribute("style", style)
        })
        .collect();
    Element::new("tr", Content::Elements(cells))
}

fn trim_pipes(text: &str) -> &str {
    text.trim_matches([' ', '\t', '\n', '\r', '\0', '\x0B'])
        .trim_matches('|')
}

/// Cells of a body row. A `|` inside a code span or escaped with a backslash
/// does not split, and empty cells are dropped.
fn split_row(row: &str) -> Vec<&str> {
    let bytes = row.as_bytes();
    let mut cells = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if bytes.get(pos + 1) == Some(&b'|') => pos += 2,
            b'`' => {
                let close = bytes[pos + 1..].iter().position(|byte| *byte == b'`');
                pos += match close {
                    Some(offset) if offset > 0 => offset + 2,
                    _ => 1,
                };
            }
            b'|' => {
                if pos > start {
                    cells.push(&row[start..pos]);
                }
                pos += 1;
                start = pos;
            }
            _ => pos += 1,
        }
    }
    if pos > start {
        cells.push(&row[start..]);
    }
    cells
}

fn count_leading(text: &str, byte: u8) -> usize {
    text.bytes().take_while(|found| *found == byte).count()
}
