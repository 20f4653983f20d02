use crate::inline::InlineSet;

/// Ordered attribute list.
///
/// A `None` value keeps the slot (and its position) without rendering it, so a
/// link can reserve `href` and `title` before it knows whether a title exists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Attributes {
    items: Vec<(String, Option<String>)>,
}

impl Attributes {
    pub(crate) fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub(crate) fn with(mut self, name: &str, value: Option<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Replaces the value in place, or appends a new slot.
    pub(crate) fn set(&mut self, name: &str, value: Option<String>) {
        match self.items.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.items.push((name.to_string(), value)),
        }
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut String> {
        self.items
            .iter_mut()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_mut())
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.items.retain(|(key, _)| keep(key));
    }

    /// Attributes that render, in insertion order.
    pub(crate) fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
    }
}

/// Element content together with the way the renderer must treat it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Content {
    /// No content and no closing tag.
    Void,
    /// Literal text, HTML-escaped on output.
    Text(String),
    /// One logical line handed to the inline scanner.
    Inline(String),
    /// Lines re-parsed as a nested block sequence.
    Blocks(Vec<String>),
    /// Like `Blocks`, but a tight item drops its single wrapping paragraph.
    ListItem(Vec<String>),
    /// Child elements, each on its own line.
    Elements(Vec<Element>),
    /// A single child rendered without separators.
    Element(Box<Element>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Element {
    pub(crate) name: String,
    pub(crate) attributes: Attributes,
    pub(crate) content: Content,
    /// Inline kinds that may not appear inside this element's inline content.
    pub(crate) non_nestable: InlineSet,
}

impl Element {
    pub(crate) fn new(name: impl Into<String>, content: Content) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            content,
            non_nestable: InlineSet::EMPTY,
        }
    }

    pub(crate) fn void(name: impl Into<String>) -> Self {
        Self::new(name, Content::Void)
    }

    pub(crate) fn with_attribute(mut self, name: &str, value: Option<String>) -> Self {
        self.attributes.set(name, value);
        self
    }

    /// The text of a leaf element, looking through a single wrapped child
    /// (`pre > code`).
    pub(crate) fn text_mut(&mut self) -> Option<&mut String> {
        match &mut self.content {
            Content::Text(text) | Content::Inline(text) => Some(text),
            Content::Element(child) => child.text_mut(),
            _ => None,
        }
    }

    pub(crate) fn lines_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.content {
            Content::Blocks(lines) | Content::ListItem(lines) => Some(lines),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Element>> {
        match &mut self.content {
            Content::Elements(children) => Some(children),
            _ => None,
        }
    }
}
