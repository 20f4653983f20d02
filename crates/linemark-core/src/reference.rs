use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\[(.+?)\]:[ ]*<?(\S+?)>?(?:[ ]+["'(](.+)["')])?[ ]*$"#)
        .expect("reference definition pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Definition {
    pub(crate) url: String,
    pub(crate) title: Option<String>,
}

/// Link reference definitions of one conversion, keyed by case-folded id.
#[derive(Debug, Default)]
pub(crate) struct ReferenceTable {
    definitions: HashMap<String, Definition>,
}

impl ReferenceTable {
    pub(crate) fn insert(&mut self, id: &str, definition: Definition) {
        let id = normalize_id(id);
        tracing::trace!(id = %id, url = %definition.url, "stored reference definition");
        self.definitions.insert(id, definition);
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(&normalize_id(id))
    }

    pub(crate) fn clear(&mut self) {
        self.definitions.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.definitions.len()
    }
}

pub(crate) fn normalize_id(id: &str) -> String {
    id.to_lowercase()
}

/// Parses `[id]: url "title"`; the title may also use `'` or `( )`.
pub(crate) fn parse_definition(text: &str) -> Option<(String, Definition)> {
    let captures = DEFINITION.captures(text)?;
    let id = captures.get(1)?.as_str().to_string();
    let url = captures.get(2)?.as_str().to_string();
    let title = captures.get(3).map(|title| title.as_str().to_string());
    Some((id, Definition { url, title }))
}

#[cfg(test)]
mod tests {
    use super::{Definition, ReferenceTable, parse_definition};

    #[test]
    fn definition_with_title() {
        let (id, definition) = parse_definition(r#"[Foo]: http://e.com "Title""#).unwrap();
        assert_eq!(id, "Foo");
        assert_eq!(
            definition,
            Definition {
                url: "http://e.com".to_string(),
                title: Some("Title".to_string()),
            }
        );
    }

    #[test]
    fn angle_brackets_and_paren_title() {
        let (_, definition) = parse_definition("[a]: <http://e.com/x> (Paren)").unwrap();
        assert_eq!(definition.url, "http://e.com/x");
        assert_eq!(definition.title.as_deref(), Some("Paren"));
    }

    #[test]
    fn rejects_non_definitions() {
        assert!(parse_definition("[a] http://e.com").is_none());
        assert!(parse_definition("[]: http://e.com").is_none());
        assert!(parse_definition("[a]:").is_none());
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let mut table = ReferenceTable::default();
        table.insert(
            "Foo",
            Definition {
                url: "/foo".to_string(),
                title: None,
            },
        );
        assert_eq!(table.get("FOO").map(|d| d.url.as_str()), Some("/foo"));
        table.clear();
        assert_eq!(table.len(), 0);
    }
}
