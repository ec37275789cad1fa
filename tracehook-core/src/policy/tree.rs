//! Attributed-tree accessor over the parsed policy document.
//!
//! Every tag and attribute lookup the builder performs goes through
//! [`ElementExt`], so the rest of the crate never touches raw tree traversal.
//! Lookups search descendants in document order, excluding the element itself.

use roxmltree::Node;
use tracing::warn;

/// Attribute that switches an element on or off.
pub const ENABLED_ATTRIBUTE: &str = "enabled";

pub trait ElementExt<'a, 'input: 'a> {
    /// First descendant element with the given tag name.
    fn first_element(&self, tag: &str) -> Option<Node<'a, 'input>>;

    /// All descendant elements with the given tag name, in document order.
    fn elements_named(&self, tag: &str) -> Vec<Node<'a, 'input>>;

    /// Attribute value, treating an empty value as absent.
    fn non_empty_attribute(&self, name: &str) -> Option<&'a str>;

    /// Boolean attribute; `true` (any case, untrimmed) is true, any other present value is false.
    fn bool_attribute(&self, name: &str, default: bool) -> bool;

    /// Non-negative integer attribute. Unparseable values are logged and defaulted.
    fn u64_attribute(&self, name: &str, default: u64) -> u64;

    /// String attribute with a default for absent or empty values.
    fn string_attribute(&self, name: &str, default: &str) -> String;

    /// Text content parsed as a non-negative integer.
    fn u64_text(&self) -> Option<u64>;

    /// Whether the element is switched on. A missing `enabled` attribute means on.
    fn is_enabled(&self) -> bool {
        self.bool_attribute(ENABLED_ATTRIBUTE, true)
    }
}

impl<'a, 'input: 'a> ElementExt<'a, 'input> for Node<'a, 'input> {
    fn first_element(&self, tag: &str) -> Option<Node<'a, 'input>> {
        self.descendants()
            .skip(1)
            .find(|node| node.is_element() && node.tag_name().name() == tag)
    }

    fn elements_named(&self, tag: &str) -> Vec<Node<'a, 'input>> {
        self.descendants()
            .skip(1)
            .filter(|node| node.is_element() && node.tag_name().name() == tag)
            .collect()
    }

    fn non_empty_attribute(&self, name: &str) -> Option<&'a str> {
        self.attribute(name).filter(|value| !value.is_empty())
    }

    fn bool_attribute(&self, name: &str, default: bool) -> bool {
        match self.non_empty_attribute(name) {
            Some(value) => value.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    fn u64_attribute(&self, name: &str, default: u64) -> u64 {
        let Some(value) = self.non_empty_attribute(name) else {
            return default;
        };
        match value.trim().parse::<u64>() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    element = self.tag_name().name(),
                    attribute = name,
                    value,
                    "Invalid numeric attribute ({}), using default {}",
                    e,
                    default
                );
                default
            }
        }
    }

    fn string_attribute(&self, name: &str, default: &str) -> String {
        self.non_empty_attribute(name).unwrap_or(default).to_string()
    }

    fn u64_text(&self) -> Option<u64> {
        let text = self.text().map(str::trim).filter(|text| !text.is_empty())?;
        match text.parse::<u64>() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(
                    element = self.tag_name().name(),
                    value = text,
                    "Invalid numeric content ({})",
                    e
                );
                None
            }
        }
    }
}

/// Whether an optional feature element is present and switched on.
pub fn feature_enabled(element: Option<Node<'_, '_>>) -> bool {
    element.is_some_and(|element| element.is_enabled())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn parse(xml: &str) -> Document<'_> {
        Document::parse(xml).expect("test document should parse")
    }

    #[test]
    fn test_first_element_searches_descendants_in_order() {
        let doc = parse(r#"<Root><A><B id="inner"/></A><B id="outer"/></Root>"#);
        let root = doc.root_element();

        let b = root.first_element("B").unwrap();
        assert_eq!(b.attribute("id"), Some("inner"));
        assert!(root.first_element("C").is_none());
    }

    #[test]
    fn test_first_element_excludes_self() {
        let doc = parse(r#"<B><B id="child"/></B>"#);
        let root = doc.root_element();
        assert_eq!(root.first_element("B").unwrap().attribute("id"), Some("child"));
    }

    #[test]
    fn test_elements_named_collects_all() {
        let doc = parse(r#"<Root><M n="1"/><X><M n="2"/></X><M n="3"/></Root>"#);
        let names: Vec<_> = doc
            .root_element()
            .elements_named("M")
            .iter()
            .filter_map(|m| m.attribute("n"))
            .collect();
        assert_eq!(names, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_bool_attribute() {
        let doc = parse(r#"<E a="TRUE" b="false" c="" d="yes"/>"#);
        let e = doc.root_element();

        assert!(e.bool_attribute("a", false));
        assert!(!e.bool_attribute("b", true));
        assert!(e.bool_attribute("c", true)); // empty means absent
        assert!(!e.bool_attribute("d", true));
        assert!(!e.bool_attribute("missing", false));
    }

    #[test]
    fn test_bool_attribute_is_not_trimmed() {
        let doc = parse(r#"<E padded=" true " enabled=" true "/>"#);
        let e = doc.root_element();

        assert!(!e.bool_attribute("padded", true));
        assert!(!e.is_enabled());
    }

    #[test]
    fn test_is_enabled_defaults_to_true() {
        assert!(parse("<E/>").root_element().is_enabled());
        assert!(!parse(r#"<E enabled="False"/>"#).root_element().is_enabled());
    }

    #[test]
    fn test_u64_attribute_falls_back_on_garbage() {
        let doc = parse(r#"<E ok=" 250 " neg="-5" junk="abc"/>"#);
        let e = doc.root_element();

        assert_eq!(e.u64_attribute("ok", 0), 250);
        assert_eq!(e.u64_attribute("neg", 7), 7);
        assert_eq!(e.u64_attribute("junk", 9), 9);
        assert_eq!(e.u64_attribute("missing", 3), 3);
    }

    #[test]
    fn test_u64_text() {
        assert_eq!(parse("<E> 1500 </E>").root_element().u64_text(), Some(1500));
        assert_eq!(parse("<E>soon</E>").root_element().u64_text(), None);
        assert_eq!(parse("<E/>").root_element().u64_text(), None);
    }

    #[test]
    fn test_feature_enabled() {
        let doc = parse(r#"<Root><On/><Off enabled="false"/></Root>"#);
        let root = doc.root_element();

        assert!(feature_enabled(root.first_element("On")));
        assert!(!feature_enabled(root.first_element("Off")));
        assert!(!feature_enabled(root.first_element("Missing")));
    }
}
