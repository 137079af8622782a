use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use std::path::Path;

pub const NS_MD: &str = "urn:oasis:names:tc:SAML:2.0:metadata";
pub const NS_MDUI: &str = "urn:oasis:names:tc:SAML:metadata:ui";
pub const NS_MDRPI: &str = "urn:oasis:names:tc:SAML:metadata:rpi";
pub const NS_MDATTR: &str = "urn:oasis:names:tc:SAML:metadata:attribute";
pub const NS_SAML: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
pub const NS_REMD: &str = "http://refeds.org/metadata";
pub const NS_ICMD: &str = "http://id.incommon.org/metadata";

/// A namespace-resolved attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// One element of a parsed metadata document.
///
/// The tree is owned and immutable once built; queries never allocate
/// beyond the returned vectors.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn is(&self, ns: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(ns)
    }

    /// Unqualified attribute lookup (no namespace on the attribute).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attr_ns(&self, ns: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(ns) && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children<'a>(&'a self, ns: &'a str, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.is(ns, name))
    }

    /// First matching descendant in document order. The element itself is
    /// not considered.
    pub fn find(&self, ns: &str, name: &str) -> Option<&Element> {
        self.descendants().find(|e| e.is(ns, name))
    }

    /// All matching descendants in document order.
    pub fn find_all<'a>(&'a self, ns: &'a str, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.descendants().filter(move |e| e.is(ns, name))
    }

    /// Pre-order walk over every element below this one.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

pub fn parse_file(path: &Path) -> Result<Element> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_str(xml: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Err(e) => anyhow::bail!("XML parse error at position {}: {}", reader.error_position(), e),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let element = open_element(&reader, &e);
                stack.push(element);
            }
            Ok(Event::Empty(e)) => {
                let element = open_element(&reader, &e);
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                if let Some(mut element) = stack.pop() {
                    let trimmed = element.text.trim();
                    if trimmed.len() != element.text.len() {
                        element.text = trimmed.to_string();
                    }
                    attach(&mut stack, &mut root, element);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(current) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        anyhow::bail!("XML parse error: {} unclosed element(s) at end of input", stack.len());
    }
    root.ok_or_else(|| anyhow::anyhow!("XML parse error: document has no root element"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn open_element(reader: &NsReader<&[u8]>, e: &BytesStart<'_>) -> Element {
    let (ns, local) = reader.resolve_element(e.name());
    let attributes = e
        .attributes()
        .filter_map(|a| a.ok())
        .filter(|a| {
            let key = a.key.as_ref();
            key != b"xmlns" && !key.starts_with(b"xmlns:")
        })
        .map(|a| {
            let (ans, alocal) = reader.resolve_attribute(a.key);
            let value = a
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
            Attribute {
                namespace: namespace_uri(ans),
                name: String::from_utf8_lossy(alocal.as_ref()).into_owned(),
                value,
            }
        })
        .collect();

    Element {
        namespace: namespace_uri(ns),
        name: String::from_utf8_lossy(local.as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    }
}

fn namespace_uri(result: ResolveResult<'_>) -> Option<String> {
    match result {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
    <md:EntitiesDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"
                           xmlns:mdui="urn:oasis:names:tc:SAML:metadata:ui"
                           xmlns:remd="http://refeds.org/metadata">
        <md:EntityDescriptor entityID="https://a.example.org/sp">
            <md:SPSSODescriptor>
                <md:Extensions>
                    <mdui:UIInfo>
                        <mdui:PrivacyStatementURL xml:lang="en"> https://a.example.org/privacy </mdui:PrivacyStatementURL>
                    </mdui:UIInfo>
                </md:Extensions>
            </md:SPSSODescriptor>
            <md:ContactPerson contactType="other"
                              remd:contactType="http://refeds.org/metadata/contactType/security"/>
        </md:EntityDescriptor>
        <md:EntitiesDescriptor>
            <EntityDescriptor xmlns="urn:oasis:names:tc:SAML:2.0:metadata" entityID="nested"/>
        </md:EntitiesDescriptor>
    </md:EntitiesDescriptor>
    "#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let root = parse_str(DOC).unwrap();
        assert!(root.is(NS_MD, "EntitiesDescriptor"));
        let entity = root.children(NS_MD, "EntityDescriptor").next().unwrap();
        assert_eq!(entity.attr("entityID"), Some("https://a.example.org/sp"));
    }

    #[test]
    fn test_default_namespace_matches_prefixed_lookup() {
        let root = parse_str(DOC).unwrap();
        let ids: Vec<_> = root
            .find_all(NS_MD, "EntityDescriptor")
            .filter_map(|e| e.attr("entityID"))
            .collect();
        assert_eq!(ids, vec!["https://a.example.org/sp", "nested"]);
    }

    #[test]
    fn test_text_is_trimmed_and_first_match_wins() {
        let root = parse_str(DOC).unwrap();
        let url = root.find(NS_MDUI, "PrivacyStatementURL").unwrap();
        assert_eq!(url.text, "https://a.example.org/privacy");
    }

    #[test]
    fn test_qualified_attribute_lookup() {
        let root = parse_str(DOC).unwrap();
        let contact = root.find(NS_MD, "ContactPerson").unwrap();
        assert_eq!(contact.attr("contactType"), Some("other"));
        assert_eq!(
            contact.attr_ns(NS_REMD, "contactType"),
            Some("http://refeds.org/metadata/contactType/security")
        );
        assert_eq!(contact.attr_ns(NS_ICMD, "contactType"), None);
    }

    #[test]
    fn test_wrong_namespace_does_not_match() {
        let root = parse_str(r#"<EntityDescriptor xmlns="urn:other" entityID="x"/>"#).unwrap();
        assert!(!root.is(NS_MD, "EntityDescriptor"));
        assert_eq!(root.namespace.as_deref(), Some("urn:other"));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = parse_str("<md:EntitiesDescriptor><a></b>").unwrap_err();
        assert!(err.to_string().contains("XML parse error"));
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(parse_str("   ").is_err());
    }
}
