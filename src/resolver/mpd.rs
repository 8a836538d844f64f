//! Minimal element tree for MPD manifests.
//!
//! The manifest is first passed through [`strip_root_attributes`], which drops
//! namespace declarations and schema hints from the root element, then parsed
//! into [`Element`]s keyed by local name so lookups never need a namespace.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use super::ResolveError;

/// Root attributes that survive [`strip_root_attributes`].
pub const ROOT_ATTRIBUTE_ALLOW_LIST: [&str; 4] = [
    "mediaPresentationDuration",
    "minBufferTime",
    "type",
    "profiles",
];

/// One XML element with its attributes, children and text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name (prefix removed).
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    /// Attribute value by local name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, or `InvalidManifest` naming the element and attribute.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidManifest` if the attribute is absent or empty.
    pub fn required_attr(&self, name: &str) -> Result<&str, ResolveError> {
        self.attr(name).filter(|v| !v.is_empty()).ok_or_else(|| {
            ResolveError::invalid_manifest(format!(
                "<{}> is missing attribute '{name}'",
                self.name
            ))
        })
    }

    /// First child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Concatenated, trimmed text content.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, ResolveError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_error)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }
}

/// Removes every root attribute that is not in [`ROOT_ATTRIBUTE_ALLOW_LIST`].
///
/// # Errors
///
/// Returns `ResolveError::InvalidManifest` on malformed XML.
pub fn strip_root_attributes(text: &str) -> Result<String, ResolveError> {
    let mut reader = Reader::from_str(text);
    let mut writer = Writer::new(Vec::new());
    let mut root_seen = false;

    loop {
        let event = match reader.read_event().map_err(xml_error)? {
            Event::Eof => break,
            Event::Start(start) if !root_seen => {
                root_seen = true;
                Event::Start(filtered_root(&start)?)
            }
            Event::Empty(start) if !root_seen => {
                root_seen = true;
                Event::Empty(filtered_root(&start)?)
            }
            other => other,
        };
        writer.write_event(event).map_err(xml_error)?;
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| ResolveError::invalid_manifest(format!("manifest is not UTF-8: {e}")))
}

fn filtered_root(start: &BytesStart<'_>) -> Result<BytesStart<'static>, ResolveError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut root = BytesStart::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = attr.key.as_ref();
        if ROOT_ATTRIBUTE_ALLOW_LIST
            .iter()
            .any(|allowed| allowed.as_bytes() == key)
        {
            root.push_attribute(attr);
        }
    }
    Ok(root)
}

/// Parses a whole document into its root [`Element`].
///
/// # Errors
///
/// Returns `ResolveError::InvalidManifest` on malformed or truncated XML.
pub fn parse_document(text: &str) -> Result<Element, ResolveError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ResolveError::invalid_manifest("unbalanced end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => {
                return Err(ResolveError::invalid_manifest("document has no root element"));
            }
            _ => {}
        }
    }
}

fn xml_error(error: impl std::fmt::Display) -> ResolveError {
    ResolveError::invalid_manifest(format!("malformed XML: {error}"))
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Parses an ISO-8601 duration such as `PT1H2M3.5S` into seconds.
///
/// Years and months count as 365 and 30 days.
#[must_use]
pub fn parse_iso8601_duration(value: &str) -> Option<f64> {
    let rest = value.trim().strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut seconds = sum_components(
        date,
        &[
            ('Y', 365.0 * SECONDS_PER_DAY),
            ('M', 30.0 * SECONDS_PER_DAY),
            ('W', 7.0 * SECONDS_PER_DAY),
            ('D', SECONDS_PER_DAY),
        ],
    )?;
    if let Some(time) = time {
        if time.is_empty() {
            return None;
        }
        seconds += sum_components(time, &[('H', 3600.0), ('M', 60.0), ('S', 1.0)])?;
    }
    Some(seconds)
}

fn sum_components(mut part: &str, units: &[(char, f64)]) -> Option<f64> {
    let mut total = 0.0;
    for (unit, scale) in units {
        if let Some(index) = part.find(*unit) {
            let amount: f64 = part[..index].parse().ok()?;
            total += amount * scale;
            part = &part[index + 1..];
        }
    }
    part.is_empty().then_some(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NAMESPACED: &str = r#"<?xml version="1.0"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
     xsi:schemaLocation="urn:mpeg:dash:schema:mpd:2011 DASH-MPD.xsd"
     type="static" mediaPresentationDuration="PT10S" minBufferTime="PT2S">
  <Period><AdaptationSet contentType="video"/></Period>
</MPD>"#;

    #[test]
    fn test_strip_root_attributes_keeps_allow_list_only() {
        let stripped = strip_root_attributes(NAMESPACED).unwrap();
        assert!(!stripped.contains("xmlns"));
        assert!(!stripped.contains("schemaLocation"));
        assert!(stripped.contains(r#"type="static""#));
        assert!(stripped.contains(r#"mediaPresentationDuration="PT10S""#));
        assert!(stripped.contains(r#"<AdaptationSet contentType="video"/>"#));
    }

    #[test]
    fn test_parse_document_builds_tree() {
        let root = parse_document(&strip_root_attributes(NAMESPACED).unwrap()).unwrap();
        assert_eq!(root.name, "MPD");
        assert_eq!(root.attr("type"), Some("static"));
        let set = root.child("Period").unwrap().child("AdaptationSet").unwrap();
        assert_eq!(set.attr("contentType"), Some("video"));
    }

    #[test]
    fn test_parse_document_reads_text_and_entities() {
        let root = parse_document("<MPD><BaseURL> a&amp;b/ </BaseURL></MPD>").unwrap();
        assert_eq!(root.child("BaseURL").unwrap().text(), "a&b/");
    }

    #[test]
    fn test_malformed_xml_is_invalid_manifest() {
        let result = parse_document("<MPD><Period></MPD>");
        assert!(matches!(result, Err(ResolveError::InvalidManifest { .. })));
    }

    #[test]
    fn test_required_attr_names_element() {
        let root = parse_document("<MPD><Period/></MPD>").unwrap();
        let err = root.child("Period").unwrap().required_attr("id").unwrap_err();
        assert!(err.to_string().contains("<Period>"));
    }

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT10S"), Some(10.0));
        assert_eq!(parse_iso8601_duration("PT1H2M3.5S"), Some(3723.5));
        assert_eq!(parse_iso8601_duration("P1DT1S"), Some(86_401.0));
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration("10S"), None);
        assert_eq!(parse_iso8601_duration("PT5X"), None);
    }
}
