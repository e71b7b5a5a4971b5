//! XML parsing stage.
//!
//! The fetched body is checked for well-formedness before any conversion is
//! attempted. A parser error is a failure, never a partial success.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::KmlError;

/// A well-formed KML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmlDocument {
    text: String,
    placemarks: usize,
}

impl KmlDocument {
    /// Raw document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of `<Placemark>` elements in the document.
    pub fn placemarks(&self) -> usize {
        self.placemarks
    }
}

/// Parses `text` as XML and checks that the root element is `<kml>`.
pub fn parse_document(text: impl Into<String>) -> Result<KmlDocument, KmlError> {
    let text = text.into();
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut depth: usize = 0;
    let mut root: Option<String> = None;
    let mut placemarks = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if depth == 0 {
                    if root.is_some() {
                        return Err(KmlError::Parse("multiple root elements".to_string()));
                    }
                    root = Some(name.clone());
                }
                if name == "Placemark" {
                    placemarks += 1;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err(KmlError::Parse("multiple root elements".to_string()));
                    }
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(_)) if depth == 0 => {
                return Err(KmlError::Parse("text outside the root element".to_string()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(KmlError::Parse(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if depth != 0 {
        return Err(KmlError::Parse(format!(
            "document ended with {} unclosed element(s)",
            depth
        )));
    }

    match root.as_deref() {
        Some("kml") => Ok(KmlDocument { text, placemarks }),
        Some(other) => Err(KmlError::Parse(format!(
            "root element is <{}>, expected <kml>",
            other
        ))),
        None => Err(KmlError::Parse("no root element".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark><name>A</name></Placemark>
    <Placemark><name>B</name></Placemark>
  </Document>
</kml>"#;

    #[test]
    fn test_valid_document() {
        let doc = parse_document(VALID).unwrap();
        assert_eq!(doc.placemarks(), 2);
        assert_eq!(doc.text(), VALID);
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let result = parse_document("<kml><Document></Folder></kml>");
        assert!(matches!(result, Err(KmlError::Parse(_))));
    }

    #[test]
    fn test_unclosed_elements_fail() {
        let result = parse_document("<kml><Document>");
        assert!(matches!(result, Err(KmlError::Parse(_))));
    }

    #[test]
    fn test_non_kml_root_fails() {
        let result = parse_document("<html><body>Not found</body></html>");
        assert!(matches!(result, Err(KmlError::Parse(msg)) if msg.contains("<html>")));
    }

    #[test]
    fn test_plain_text_fails() {
        assert!(parse_document("404 page not found").is_err());
    }

    #[test]
    fn test_empty_kml_root_is_well_formed() {
        assert_eq!(parse_document("<kml/>").unwrap().placemarks(), 0);
    }
}
