// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for GData Atom processing.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::AtomError;

/// XML namespaces used in GData contact feeds.
pub mod ns {
    /// Atom syndication namespace.
    pub const ATOM: &str = "http://www.w3.org/2005/Atom";

    /// Google Data common namespace.
    pub const GD: &str = "http://schemas.google.com/g/2005";

    /// Google contacts namespace.
    pub const GCONTACT: &str = "http://schemas.google.com/contact/2008";

    /// Google batch processing namespace.
    pub const BATCH: &str = "http://schemas.google.com/gdata/batch";

    /// `OpenSearch` pagination namespace.
    pub const OPENSEARCH: &str = "http://a9.com/-/spec/opensearch/1.1/";
}

/// Returns the value of the named attribute, unescaped, if present.
///
/// # Errors
///
/// Returns an error if the attribute value is not valid XML or UTF-8.
pub fn attr(start: &BytesStart<'_>, name: &str) -> Result<Option<String>, AtomError> {
    match start.try_get_attribute(name) {
        Ok(Some(a)) => {
            let raw = std::str::from_utf8(&a.value)
                .map_err(|e| AtomError::Xml(format!("UTF-8 error: {e}")))?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|e| AtomError::Xml(e.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(AtomError::Xml(e.to_string())),
    }
}

/// Reads the text content of the element whose start event was just consumed.
///
/// Stops at the matching end element. Nested elements are skipped, their
/// text is not collected.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn read_text<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    end: &[u8],
) -> Result<String, AtomError> {
    let mut text = String::new();
    let mut depth = 1;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(ref e) => {
                depth -= 1;
                if depth == 0 && e.name().as_ref() == end {
                    break;
                }
            }
            Event::Text(e) => {
                if depth == 1 {
                    text.push_str(e.unescape()?.as_ref());
                }
            }
            Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Captures an element and everything below it as a raw XML fragment.
///
/// Used to preserve elements this crate does not model, so they can be
/// re-emitted verbatim when the record is uploaded.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn capture_element<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<String, AtomError> {
    let mut fragment = String::new();
    push_start(&mut fragment, start, empty)?;
    if empty {
        return Ok(fragment);
    }

    let name = start.name().as_ref().to_vec();
    let mut depth = 1;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                depth += 1;
                push_start(&mut fragment, e, false)?;
            }
            Event::Empty(ref e) => push_start(&mut fragment, e, true)?,
            Event::End(ref e) => {
                depth -= 1;
                let end_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if depth == 0 {
                    if e.name().as_ref() == name.as_slice() {
                        fragment.push_str(&format!("</{end_name}>"));
                        break;
                    }
                    return Err(AtomError::Xml(format!("mismatched end tag {end_name}")));
                }
                fragment.push_str(&format!("</{end_name}>"));
            }
            Event::Text(ref e) => {
                // Keep the raw escaped form so the fragment stays valid XML.
                fragment.push_str(&String::from_utf8_lossy(e));
            }
            Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(fragment)
}

fn push_start(
    fragment: &mut String,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<(), AtomError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    fragment.push('<');
    fragment.push_str(&name);
    for a in start.attributes() {
        let a = a.map_err(|e| AtomError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
        // The raw value keeps its entities, but a single-quoted source
        // attribute may hold literal quotes that the double-quoted
        // reconstruction has to escape.
        let value = String::from_utf8_lossy(&a.value).replace('"', "&quot;");
        fragment.push_str(&format!(" {key}=\"{value}\""));
    }
    if empty {
        fragment.push_str("/>");
    } else {
        fragment.push('>');
    }
    Ok(())
}

/// Skips an element and everything below it.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn skip_element<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    end: &[u8],
) -> Result<(), AtomError> {
    let mut depth = 1;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(ref e) => {
                depth -= 1;
                if depth == 0 && e.name().as_ref() == end {
                    break;
                }
            }
            Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}
