//! Restricted element/attribute allow-list SVG sanitizer (spec.md §4.12).
//!
//! An external compiler is an untrusted process from this pipeline's point
//! of view; its SVG output is re-parsed and re-emitted through an allow-list
//! rather than passed through verbatim, so a compromised or buggy compiler
//! cannot smuggle a `<script>`, an event handler attribute, or an external
//! reference into a published document.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

const ALLOWED_ELEMENTS: &[&str] = &[
    "svg", "g", "path", "circle", "rect", "line", "polyline", "polygon", "text", "tspan", "defs",
    "marker", "ellipse",
];

const ALLOWED_ATTRIBUTES: &[&str] = &[
    "d", "x", "y", "cx", "cy", "r", "rx", "ry", "width", "height", "x1", "y1", "x2", "y2",
    "points", "fill", "stroke", "stroke-width", "stroke-linecap", "stroke-linejoin", "transform",
    "viewBox", "xmlns", "id", "font-size", "font-family", "text-anchor", "markerWidth",
    "markerHeight", "refX", "refY", "orient", "opacity",
];

#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    #[error("malformed SVG at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
}

/// Re-parse `raw_svg` and re-emit only allow-listed elements/attributes.
/// A disallowed element is dropped along with its subtree; a disallowed
/// attribute is dropped but its element is kept.
pub fn sanitize_svg(raw_svg: &str) -> Result<String, SanitizeError> {
    let mut reader = Reader::from_str(raw_svg);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;
    let mut writer = Writer::new(Vec::new());
    let mut skip_depth: u32 = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|err| SanitizeError::Malformed {
            position: reader.buffer_position() as usize,
            reason: err.to_string(),
        })?;

        match event {
            Event::Eof => break,
            Event::Start(start) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                    continue;
                }
                if !is_allowed_element(&start) {
                    skip_depth = 1;
                    continue;
                }
                let filtered = filter_attributes(&start);
                writer.write_event(Event::Start(filtered)).ok();
            }
            Event::Empty(start) => {
                if skip_depth > 0 {
                    continue;
                }
                if !is_allowed_element(&start) {
                    continue;
                }
                let filtered = filter_attributes(&start);
                writer.write_event(Event::Empty(filtered)).ok();
            }
            Event::End(end) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                writer.write_event(Event::End(end)).ok();
            }
            Event::Text(text) => {
                if skip_depth == 0 {
                    writer.write_event(Event::Text(text)).ok();
                }
            }
            // Comments, processing instructions, DOCTYPEs, and CDATA carry no
            // renderable content a downstream viewer needs; drop them all.
            _ => {}
        }
    }

    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|err| SanitizeError::Malformed {
        position: 0,
        reason: err.to_string(),
    })
}

fn is_allowed_element(start: &BytesStart) -> bool {
    let name = start.name();
    let local = local_name(name.as_ref());
    ALLOWED_ELEMENTS.contains(&local)
}

fn filter_attributes<'a>(start: &BytesStart<'a>) -> BytesStart<'a> {
    let name = start.name();
    let mut filtered = BytesStart::new(String::from_utf8_lossy(name.as_ref()).into_owned());
    for attr in start.attributes().flatten() {
        let key = local_name(attr.key.as_ref());
        if !is_allowed_attribute(key) {
            continue;
        }
        if let Ok(value) = attr.unescape_value() {
            filtered.push_attribute((key, value.as_ref()));
        }
    }
    filtered
}

fn is_allowed_attribute(key: &str) -> bool {
    ALLOWED_ATTRIBUTES.contains(&key)
}

/// Strip any namespace prefix (`xlink:href` -> `href`) before matching
/// against the allow-list; namespaced attributes never appear in it, so
/// `xlink:href` (an external reference vector) is rejected either way.
fn local_name(raw: &[u8]) -> &str {
    let s = std::str::from_utf8(raw).unwrap_or("");
    s.rsplit(':').next().unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_allow_listed_shapes_and_attributes() {
        let svg = r#"<svg viewBox="0 0 10 10"><circle cx="5" cy="5" r="4" fill="#000"/></svg>"#;
        let out = sanitize_svg(svg).unwrap();
        assert!(out.contains("circle"));
        assert!(out.contains("cx=\"5\""));
    }

    #[test]
    fn drops_script_elements_entirely() {
        let svg = r#"<svg><script>alert(1)</script><rect x="0" y="0" width="1" height="1"/></svg>"#;
        let out = sanitize_svg(svg).unwrap();
        assert!(!out.contains("script"));
        assert!(out.contains("rect"));
    }

    #[test]
    fn drops_event_handler_and_href_attributes_but_keeps_the_element() {
        let svg = r#"<svg><rect onclick="evil()" xlink:href="http://evil" x="0" y="0" width="1" height="1"/></svg>"#;
        let out = sanitize_svg(svg).unwrap();
        assert!(!out.contains("onclick"));
        assert!(!out.contains("href"));
        assert!(out.contains("rect"));
    }

    #[test]
    fn malformed_xml_is_reported_as_an_error() {
        let err = sanitize_svg("<svg><rect></svg>").unwrap_err();
        assert!(matches!(err, SanitizeError::Malformed { .. }));
    }
}
