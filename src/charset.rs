// Charset detection and transcoding for response bodies
//
// The calculator has been seen answering with ISO-8859-1 documents, so the
// body cannot be handed to the XML reader as UTF-8 directly.

use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::debug;

use crate::xml_response::DecodeError;

/// Decodes a raw body into a `String`.
///
/// The encoding is taken from, in order: a byte-order mark, the `encoding`
/// attribute of the XML declaration, the `charset` parameter of
/// `content_type`, and finally UTF-8.
pub fn transcode(body: &[u8], content_type: Option<&str>) -> Result<String, DecodeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::EmptyBody);
    }

    let (encoding, bom_len) = match Encoding::for_bom(body) {
        Some(found) => found,
        None => {
            let label = declared_encoding(body).or_else(|| content_type.and_then(charset_param));
            match label {
                Some(label) => (lookup(&label)?, 0),
                None => (UTF_8, 0),
            }
        }
    };

    debug!(encoding = encoding.name(), "Transcoding response body");

    encoding
        .decode_without_bom_handling_and_without_replacement(&body[bom_len..])
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            DecodeError::Malformed(format!("invalid byte sequence for {}", encoding.name()))
        })
}

fn lookup(label: &str) -> Result<&'static Encoding, DecodeError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| DecodeError::UnsupportedCharset(label.to_string()))
}

// Reads only the first event; anything past the declaration may still be in
// a non-UTF-8 encoding.
fn declared_encoding(body: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Decl(decl)) => {
                return match decl.encoding() {
                    Some(Ok(label)) => Some(String::from_utf8_lossy(&label).into_owned()),
                    _ => None,
                };
            }
            // Leading whitespace before the declaration
            Ok(Event::Text(text)) if text.iter().all(u8::is_ascii_whitespace) => {}
            _ => return None,
        }
        buf.clear();
    }
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}
