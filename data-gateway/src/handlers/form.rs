//! `application/x-www-form-urlencoded` decoding into store documents.

use crate::error::FormError;
use axum::http::{header, HeaderMap};
use mongodb::bson::{Bson, Document};
use std::collections::HashMap;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const STORE_ID_FIELD: &str = "_id";

/// Form fields in first-appearance order, each with every value it was given.
pub type FormFields = Vec<(String, Vec<String>)>;

/// Collect the fields of a form submission: body values first, then values
/// from the URL query string.
///
/// A request that declares a content type other than a URL-encoded form is
/// rejected; one without a content type is decoded as a form.
pub fn parse_form(
    headers: &HeaderMap,
    body: &[u8],
    query: Option<&str>,
) -> Result<FormFields, FormError> {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        let raw = content_type.to_str().unwrap_or_default();
        let media_type = raw.split(';').next().unwrap_or_default().trim();
        if !media_type.eq_ignore_ascii_case(FORM_CONTENT_TYPE) {
            return Err(FormError::UnsupportedContentType(raw.to_string()));
        }
    }

    let body = std::str::from_utf8(body).map_err(|_| FormError::InvalidUtf8)?;

    let mut fields = FormFields::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for source in [Some(body), query].into_iter().flatten() {
        for (key, value) in decode_pairs(source)? {
            match index.get(&key) {
                Some(&at) => fields[at].1.push(value),
                None => {
                    index.insert(key.clone(), fields.len());
                    fields.push((key, vec![value]));
                }
            }
        }
    }
    Ok(fields)
}

/// Build a document from form fields. A single value is stored as a string,
/// a repeated field as an array of strings. An `_id` field is dropped: the
/// store assigns identifiers, and they define which document is latest.
pub fn form_to_document(fields: FormFields) -> Document {
    let mut document = Document::new();
    for (key, mut values) in fields {
        if key == STORE_ID_FIELD {
            continue;
        }
        let value = if values.len() == 1 {
            Bson::String(values.remove(0))
        } else {
            Bson::Array(values.into_iter().map(Bson::String).collect())
        };
        document.insert(key, value);
    }
    document
}

fn decode_pairs(input: &str) -> Result<Vec<(String, String)>, FormError> {
    if input.contains(';') {
        return Err(FormError::Semicolon);
    }
    check_escapes(input)?;
    Ok(serde_urlencoded::from_str(input)?)
}

fn check_escapes(input: &str) -> Result<(), FormError> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            match escape {
                Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => i += 3,
                _ => {
                    let end = (i + 3).min(bytes.len());
                    return Err(FormError::InvalidEscape(
                        String::from_utf8_lossy(&bytes[i..end]).into_owned(),
                    ));
                }
            }
        } else {
            i += 1;
        }
    }
    Ok(())
}
