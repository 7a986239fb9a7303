//! `application/x-www-form-urlencoded` parsing and re-encoding

use url::form_urlencoded;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Decode a urlencoded body into ordered key/value pairs.
///
/// `+` is read as a space; malformed escapes are kept as written.
pub fn parse_form(body: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}

/// Serialize pairs back into a urlencoded body, spaces written as `+`
pub fn encode_form(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
