//! Public URL construction.
//!
//! The public viewer serves one page per record at `{base}/m/{id}`, with an
//! optional `?t={token}` query parameter. The same string is the QR code
//! payload and the NFC tag payload.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

/// Path prefix of record pages on the viewer site.
pub const RECORD_PATH: &str = "/m/";

/// Query parameter carrying the access token.
pub const TOKEN_PARAM: &str = "t";

/// Placeholder used in NFC command templates.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Characters left intact, matching JavaScript's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single URL component.
#[must_use]
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Build the public URL of a record.
///
/// Trailing slashes are trimmed from `base_url`; the token query parameter is
/// only present when `token` is non-empty.
#[must_use]
pub fn build_public_url(base_url: &str, id: &str, token: &str) -> String {
    let mut url = format!(
        "{}{RECORD_PATH}{}",
        base_url.trim_end_matches('/'),
        encode_component(id)
    );
    if !token.is_empty() {
        url.push('?');
        url.push_str(TOKEN_PARAM);
        url.push('=');
        url.push_str(&encode_component(token));
    }
    url
}

/// Normalize a base URL typed by the operator.
///
/// Trims surrounding whitespace and trailing slashes, and prepends `https://`
/// when no `http://` or `https://` scheme is present.
#[must_use]
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Render the companion NFC-writing command for a public URL.
#[must_use]
pub fn render_nfc_command(template: &str, public_url: &str) -> String {
    template.replace(URL_PLACEHOLDER, public_url)
}

/// Everything the share view displays for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    /// Record id the payload was derived from.
    pub id: String,
    /// Full public URL.
    pub public_url: String,
    /// Text to encode in a QR code.
    pub qr_payload: String,
    /// Shell command writing the URL to an NFC tag.
    pub nfc_command: String,
}

impl SharePayload {
    /// Derive the share payload for a record.
    #[must_use]
    pub fn new(base_url: &str, id: &str, token: &str, nfc_template: &str) -> Self {
        let public_url = build_public_url(base_url, id, token);
        Self {
            id: id.to_string(),
            qr_payload: public_url.clone(),
            nfc_command: render_nfc_command(nfc_template, &public_url),
            public_url,
        }
    }
}
