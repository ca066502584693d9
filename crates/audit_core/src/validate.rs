use thiserror::Error;
use url::Url;

/// Why a submitted URL was rejected before any request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a URL")]
    Empty,
    #[error("Please enter a valid URL")]
    Malformed,
}

/// Parse `input` as an absolute URL with a scheme and an authority.
pub fn validate_url(input: &str) -> Result<Url, ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    let url = Url::parse(input).map_err(|_| ValidationError::Malformed)?;
    if url.cannot_be_a_base() || !url.has_host() {
        return Err(ValidationError::Malformed);
    }
    Ok(url)
}

pub fn is_valid_url(input: &str) -> bool {
    validate_url(input).is_ok()
}

/// Hostname of `url` without a leading `www.`.
///
/// Falls back to the input itself when it does not parse, or to `"Unknown"`
/// when the input is empty.
pub fn display_name(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(ToOwned::to_owned));
    match host {
        Some(host) => host
            .strip_prefix("www.")
            .map(ToOwned::to_owned)
            .unwrap_or(host),
        None if url.is_empty() => "Unknown".to_string(),
        None => url.to_string(),
    }
}
