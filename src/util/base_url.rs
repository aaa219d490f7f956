use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors produced while validating the storefront API base URL.
#[derive(Error, Debug)]
pub enum BaseUrlError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP pointed at a non-loopback host.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    Insecure,
    /// The URL cannot carry path segments (e.g. `mailto:`), or carries a query/fragment.
    #[error("Base URL must be a plain hierarchical URL without query or fragment")]
    NotHierarchical,
}

/// Validates the base URL every API path is appended to.
///
/// The bearer token travels with wishlist and cart requests, so plain HTTP is
/// only accepted for loopback hosts (`localhost`, `127.0.0.1`, `::1`), which
/// is what local mock servers use.
///
/// # Examples
///
/// ```
/// use storefront_wishlist::util::validate_base_url;
///
/// assert!(validate_base_url("https://shop.example.com/api").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:5000/api").is_ok());
/// assert!(validate_base_url("http://shop.example.com/api").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, BaseUrlError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !is_loopback_host(&url) {
                tracing::error!(base_url = %url, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                return Err(BaseUrlError::Insecure);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS API base URL (localhost only)");
        }
        scheme => return Err(BaseUrlError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.cannot_be_a_base() || url.query().is_some() || url.fragment().is_some() {
        return Err(BaseUrlError::NotHierarchical);
    }

    Ok(url)
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    host_for_parse
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}

/// Appends `segments` to `base` as individually percent-encoded path segments.
///
/// Product ids are opaque, so an id such as `a/b` must stay a single segment.
pub fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
