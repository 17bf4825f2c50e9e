use crate::{UrlError, UrlResult};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::{ParseError, Url};

/// Characters left unescaped in a path
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b':')
    .remove(b'@')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Characters left unescaped in a query string
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'&')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'/')
    .remove(b'?');

/// Characters left unescaped in a fragment
const FRAGMENT_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b':')
    .remove(b'@')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'/')
    .remove(b'?');

/// Normalizes a URL according to Site-Harvest's normalization rules
///
/// # Normalization Steps
///
/// 1. Strip control characters, spaces and invisible Unicode marks
///    (zero-width characters, bidi overrides, BOM)
/// 2. If no `http://` or `https://` prefix is present, strip leading slashes
///    and prepend `https://`
/// 3. Parse; the scheme and host are lower-cased by the parser
/// 4. Reject the URL if it has no host
/// 5. Percent-encode path, query and fragment independently, decoding
///    first so existing escapes are never doubled
/// 6. Drop an empty query (`?`) or empty fragment (`#`)
///
/// The result is stable: normalizing a normalized URL returns it unchanged.
///
/// # Arguments
///
/// * `raw` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - The input could not be parsed or has no host
///
/// # Examples
///
/// ```
/// use site_harvest::url::normalize_url;
///
/// let url = normalize_url("example.com/caf\u{e9}").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/caf%C3%A9");
/// ```
pub fn normalize_url(raw: &str) -> UrlResult<Url> {
    let cleaned = strip_invisible(raw);

    let with_scheme = if has_http_scheme(&cleaned) {
        cleaned
    } else {
        format!("https://{}", cleaned.trim_start_matches('/'))
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| match e {
        ParseError::EmptyHost => UrlError::MissingHost(raw.to_string()),
        other => UrlError::Parse(format!("{:?}: {}", raw, other)),
    })?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    let path = reencode(url.path(), PATH_SAFE);
    url.set_path(&path);

    let query = url.query().map(|q| reencode(q, QUERY_SAFE));
    url.set_query(query.as_deref().filter(|q| !q.is_empty()));

    let fragment = url.fragment().map(|f| reencode(f, FRAGMENT_SAFE));
    url.set_fragment(fragment.as_deref().filter(|f| !f.is_empty()));

    Ok(url)
}

/// Removes control characters, spaces and invisible Unicode marks
///
/// Browser engines and HTTP clients disagree on how to treat these, so they
/// are dropped before any URL reaches the network.
pub fn strip_invisible(raw: &str) -> String {
    raw.chars().filter(|c| !is_invisible(*c)).collect()
}

fn is_invisible(c: char) -> bool {
    c.is_control()
        || c == ' '
        || matches!(
            c,
            '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
        )
}

fn has_http_scheme(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Decodes a URL component and encodes it again with the given safe set
fn reencode(component: &str, safe: &'static AsciiSet) -> String {
    let decoded = percent_decode_str(component).decode_utf8_lossy();
    utf8_percent_encode(&decoded, safe).to_string()
}
