/// Leading host labels that do not change which site is served
const HOST_PREFIXES: &[&str] = &["www.", "m."];

/// Trailing path pieces that do not change which page is served
const PATH_SUFFIXES: &[&str] = &["/en/", "/"];

/// Directory index pages; only a whole final path segment counts
const INDEX_PAGES: &[&str] = &["index.html", "index.htm"];

/// Reduces a URL to the part that identifies its destination
///
/// # Normalization Steps
///
/// 1. Drop the query string and fragment
/// 2. Drop the scheme, then any leading `www.` / `m.` labels
/// 3. Strip a trailing `/en/`, trailing slash, or `index.html` / `index.htm`
///    segment (its slash goes on the next pass)
///
/// Steps 2 and 3 repeat until nothing more comes off, so the result is a
/// fixpoint: `essence(essence(u)) == essence(u)`.
///
/// # Examples
///
/// ```
/// use https_parity::url::essence;
///
/// assert_eq!(essence("https://www.example.com/en/"), "example.com");
/// assert_eq!(essence("http://m.example.com/index.html?ref=1"), "example.com");
/// assert_eq!(essence("https://shop.example.com/"), "shop.example.com");
/// ```
pub fn essence(url: &str) -> String {
    let mut rest = match url.find(|c| c == '?' || c == '#') {
        Some(end) => &url[..end],
        None => url,
    };

    loop {
        let before = rest.len();
        rest = strip_scheme(rest);
        for prefix in HOST_PREFIXES {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
            }
        }
        if rest.len() == before {
            break;
        }
    }

    loop {
        let before = rest.len();
        if let Some(stripped) = strip_path_suffix(rest) {
            rest = stripped;
        }
        if rest.len() == before {
            break;
        }
    }

    rest.to_string()
}

fn strip_path_suffix(path: &str) -> Option<&str> {
    PATH_SUFFIXES
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix))
        .or_else(|| {
            INDEX_PAGES
                .iter()
                .filter_map(|page| path.strip_suffix(page))
                .find(|dir| dir.ends_with('/'))
        })
}

/// Removes a leading `scheme://` if the text before `://` is a valid scheme
fn strip_scheme(url: &str) -> &str {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url;
    };

    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    if valid {
        rest
    } else {
        url
    }
}
