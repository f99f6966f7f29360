use std::sync::LazyLock;

use regex::Regex;
use url::Url;

// Set code (2-5 uppercase/digits) + dash + collector number, e.g. OGN-045, SFD-R12a
static EXTERNAL_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9])([A-Z][A-Z0-9]{1,4}-[A-Za-z]*\d[A-Za-z0-9]*)").unwrap()
});

/// Card id embedded in the image file name. Falls back to the whole URL for
/// image proxies that carry the file name in a query parameter.
pub fn external_id(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let file = path.rsplit('/').next().unwrap_or(path);

    find_id(file)
        .or_else(|| find_id(&src.replace("%2F", "/").replace("%2f", "/")))
        .unwrap_or_default()
}

fn find_id(s: &str) -> Option<String> {
    EXTERNAL_ID_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Absolute form of `src`. Unresolvable input is returned unchanged.
pub fn resolve(base: Option<&Url>, src: &str) -> String {
    let src = src.trim();
    if src.is_empty() {
        return String::new();
    }
    match Url::parse(src) {
        Ok(url) => url.into(),
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .and_then(|b| b.join(src).ok())
            .map(String::from)
            .unwrap_or_else(|| src.to_string()),
        Err(_) => src.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_file_name() {
        assert_eq!(external_id("https://cdn.example.com/cards/OGN-045.png"), "OGN-045");
        assert_eq!(external_id("/img/OGN-045a-full.webp?w=400"), "OGN-045a");
        assert_eq!(external_id("card_SFD-R12.jpg"), "SFD-R12");
    }

    #[test]
    fn id_from_proxy_query() {
        assert_eq!(
            external_id("/_next/image?url=%2Fcards%2FOGN-101.png&w=640"),
            "OGN-101"
        );
    }

    #[test]
    fn no_id() {
        assert_eq!(external_id("https://cdn.example.com/logo.png"), "");
        assert_eq!(external_id(""), "");
        assert_eq!(external_id("/img/hero-banner.png"), "");
    }

    #[test]
    fn resolves_relative() {
        let base = Url::parse("https://riftbound.leagueoflegends.com/en-us/tcg-cards/").unwrap();
        assert_eq!(
            resolve(Some(&base), "/images/OGN-045.png"),
            "https://riftbound.leagueoflegends.com/images/OGN-045.png"
        );
        assert_eq!(
            resolve(Some(&base), "//cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(
            resolve(Some(&base), "https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn relative_without_base_is_kept() {
        assert_eq!(resolve(None, "images/a.png"), "images/a.png");
        assert_eq!(resolve(None, ""), "");
    }
}
