//! Image extraction from a static HTML snapshot.

use scraper::{Html, Selector};

use super::session::ImageAttrs;
#[cfg(test)]
use super::{session::Predicate, RawElement};

/// Attributes of every element matching `selector`, in document order.
pub fn images(html: &str, selector: &str) -> Vec<ImageAttrs> {
    let document = Html::parse_document(html);

    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return vec![],
    };

    document
        .select(&selector)
        .map(|el| {
            let attr = |name: &str| el.value().attr(name).unwrap_or("").to_string();
            let lazy_src = Some(attr("data-src"))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| attr("data-lazy-src"));
            ImageAttrs {
                src: attr("src"),
                lazy_src,
                alt: attr("alt"),
            }
        })
        .collect()
}

#[cfg(test)]
pub fn collect_images(html: &str, predicate: &Predicate) -> Vec<RawElement> {
    super::to_raw_elements(images(html, predicate.selector()), predicate)
}
