pub mod extract;
pub mod grammar;
pub mod labels;

use rayon::prelude::*;

use crate::collector::RawElement;
use crate::store::CardRecord;
pub use extract::Extractor;

/// Three-pass pipeline per element: alt text → labeled segments → grammar →
/// card record. Elements are independent, so the batch runs on rayon.
/// Output is in document order with ids 1..=n.
pub fn extract_all(raws: &[RawElement], extractor: &Extractor) -> Vec<CardRecord> {
    let mut ordered: Vec<&RawElement> = raws.iter().collect();
    ordered.sort_by_key(|r| r.document_index);

    ordered
        .par_iter()
        .enumerate()
        .map(|(i, raw)| extractor.extract(raw, i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::html::collect_images;
    use crate::collector::session::Predicate;
    use crate::store::Color;
    use url::Url;

    #[test]
    fn ids_follow_document_order() {
        let raws: Vec<RawElement> = [(2, "C. Color: Red."), (0, "A. Color: Blue."), (1, "")]
            .into_iter()
            .map(|(idx, alt)| RawElement {
                source_url: String::new(),
                alt_text: alt.to_string(),
                document_index: idx,
            })
            .collect();

        let cards = extract_all(&raws, &Extractor::default());
        let summary: Vec<(usize, &str)> = cards.iter().map(|c| (c.id, c.name.as_str())).collect();
        assert_eq!(summary, vec![(1, "A"), (2, "Unknown Card 2"), (3, "C")]);
    }

    #[test]
    fn gallery_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/cards.html").unwrap();
        let raws = collect_images(&html, &Predicate::Primary);
        let base = Url::parse("https://riftbound.leagueoflegends.com/en-us/tcg-cards/").ok();
        let cards = extract_all(&raws, &Extractor::new(base));

        assert_eq!(cards.len(), 4);

        let ashe = &cards[0];
        assert_eq!(ashe.name, "Ashe");
        assert_eq!(ashe.external_id, "OGN-045");
        assert_eq!(ashe.colors, vec![Color::Blue, Color::Purple]);

        let jinx = &cards[1];
        assert_eq!(jinx.name, "Jinx");
        assert_eq!(jinx.tags, vec!["Zaun", "Gunner"]);
        assert!(jinx.image_url.starts_with("https://riftbound.leagueoflegends.com/"));

        // lazy image: data-src wins over the placeholder src
        let ahri = &cards[2];
        assert_eq!(ahri.external_id, "OGN-066");
        assert!(ahri.image_url.ends_with("OGN-066.png"));

        let kaisa = &cards[3];
        assert_eq!(kaisa.name, "Kai'Sa — Daughter of the Void");
        assert_eq!(kaisa.rarity, "Épique");
    }
}
