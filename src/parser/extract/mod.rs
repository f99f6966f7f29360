pub mod colors;
pub mod source;
pub mod tags;

use url::Url;

use super::grammar;
use super::labels::{self, Label};
use crate::collector::RawElement;
use crate::store::CardRecord;

/// Turns one collected image into a card record. Never fails: every field
/// has an empty or placeholder value when its segment is missing.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    base: Option<Url>,
}

impl Extractor {
    /// `base` is the page the images were collected from; relative image
    /// sources are resolved against it.
    pub fn new(base: Option<Url>) -> Self {
        Extractor { base }
    }

    pub fn extract(&self, raw: &RawElement, position: usize) -> CardRecord {
        let labeled = labels::split_labels(&raw.alt_text);
        let heading = grammar::heading(&labeled);

        let name = if heading.name.is_empty() {
            placeholder_name(position)
        } else {
            heading.name.to_string()
        };

        let color_raw = labeled.get(Label::Color).unwrap_or("");
        let how_to_play = labeled
            .get(Label::HowToPlay)
            .unwrap_or(heading.description);

        CardRecord {
            id: position,
            external_id: source::external_id(&raw.source_url),
            name,
            image_url: source::resolve(self.base.as_ref(), &raw.source_url),
            raw_text: raw.alt_text.clone(),
            colors: colors::parse(color_raw),
            color_raw: color_raw.to_string(),
            card_type: field(&labeled, Label::Type),
            supertype: field(&labeled, Label::Super),
            rarity: field(&labeled, Label::Rarity),
            tags: tags::parse(labeled.get(Label::Tags).unwrap_or("")),
            how_to_play: how_to_play.to_string(),
        }
    }
}

pub fn placeholder_name(position: usize) -> String {
    format!("Unknown Card {}", position)
}

fn field(labeled: &labels::Labeled, label: Label) -> String {
    labeled.get(label).unwrap_or("").to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Color;

    fn raw(src: &str, alt: &str) -> RawElement {
        RawElement {
            source_url: src.to_string(),
            alt_text: alt.to_string(),
            document_index: 0,
        }
    }

    fn assert_label_fields_empty(c: &CardRecord) {
        assert!(c.colors.is_empty());
        assert_eq!(c.color_raw, "");
        assert_eq!(c.card_type, "");
        assert_eq!(c.supertype, "");
        assert_eq!(c.rarity, "");
        assert!(c.tags.is_empty());
        assert_eq!(c.how_to_play, "");
    }

    #[test]
    fn ashe_end_to_end() {
        let alt = "Ashe. Color: Blue, Purple. Type: Unit. Super: Champion. Rarity: Rare. Tags: None. How to play this card: Deal damage.";
        let c = Extractor::default().extract(&raw("https://cdn.example.com/cards/OGN-045.png", alt), 1);

        assert_eq!(c.id, 1);
        assert_eq!(c.name, "Ashe");
        assert_eq!(c.colors, vec![Color::Blue, Color::Purple]);
        assert_eq!(c.color_raw, "Blue, Purple");
        assert_eq!(c.card_type, "Unit");
        assert_eq!(c.supertype, "Champion");
        assert_eq!(c.rarity, "Rare");
        assert!(c.tags.is_empty());
        assert_eq!(c.how_to_play, "Deal damage.");
        assert_eq!(c.external_id, "OGN-045");
        assert_eq!(c.image_url, "https://cdn.example.com/cards/OGN-045.png");
        assert_eq!(c.raw_text, alt);
    }

    #[test]
    fn label_first_grammar() {
        let c = Extractor::default().extract(
            &raw("OGN-001.png", "Jinx Color: Red, Orange. Type: Unit. Tags: Zaun, Gunner."),
            3,
        );
        assert_eq!(c.name, "Jinx");
        assert_eq!(c.colors, vec![Color::Red, Color::Orange]);
        assert_eq!(c.tags, vec!["Zaun", "Gunner"]);
        assert_eq!(c.how_to_play, "");
    }

    #[test]
    fn tags_dragon_pirate() {
        let c = Extractor::default().extract(&raw("", "X. Color: Red. Tags: Dragon, Pirate."), 1);
        assert_eq!(c.tags, vec!["Dragon".to_string(), "Pirate".to_string()]);
    }

    #[test]
    fn missing_tags_label_is_empty() {
        let c = Extractor::default().extract(&raw("", "X. Color: Red. Type: Spell."), 1);
        assert!(c.tags.is_empty());
    }

    #[test]
    fn unlabeled_inputs_degrade_to_placeholder() {
        let inputs = [
            "",
            "   ",
            "Card back",
            "Fury Blade. Strike twice this turn.",
            "color: red. type: unit.",
            "....",
            "Colour: Blue",
        ];
        for (i, alt) in inputs.iter().enumerate() {
            let c = Extractor::default().extract(&raw("", alt), i + 1);
            assert_eq!(c.name, format!("Unknown Card {}", i + 1), "input {:?}", alt);
            assert_label_fields_empty(&c);
            assert_eq!(c.raw_text, *alt);
        }
    }

    #[test]
    fn labels_without_name_get_placeholder() {
        let c = Extractor::default().extract(&raw("", "Color: Green. Type: Gear."), 7);
        assert_eq!(c.name, "Unknown Card 7");
        assert_eq!(c.colors, vec![Color::Green]);
        assert_eq!(c.card_type, "Gear");
    }

    #[test]
    fn description_fills_how_to_play_when_label_missing() {
        let c = Extractor::default().extract(
            &raw("", "Fury Blade. Strike twice this turn. Color: Red. Type: Spell."),
            1,
        );
        assert_eq!(c.name, "Fury Blade");
        assert_eq!(c.how_to_play, "Strike twice this turn.");
    }

    #[test]
    fn abbreviated_name_is_kept_whole() {
        let e = Extractor::default();

        let c = e.extract(&raw("", "Dr. Mundo Color: Purple. Type: Unit."), 1);
        assert_eq!(c.name, "Dr. Mundo");
        assert_eq!(c.how_to_play, "");

        let c = e.extract(&raw("", "Dr. Mundo. Color: Purple. Type: Unit."), 1);
        assert_eq!(c.name, "Dr. Mundo");
        assert_eq!(c.how_to_play, "");

        let c = e.extract(
            &raw(
                "",
                "Dr. Mundo. Color: Purple. Type: Unit. Super: Champion. Rarity: Epic. Tags: Zaun. How to play this card: Heal.",
            ),
            1,
        );
        assert_eq!(c.name, "Dr. Mundo");
        assert_eq!(c.colors, vec![Color::Purple]);
        assert_eq!(c.tags, vec!["Zaun"]);
        assert_eq!(c.how_to_play, "Heal.");
    }

    #[test]
    fn one_bad_segment_does_not_block_others() {
        let c = Extractor::default().extract(
            &raw("", "Teemo. Color: Chartreuse. Type: Unit. Rarity: Epic."),
            1,
        );
        assert!(c.colors.is_empty());
        assert_eq!(c.color_raw, "Chartreuse");
        assert_eq!(c.card_type, "Unit");
        assert_eq!(c.rarity, "Epic");
    }

    #[test]
    fn resolves_against_base() {
        let base = Url::parse("https://riftbound.leagueoflegends.com/en-us/tcg-cards/").ok();
        let c = Extractor::new(base).extract(&raw("/cards/OGN-010.png", "A. Color: Red."), 1);
        assert_eq!(
            c.image_url,
            "https://riftbound.leagueoflegends.com/cards/OGN-010.png"
        );
        assert_eq!(c.external_id, "OGN-010");
    }
}
