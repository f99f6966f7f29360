use std::sync::LazyLock;

use regex::Regex;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Color|Type|Super|Tags|Rarity|How to play this card):").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Color,
    Type,
    Super,
    Tags,
    Rarity,
    HowToPlay,
}

impl Label {
    fn from_token(token: &str) -> Option<Label> {
        match token {
            "Color" => Some(Label::Color),
            "Type" => Some(Label::Type),
            "Super" => Some(Label::Super),
            "Tags" => Some(Label::Tags),
            "Rarity" => Some(Label::Rarity),
            "How to play this card" => Some(Label::HowToPlay),
            _ => None,
        }
    }

    /// Rules text keeps its own sentences, so it only stops at another label.
    fn stops_at_period(self) -> bool {
        !matches!(self, Label::HowToPlay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub label: Label,
    pub value: &'a str,
}

/// Alt text split into the free text before the first label and one segment
/// per recognized label (first occurrence wins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labeled<'a> {
    pub prefix: &'a str,
    pub segments: Vec<Segment<'a>>,
}

impl<'a> Labeled<'a> {
    pub fn get(&self, label: Label) -> Option<&'a str> {
        self.segments
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.value)
    }

    pub fn has_labels(&self) -> bool {
        !self.segments.is_empty()
    }
}

pub fn split_labels(alt: &str) -> Labeled<'_> {
    // (label, match start, value start) for every label occurrence, in text order
    let hits: Vec<(Label, usize, usize)> = LABEL_RE
        .captures_iter(alt)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = Label::from_token(caps.get(1)?.as_str())?;
            Some((label, whole.start(), whole.end()))
        })
        .collect();

    let prefix_end = hits.first().map(|h| h.1).unwrap_or(alt.len());
    let mut segments: Vec<Segment> = Vec::new();

    for (i, &(label, _, value_start)) in hits.iter().enumerate() {
        if segments.iter().any(|s| s.label == label) {
            continue;
        }
        let next_label = hits.get(i + 1).map(|h| h.1).unwrap_or(alt.len());
        let window = &alt[value_start..next_label];
        let value = if label.stops_at_period() {
            window.split('.').next().unwrap_or(window)
        } else {
            window
        };
        segments.push(Segment {
            label,
            value: value.trim(),
        });
    }

    Labeled {
        prefix: &alt[..prefix_end],
        segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_full_label_list() {
        let alt = "Ashe. Color: Blue, Purple. Type: Unit. Super: Champion. Rarity: Rare. Tags: None. How to play this card: Deal damage.";
        let l = split_labels(alt);
        assert_eq!(l.prefix, "Ashe. ");
        assert_eq!(l.get(Label::Color), Some("Blue, Purple"));
        assert_eq!(l.get(Label::Type), Some("Unit"));
        assert_eq!(l.get(Label::Super), Some("Champion"));
        assert_eq!(l.get(Label::Rarity), Some("Rare"));
        assert_eq!(l.get(Label::Tags), Some("None"));
        assert_eq!(l.get(Label::HowToPlay), Some("Deal damage."));
    }

    #[test]
    fn value_stops_at_next_label_without_period() {
        let l = split_labels("Jinx Color: Red Type: Unit");
        assert_eq!(l.prefix, "Jinx ");
        assert_eq!(l.get(Label::Color), Some("Red"));
        assert_eq!(l.get(Label::Type), Some("Unit"));
    }

    #[test]
    fn labels_in_any_order() {
        let l = split_labels("Rarity: Epic. How to play this card: Draw 2. Then discard. Color: Green.");
        assert_eq!(l.prefix, "");
        assert_eq!(l.get(Label::Rarity), Some("Epic"));
        assert_eq!(l.get(Label::HowToPlay), Some("Draw 2. Then discard."));
        assert_eq!(l.get(Label::Color), Some("Green"));
    }

    #[test]
    fn first_occurrence_wins() {
        let l = split_labels("X Color: Red. Color: Blue.");
        assert_eq!(l.get(Label::Color), Some("Red"));
        assert_eq!(l.segments.len(), 1);
    }

    #[test]
    fn no_labels() {
        let l = split_labels("Just a picture of a dragon.");
        assert!(!l.has_labels());
        assert_eq!(l.prefix, "Just a picture of a dragon.");
    }

    #[test]
    fn empty_value() {
        let l = split_labels("Teemo Color:. Type: Unit.");
        assert_eq!(l.get(Label::Color), Some(""));
        assert_eq!(l.get(Label::Type), Some("Unit"));
    }
}
