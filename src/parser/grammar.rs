use std::sync::LazyLock;

use regex::Regex;

use super::labels::Labeled;

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.(\s+|$)").unwrap());

/// Tokens whose period does not end a name (`Dr. Mundo`).
const ABBREVIATIONS: &[&str] = &[
    "Dr", "Mr", "Mrs", "Ms", "Mt", "St", "Jr", "Sr", "Lt", "Sgt", "Capt", "Gen", "Prof", "vs",
];

/// Alt-text conventions seen on the card gallery. Detected per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// `Ashe Color: Blue. Type: Unit.`
    LabelFirst,
    /// `Ashe. Color: Blue. Type: Unit.`, optionally with a sentence of
    /// description between the name and the first label.
    NameThenPeriod,
    /// No recognized label at all.
    Unlabeled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading<'a> {
    pub grammar: Grammar,
    pub name: &'a str,
    pub description: &'a str,
}

pub fn detect(labeled: &Labeled) -> Grammar {
    if !labeled.has_labels() {
        Grammar::Unlabeled
    } else if sentence_end(labeled.prefix.trim()).is_some() {
        Grammar::NameThenPeriod
    } else {
        Grammar::LabelFirst
    }
}

/// Name and leftover description from the text preceding the first label.
pub fn heading<'a>(labeled: &Labeled<'a>) -> Heading<'a> {
    let grammar = detect(labeled);
    let prefix = labeled.prefix.trim();

    let (name, description) = match grammar {
        Grammar::Unlabeled => ("", ""),
        Grammar::LabelFirst => (prefix, ""),
        Grammar::NameThenPeriod => match sentence_end(prefix) {
            Some((start, end)) => (prefix[..start].trim(), prefix[end..].trim()),
            None => (prefix, ""),
        },
    };

    Heading {
        grammar,
        name,
        description,
    }
}

/// Byte span of the first period that ends a sentence. A period closing the
/// whole prefix always counts; an inner one only when the word before it is
/// not an abbreviation or an initial.
fn sentence_end(prefix: &str) -> Option<(usize, usize)> {
    SENTENCE_END_RE
        .find_iter(prefix)
        .find(|m| m.end() == prefix.len() || !is_abbreviation(last_word(&prefix[..m.start()])))
        .map(|m| (m.start(), m.end()))
}

fn last_word(text: &str) -> &str {
    text.rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric())
}

fn is_abbreviation(word: &str) -> bool {
    let mut chars = word.chars();
    let initial = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase());
    initial || ABBREVIATIONS.contains(&word)
}
