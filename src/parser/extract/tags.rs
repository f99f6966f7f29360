/// Comma-separated tag list. A lone `None` means no tags.
pub fn parse(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    if tags.len() == 1 && tags[0].eq_ignore_ascii_case("none") {
        tags.clear();
    }
    tags
}
