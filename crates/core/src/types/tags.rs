//! Store tag helpers.

/// Tags offered as checkboxes on the store form.
pub const STORE_TAG_CHOICES: &[&str] = &[
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

/// Trim tags, drop empty ones, and remove duplicates while keeping the first
/// occurrence's position.
///
/// Each store carries a *set* of tags, so a tag counts at most once per store
/// when tags are aggregated.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_owned());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags_dedupes_and_trims() {
        let tags = normalize_tags(["Wifi", " Open Late ", "", "Wifi", "Licensed"]);
        assert_eq!(tags, ["Wifi", "Open Late", "Licensed"]);
    }

    #[test]
    fn test_normalize_tags_is_case_sensitive() {
        let tags = normalize_tags(["wifi", "Wifi"]);
        assert_eq!(tags.len(), 2);
    }
}
