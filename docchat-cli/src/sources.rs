//! Formatting of cited sources for display.

/// Sources listed before the remainder is collapsed into "and N more".
pub const MAX_LISTED_SOURCES: usize = 3;

/// One-line summary of the cited sources, e.g.
/// `"a.md, b.md, c.md and 2 more"`. Empty when there are no sources.
pub fn sources_summary(sources: &[String]) -> String {
    let listed = sources.iter().take(MAX_LISTED_SOURCES).map(String::as_str).collect::<Vec<_>>();
    let mut summary = listed.join(", ");
    if sources.len() > MAX_LISTED_SOURCES {
        summary.push_str(&format!(" and {} more", sources.len() - MAX_LISTED_SOURCES));
    }
    summary
}

/// Numbered list of sources, one per line.
pub fn sources_listing(sources: &[String]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| format!("  {}. {source}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("doc{i}.md")).collect()
    }

    #[test]
    fn summary_collapses_after_three() {
        assert_eq!(sources_summary(&[]), "");
        assert_eq!(sources_summary(&names(2)), "doc1.md, doc2.md");
        assert_eq!(sources_summary(&names(3)), "doc1.md, doc2.md, doc3.md");
        assert_eq!(sources_summary(&names(5)), "doc1.md, doc2.md, doc3.md and 2 more");
    }

    #[test]
    fn listing_is_numbered() {
        assert_eq!(sources_listing(&names(2)), "  1. doc1.md\n  2. doc2.md");
    }
}
