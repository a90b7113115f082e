use regex::Regex;
use std::sync::LazyLock;

static ISSUE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("issue reference pattern is valid"));

/// Extract `#<digits>` issue references from free text, in order of
/// appearance. Duplicates are kept; nothing is validated here.
pub fn extract_issue_refs(text: Option<&str>) -> Vec<u64> {
    let Some(text) = text else {
        return Vec::new();
    };
    ISSUE_REF
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .collect()
}
