use regex::Regex;
use std::sync::LazyLock;

/// Whole-token forms accepted as a group id: `BIA-1`, `BIA01`, `BIA 1`.
/// A hyphen followed by stray spaces (`BIB- 07`) is tolerated as well since
/// hand-typed schedule cells produce it.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^BI([AB])(?:-\s*|\s+)?(\d{1,2})$").expect("token regex"));

/// Same shape as [`TOKEN_RE`] but searched inside free text.
static TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bBI([AB])(?:-\s*|\s+)?(\d{1,2})\b").expect("text regex"));

static CANONICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^BI[AB]-\d{2}$").expect("canonical regex"));

fn canonical(division: &str, number: &str) -> String {
    format!("BI{}-{:0>2}", division, number)
}

/// Canonicalizes one raw token into `BI[A|B]-NN`, or `None` when the token is
/// not a group id at all (professor names, room labels, ...).
pub fn normalize_group_id(raw: &str) -> Option<String> {
    let t = raw.trim().to_ascii_uppercase();
    let caps = TOKEN_RE.captures(&t)?;
    Some(canonical(&caps[1], &caps[2]))
}

pub fn is_canonical(id: &str) -> bool {
    CANONICAL_RE.is_match(id)
}

/// Every group id mentioned anywhere in `text`, canonicalized, in order of
/// appearance (duplicates kept; callers dedupe).
pub fn find_group_ids(text: &str) -> Vec<String> {
    let upper = text.to_ascii_uppercase();
    TEXT_RE
        .captures_iter(&upper)
        .map(|caps| canonical(&caps[1], &caps[2]))
        .collect()
}

/// Division letter of a canonical id.
pub fn division_of(id: &str) -> Option<char> {
    match id.as_bytes().get(2) {
        Some(b'A') if id.starts_with("BI") => Some('A'),
        Some(b'B') if id.starts_with("BI") => Some('B'),
        _ => None,
    }
}
