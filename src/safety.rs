use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// ── Blocklist data ──────────────────────────────────────────────────────────
//
// Kept as one flat table so the tests can sweep it directly. Matching is
// plain lowercase substring containment, same as the pattern checks below:
// "award" is caught by "war". That over-reach is accepted — this filter
// gates advertising topics, and a false positive only costs a candidate.

/// Terms that disqualify a trend topic outright (checked as substrings of the
/// lowercased text).
pub const BLOCKED_TERMS: &[&str] = &[
    // Violence & crime
    "war", "violence", "shooting", "murder", "kill", "death", "died", "dead",
    "suicide", "bomb", "explosion", "attack", "terrorism", "terrorist",
    "assault", "abuse", "rape", "kidnap", "torture", "weapon", "gun", "knife",
    "blood", "stabbing", "beaten",
    // Politics & public figures
    "politics", "election", "trump", "biden", "republican", "democrat",
    "vote", "protest", "scandal", "controversy", "impeach", "coup", "fraud",
    "corruption",
    // Disasters & health crises
    "tragedy", "disaster", "crash", "accident", "fire", "flood", "hurricane",
    "earthquake", "pandemic", "covid", "virus", "disease", "illness",
    "hospital", "emergency",
    // Sexual & discriminatory content
    "sexual", "porn", "nude", "naked", "sex", "inappropriate", "offensive",
    "racist", "discrimination", "hate", "extremist", "radical", "banned",
    "illegal", "drugs",
    // News alerts & legal process
    "breaking", "urgent", "alert", "warning", "crisis", "investigation",
    "arrest", "charged", "guilty", "sentence", "prison", "jail", "court",
    "lawsuit", "trial",
    // Minors & distress
    "child", "minor", "kid", "baby", "infant", "teen", "student", "school",
    "young", "victim", "injured", "hurt", "pain", "suffering", "sad",
    "depression", "anxiety",
];

// Word-boundary patterns, matched against the lowercased text. These catch
// whole-word forms the substring table would otherwise need many entries for.
const DANGER_PATTERN_SOURCES: &[&str] = &[
    r"\b(kill|killed|killing|murder|death|died|dead)\b",
    r"\b(rape|sexual|abuse|molest)\b",
    r"\b(trump|biden|putin|president|senator)\b",
    r"\b(shooting|shooter|bomb|attack|weapon|gun)\b",
    r"\b(child|children|kid|kids|minor|teen|infant)\b",
    r"\b(crash|accident|tragedy|disaster)\b",
];

// Structural shapes of news headlines, which skew negative and are never
// usable as ad topics regardless of vocabulary.
const NEWS_PATTERN_SOURCES: &[&str] = &[
    r"(?i)^\w+ (says|reports|confirms|denies|announces)",
    r"- [A-Z][a-z]+, [A-Z]{2}",
    r"(?i)(investigation|incident|reports|breaking|urgent)",
    r"(?i)(arrested|charged|guilty|sentenced)",
    r"(?i)\d+ (killed|injured|dead|hurt)",
];

static DANGER_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile_all(DANGER_PATTERN_SOURCES));
static NEWS_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile_all(NEWS_PATTERN_SOURCES));

fn compile_all(sources: &[&str]) -> Vec<Regex> {
    sources.iter().filter_map(|s| Regex::new(s).ok()).collect()
}

// ── Sensitivity check ───────────────────────────────────────────────────────

/// Whether a trend topic is unsafe for advertising use.
///
/// Pure and total: no I/O, never panics. Fails closed — if the compiled
/// pattern tables are ever incomplete, everything is reported unsafe rather
/// than letting unchecked text through.
pub fn is_unsafe(text: &str) -> bool {
    if DANGER_PATTERNS.len() != DANGER_PATTERN_SOURCES.len()
        || NEWS_PATTERNS.len() != NEWS_PATTERN_SOURCES.len()
    {
        return true;
    }

    let lower = text.to_lowercase();

    if let Some(term) = BLOCKED_TERMS.iter().find(|t| lower.contains(**t)) {
        debug!("Blocked term '{}' in topic: {}", term, text);
        return true;
    }

    if DANGER_PATTERNS.iter().any(|p| p.is_match(&lower)) {
        debug!("Danger pattern match in topic: {}", text);
        return true;
    }

    // News-style phrasing is checked on the original casing — the dateline
    // and "X says ..." shapes depend on it.
    if looks_like_news(text) {
        debug!("News-style topic rejected: {}", text);
        return true;
    }

    false
}

/// Whether a topic reads like a news headline (dateline, attribution verb,
/// casualty count). Used both inside [`is_unsafe`] and as a structural
/// pre-filter on raw source output.
pub fn looks_like_news(topic: &str) -> bool {
    NEWS_PATTERNS.len() == NEWS_PATTERN_SOURCES.len()
        && NEWS_PATTERNS.iter().any(|p| p.is_match(topic))
}

// ── Topic cleaning ──────────────────────────────────────────────────────────

static NON_TOPIC_CHARS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").ok());
static WHITESPACE_RUNS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s+").ok());

/// Normalize a trend title for template substitution: strip everything that
/// is not a word character, whitespace, or hyphen; collapse whitespace;
/// lowercase.
pub fn clean_topic(text: &str) -> String {
    let stripped = match NON_TOPIC_CHARS.as_ref() {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    let collapsed = match WHITESPACE_RUNS.as_ref() {
        Some(re) => re.replace_all(&stripped, " ").into_owned(),
        None => stripped,
    };
    collapsed.trim().to_lowercase()
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_blocked_term_is_flagged() {
        for term in BLOCKED_TERMS {
            assert!(is_unsafe(term), "term '{}' not flagged", term);
            // Case-insensitive and embedded in a sentence
            let upper = format!("Latest {} update", term.to_uppercase());
            assert!(is_unsafe(&upper), "'{}' not flagged in context", upper);
        }
    }

    #[test]
    fn danger_patterns_catch_whole_words() {
        assert!(is_unsafe("Senator X killed in attack"));
        assert!(is_unsafe("local man dead after incident"));
        assert!(is_unsafe("president visits factory"));
        assert!(is_unsafe("new teen fashion line"));
    }

    #[test]
    fn news_shapes_are_flagged() {
        assert!(is_unsafe("Company says profits doubled"));
        assert!(is_unsafe("Witness reports strange lights"));
        assert!(is_unsafe("Storm damage - Austin, TX"));
        assert!(is_unsafe("3 injured at festival"));
        assert!(looks_like_news("Mayor announces new park"));
    }

    #[test]
    fn substring_matching_is_intentionally_broad() {
        // "award" contains "war" — the filter prefers false positives.
        assert!(is_unsafe("Local bakery wins award"));
    }

    #[test]
    fn benign_topics_pass() {
        for topic in [
            "Sustainable coffee brewing tips",
            "Cozy home decor",
            "Garden planning",
            "Photography techniques",
            "Ice cream flavors",
        ] {
            assert!(!is_unsafe(topic), "'{}' wrongly flagged", topic);
        }
    }

    #[test]
    fn empty_string_is_safe() {
        assert!(!is_unsafe(""));
    }

    #[test]
    fn clean_topic_strips_and_lowercases() {
        assert_eq!(
            clean_topic("  Coffee: Brewing & Tips!!  "),
            "coffee brewing tips"
        );
        assert_eq!(clean_topic("Well-Known   Brands"), "well-known brands");
        assert_eq!(clean_topic("@#$%"), "");
    }

    #[test]
    fn cleaning_never_unblocks_a_topic() {
        // Cleaning only removes punctuation; a blocked topic stays blocked.
        let topic = "K.I.L.L. switch trends"; // dots removed -> "kill switch trends"
        assert!(is_unsafe(&clean_topic(topic)));
    }
}
