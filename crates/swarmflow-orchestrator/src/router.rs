//! Fallback intent routing used when no dispatcher capability is
//! installed.

const RESEARCHER_KEYWORDS: &[&str] = &["research", "find", "search", "scrape"];
const COMPLIANCE_KEYWORDS: &[&str] = &["compliance", "legal", "gdpr", "policy"];
const WORKER_KEYWORDS: &[&str] = &["form", "fill", "submit", "login"];

/// Pick the capability name for an intent by keyword match.
///
/// Case-insensitive and total: every intent maps to some agent, with
/// `"worker"` as the catch-all. Deterministic for a given intent.
pub fn select_agent(intent: &str) -> &'static str {
    let lowered = intent.to_lowercase();

    if RESEARCHER_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return "researcher";
    }
    if COMPLIANCE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return "compliance";
    }
    if WORKER_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return "worker";
    }
    "worker"
}
