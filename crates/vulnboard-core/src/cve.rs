//! CVE identifier helpers and display-name selection
//!
//! Used ahead of the store to give a record a canonical CVE id and a readable
//! name. The store and project never parse free text themselves.

use regex::Regex;
use std::sync::OnceLock;

const UNKNOWN_NAME: &str = "Unknown Vulnerability";
const MAX_NAME_CHARS: usize = 80;

/// Strict form: the whole string is a CVE id
fn cve_regex() -> &'static Regex {
    static CVE_RE: OnceLock<Regex> = OnceLock::new();
    CVE_RE.get_or_init(|| Regex::new(r"(?i)^CVE-\d{4}-\d{4,}$").unwrap())
}

/// Loose form: a CVE id somewhere inside text
fn cve_search_regex() -> &'static Regex {
    static CVE_SEARCH_RE: OnceLock<Regex> = OnceLock::new();
    CVE_SEARCH_RE.get_or_init(|| Regex::new(r"(?i)\b(CVE-\d{4}-\d{4,})\b").unwrap())
}

fn noise_prefix_regex() -> &'static Regex {
    static PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    PREFIX_RE.get_or_init(|| {
        Regex::new(r"(?i)^(vulnerability|vuln|issue|finding|security|exploit)\s*:?\s*").unwrap()
    })
}

fn noise_suffix_regex() -> &'static Regex {
    static SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
    SUFFIX_RE.get_or_init(|| Regex::new(r"(?i)\s*(vulnerability|vuln|issue|finding)\s*$").unwrap())
}

fn bare_id_regex() -> &'static Regex {
    static BARE_ID_RE: OnceLock<Regex> = OnceLock::new();
    BARE_ID_RE.get_or_init(|| Regex::new(r"^[A-Z0-9_-]+$").unwrap())
}

/// True when `value` is exactly `CVE-YYYY-NNNN...` (case-insensitive)
pub fn is_valid_cve_id(value: &str) -> bool {
    cve_regex().is_match(value.trim())
}

/// Upper-cased CVE id, or `None` if `value` is not one
pub fn normalize_cve_id(value: &str) -> Option<String> {
    is_valid_cve_id(value).then(|| value.trim().to_uppercase())
}

/// First CVE id mentioned in `text`
pub fn extract_cve_id(text: &str) -> Option<String> {
    cve_search_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| normalize_cve_id(m.as_str()))
}

/// CVE id to store: the explicit one if valid, else one found in the name,
/// else one found in the description
pub fn determine_cve_id(
    cve_id: Option<&str>,
    name: Option<&str>,
    description: Option<&str>,
) -> Option<String> {
    cve_id
        .and_then(normalize_cve_id)
        .or_else(|| name.and_then(extract_cve_id))
        .or_else(|| description.and_then(extract_cve_id))
}

/// Readable name derived from free text, with the target appended when the
/// text does not already mention it
pub fn generate_descriptive_name(description: Option<&str>, target: Option<&str>) -> String {
    let Some(text) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return UNKNOWN_NAME.to_string();
    };

    let cleaned = noise_prefix_regex().replace(text, "");
    let cleaned = noise_suffix_regex().replace(&cleaned, "").into_owned();

    let mut name = if cleaned.chars().count() > MAX_NAME_CHARS {
        let truncated: String = cleaned.chars().take(MAX_NAME_CHARS - 3).collect();
        format!("{}...", truncated)
    } else {
        cleaned
    };

    if let Some(first) = name.chars().next() {
        let upper: String = first.to_uppercase().collect();
        name.replace_range(..first.len_utf8(), &upper);
    }

    if name.is_empty() {
        return UNKNOWN_NAME.to_string();
    }

    if let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) {
        if !name.to_lowercase().contains(&target.to_lowercase()) {
            name.push_str(&format!(" ({})", target));
        }
    }

    name
}

/// Best display name: a CVE id when one is available, otherwise a cleaned-up
/// version of the name or description
pub fn determine_best_name(
    cve_id: Option<&str>,
    name: Option<&str>,
    description: Option<&str>,
    target: Option<&str>,
) -> String {
    if let Some(cve) = determine_cve_id(cve_id, name, description) {
        return cve;
    }

    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) if !bare_id_regex().is_match(n) => generate_descriptive_name(Some(n), target),
        _ => generate_descriptive_name(description, target),
    }
}
