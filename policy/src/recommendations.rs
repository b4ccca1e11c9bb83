//! Recommendation extraction from free-text assessments
//!
//! The advisory service is asked to end its answer with an `ACTIONS:`
//! section of up to three enumerated lines. This is a text heuristic; keep
//! it behind these two functions.

use crate::constants::{ACTIONS_MARKER, FALLBACK_RECOMMENDATIONS, MAX_RECOMMENDATIONS};

/// Pull up to three action items from the `ACTIONS:` section of `text`.
///
/// The marker match is case-insensitive. Only lines starting with a number
/// followed by `.` or `)`, or with a `-`, `*` or `•` bullet are taken; the
/// enumeration is stripped.
pub fn extract_recommendations(text: &str) -> Vec<String> {
    let mut recs = Vec::new();
    let mut in_actions = false;

    for line in text.lines() {
        if line.to_uppercase().contains(ACTIONS_MARKER) {
            in_actions = true;
            continue;
        }

        if !in_actions {
            continue;
        }

        if let Some(item) = strip_enumeration(line.trim()) {
            recs.push(item.to_string());
            if recs.len() == MAX_RECOMMENDATIONS {
                break;
            }
        }
    }

    recs
}

/// Extracted recommendations, or the fixed fallback list when none parse.
pub fn recommendations_or_fallback(text: &str) -> Vec<String> {
    let recs = extract_recommendations(text);
    if recs.is_empty() {
        FALLBACK_RECOMMENDATIONS
            .iter()
            .map(|r| r.to_string())
            .collect()
    } else {
        recs
    }
}

fn strip_enumeration(line: &str) -> Option<&str> {
    let rest = if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        // `**Note:**` is Markdown emphasis, not a bullet
        if rest.starts_with('*') {
            return None;
        }
        rest
    } else {
        let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return None;
        }
        line[digits..].strip_prefix(['.', ')'])?
    };

    let item = rest.trim_start_matches(['-', '•', ' ', '\t']).trim();
    if item.is_empty() { None } else { Some(item) }
}
