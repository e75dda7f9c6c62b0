// Helper functions for the command layer

use strsim::jaro_winkler;

use crate::error::{LibraryError, Result};

/// Resolves a user-typed time block against the keys present in the library
/// using exact match, substring match, or fuzzy matching.
/// Returns the canonical key or an error with suggestions.
pub fn resolve_group_key<S: AsRef<str>>(keys: &[S], input: &str) -> Result<String> {
    let keys: Vec<&str> = keys.iter().map(|k| k.as_ref()).collect();
    if keys.is_empty() {
        return Err(validation("No time blocks found in the prompt library".to_string()));
    }

    // Strategy 1: exact match
    if let Some(key) = keys.iter().find(|k| **k == input) {
        return Ok(key.to_string());
    }

    let input_lower = input.trim().to_lowercase();
    if input_lower.is_empty() {
        return Err(validation("Time block must not be empty".to_string()));
    }

    // Strategy 2: case-insensitive equality, then substring
    if let Some(key) = keys.iter().find(|k| k.to_lowercase() == input_lower) {
        return Ok(key.to_string());
    }
    let substring: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|k| k.to_lowercase().contains(&input_lower))
        .collect();
    match substring.len() {
        1 => return Ok(substring[0].to_string()),
        n if n > 1 => {
            return Err(validation(format!(
                "Ambiguous time block '{}'. Multiple matches: {}",
                input,
                substring.join(", ")
            )));
        }
        _ => {}
    }

    // Strategy 3: fuzzy matching with Jaro-Winkler
    let scored: Vec<(&str, f64)> = keys
        .iter()
        .map(|k| (*k, jaro_winkler(&k.to_lowercase(), &input_lower)))
        .collect();
    let best_score = scored.iter().map(|(_, s)| *s).fold(0.0, f64::max);

    if best_score > 0.8 {
        let high_matches: Vec<&str> = scored
            .iter()
            .filter(|(_, s)| (s - best_score).abs() < 0.000001)
            .map(|(k, _)| *k)
            .collect();
        if high_matches.len() == 1 {
            tracing::debug!(
                "Resolved '{}' to '{}' (score {:.3})",
                input,
                high_matches[0],
                best_score
            );
            return Ok(high_matches[0].to_string());
        }
        return Err(validation(format!(
            "Ambiguous fuzzy matches for '{}'. Suggestions: {}",
            input,
            high_matches.join(", ")
        )));
    }

    Err(validation(format!(
        "No time block found matching '{}'. Available time blocks: {}",
        input,
        keys.join(", ")
    )))
}

fn validation(message: String) -> LibraryError {
    LibraryError::Validation { message }
}

/// Shortens long text for table cells.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}
