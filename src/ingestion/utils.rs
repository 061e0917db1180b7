//! Utility functions for common text, number and unit operations

use crate::ingestion::types::PostedAt;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Odometer conversion factor used across all sources
pub const MILES_TO_KM: f64 = 1.6;

pub fn miles_to_km(miles: f64) -> f64 {
    miles * MILES_TO_KM
}

/// Parse the first number embedded in free text.
/// "150,000 KM" -> 150000, "AED 45,500" -> 45500, "5 doors" -> 5
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let digits: String = cleaned[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let value = digits.trim_end_matches('.').parse::<f64>().ok()?;
    // "-1500" style values would otherwise lose their sign silently
    if cleaned[..start].trim_end().ends_with('-') {
        return None;
    }
    Some(value)
}

/// Odometer text with an optional unit: "62,000 Miles", "150,000 KM", "85000".
/// Miles are converted to kilometers; a unit with no number yields `None`.
pub fn parse_odometer(text: &str) -> Option<f64> {
    let value = parse_number(text)?;
    if text.to_lowercase().contains("mile") {
        Some(miles_to_km(value))
    } else {
        Some(value)
    }
}

/// Python-style title casing: first letter of every alphabetic run upper,
/// the rest lower. "land-rover" -> "Land-Rover", "BMW" -> "Bmw"
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Drop a trailing unit word: "4 doors" -> "4", "8+ Seater" -> "8+"
pub fn strip_unit_word(value: &str, word: &str) -> String {
    let trimmed = value.trim();
    let lower = trimmed.to_lowercase();
    let word = word.to_lowercase();
    if !lower.ends_with(&word) {
        return trimmed.to_string();
    }
    // Lowercasing can change byte lengths outside ASCII
    trimmed
        .get(..trimmed.len().saturating_sub(word.len()))
        .map(|head| head.trim().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Recover the display form of a lowercased or hyphenated make/model
/// using the listing title.
///
/// 1. A title token equal to the raw value ignoring case wins ("bmw" -> "BMW").
/// 2. A hyphenated raw value found as a phrase in the title takes the
///    title's spelling ("land-cruiser" -> "Land Cruiser").
/// 3. Otherwise hyphens become spaces and the result is title-cased.
/// 4. Anything else is returned unchanged.
pub fn recover_token(raw: &str, title: &str) -> String {
    let raw = raw.trim();
    let lowered = raw.to_lowercase();

    if let Some(token) = title
        .split_whitespace()
        .find(|token| token.to_lowercase() == lowered)
    {
        return token.to_string();
    }

    if raw.contains('-') {
        let phrase = lowered.replace('-', " ");
        let words: Vec<&str> = phrase.split_whitespace().collect();
        let tokens: Vec<&str> = title.split_whitespace().collect();
        if !words.is_empty() {
            // Match whole tokens so the result never splits a character
            if let Some(window) = tokens.windows(words.len()).find(|window| {
                window
                    .iter()
                    .zip(&words)
                    .all(|(token, word)| token.to_lowercase() == *word)
            }) {
                return window.join(" ");
            }
        }
        return title_case(&phrase);
    }

    raw.to_string()
}

/// Convert unix seconds (possibly fractional, e.g. "1714559400.0")
pub fn posted_from_unix(seconds: &str) -> PostedAt {
    seconds
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .and_then(|s| DateTime::from_timestamp(s as i64, 0))
        .map(|dt| PostedAt::Known(dt.naive_utc()))
        .unwrap_or(PostedAt::Unknown)
}

/// Timestamp in any of the layouts the scraped sources emit.
/// A bare date is read as midnight.
pub fn parse_datetime_loose(text: &str) -> Option<NaiveDateTime> {
    const LAYOUTS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .or_else(|| {
            ["%Y-%m-%d", "%d/%m/%Y"]
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(text, layout).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a Python literal dump (single quotes, None/True/False) as JSON
pub fn parse_python_literal(text: &str) -> Option<serde_json::Value> {
    let mut json = String::with_capacity(text.len());
    let mut word = String::new();
    let mut chars = text.chars();

    let flush = |word: &mut String, json: &mut String| {
        match word.as_str() {
            "None" => json.push_str("null"),
            "True" => json.push_str("true"),
            "False" => json.push_str("false"),
            other => json.push_str(other),
        }
        word.clear();
    };

    while let Some(ch) = chars.next() {
        if ch == '\'' || ch == '"' {
            flush(&mut word, &mut json);
            json.push('"');
            while let Some(c) = chars.next() {
                match c {
                    c if c == ch => break,
                    '\\' => match chars.next() {
                        Some('\'') => json.push('\''),
                        Some(escaped) => {
                            json.push('\\');
                            json.push(escaped);
                        }
                        None => return None,
                    },
                    '"' => json.push_str("\\\""),
                    c => json.push(c),
                }
            }
            json.push('"');
        } else if ch.is_alphanumeric() || matches!(ch, '_' | '.' | '-' | '+') {
            word.push(ch);
        } else {
            flush(&mut word, &mut json);
            json.push(ch);
        }
    }
    flush(&mut word, &mut json);

    serde_json::from_str(&json).ok()
}
