//! Upstream response normalization
//!
//! Converts an arbitrary model completion into exactly three non-empty
//! prose fields. Models routinely wrap the JSON in markdown fences, embed
//! it in prose, nest JSON inside field values, echo field names as plain
//! text, or return no JSON at all - each call walks an ordered chain of
//! extraction strategies (strict JSON → JSON substring → blank-line split →
//! raw fallback) and is total: it never fails and never yields an empty
//! field.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use silk_common::api::Interpretation;

/// Fallback prose substituted when a field is missing or too short
pub const FALLBACK_RESONANCE: &str = "The energy resonates with your question...";
pub const FALLBACK_WEAVING: &str =
    "The Oracle weaves its wisdom through the threads of fate...";
pub const FALLBACK_RITUAL: &str =
    "Take a moment of quiet reflection to connect with this guidance.";

/// Cleaned fields at least this long are kept; shorter ones are replaced
const MIN_FIELD_CHARS: usize = 10;

/// Unparsable text longer than this is split into positional chunks
const SPLIT_THRESHOLD_CHARS: usize = 100;

/// Current and legacy key names for each logical field
const RESONANCE_KEYS: [&str; 2] = ["resonance", "insight"];
const WEAVING_KEYS: [&str; 2] = ["weaving", "guidance"];
const RITUAL_KEYS: [&str; 2] = ["ritual", "practice"];

/// A JSON object substring carrying all three expected keys (either key scheme)
static JSON_OBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)\{.*?"(?:resonance|insight)".*?"(?:weaving|guidance)".*?"(?:ritual|practice)".*?\}"#,
    )
    .expect("valid regex")
});

/// Embedded `{"field": ...}` fragments inside a value
static EMBEDDED_FRAGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\{[^}]*"(?:resonance|weaving|ritual|insight|guidance|practice)"[^}]*\}"#)
        .expect("valid regex")
});

/// Quoted field-name-plus-colon prefixes, e.g. `"weaving": "`
static FIELD_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"(?:resonance|weaving|ritual|insight|guidance|practice)"\s*:\s*""#)
        .expect("valid regex")
});

/// Opening JSON debris up to the first field value
static OPENING_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^\s*\{.*?"(?:resonance|weaving|ritual|insight|guidance|practice)"\s*:\s*"?"#,
    )
    .expect("valid regex")
});

/// Trailing sibling fields, e.g. `", "ritual": "..."` to end of text
static TRAILING_FIELDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)"?\s*,\s*"(?:resonance|weaving|ritual|insight|guidance|practice)"\s*:\s*".*$"#,
    )
    .expect("valid regex")
});

/// Closing brace and anything after it
static CLOSING_BRACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)"?\s*\}.*$"#).expect("valid regex"));

/// Any remaining small brace block
static BRACE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("valid regex"));

/// The model echoing a field name as plain text, e.g. `resonance: ...`
static BARE_NAME_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:resonance|weaving|ritual|insight|guidance|practice)\s*:\s*")
        .expect("valid regex")
});

/// Blank-line boundaries used by the positional-chunk fallback
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").expect("valid regex"));

/// Normalize a raw model completion into three non-empty prose fields.
pub fn normalize(raw: &str) -> Interpretation {
    let content = strip_code_fences(raw);

    // Narrow to an embedded JSON object when the model wrapped it in prose
    let content = match JSON_OBJECT_RE.find(content) {
        Some(found) => found.as_str(),
        None => content,
    };

    match serde_json::from_str::<Value>(content.trim()) {
        Ok(Value::Object(map)) => {
            let resonance = resolve_field(&map, &RESONANCE_KEYS);
            let weaving = resolve_field(&map, &WEAVING_KEYS);
            let ritual = resolve_field(&map, &RITUAL_KEYS);

            if resonance.chars().count() > MIN_FIELD_CHARS {
                Interpretation {
                    resonance,
                    weaving: floor_or(weaving, FALLBACK_WEAVING),
                    ritual: floor_or(ritual, FALLBACK_RITUAL),
                }
            } else {
                // Parsed, but the primary field didn't survive cleaning
                raw_fallback(content)
            }
        }
        // Valid JSON but not an object - nothing to extract
        Ok(_) => raw_fallback(content),
        Err(_) => chunk_fallback(content),
    }
}

/// Keep a cleaned field only if it reaches the minimum length
fn floor_or(value: String, fallback: &str) -> String {
    if value.chars().count() >= MIN_FIELD_CHARS {
        value
    } else {
        fallback.to_string()
    }
}

/// Whole raw text as the primary field, fixed prose for the rest
fn raw_fallback(content: &str) -> Interpretation {
    Interpretation {
        resonance: non_empty_or(content, FALLBACK_RESONANCE),
        weaving: FALLBACK_WEAVING.to_string(),
        ritual: FALLBACK_RITUAL.to_string(),
    }
}

/// Unparsable text: long completions are split on blank lines into up to
/// three positional chunks; short ones become the primary field whole.
fn chunk_fallback(content: &str) -> Interpretation {
    let content = content.trim();
    if content.chars().count() <= SPLIT_THRESHOLD_CHARS {
        return raw_fallback(content);
    }

    let parts: Vec<&str> = BLANK_LINES_RE
        .split(content)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    let (resonance, weaving, ritual) = match parts.as_slice() {
        [first, second, third, ..] => {
            (first.to_string(), second.to_string(), third.to_string())
        }
        [first, second] => (
            first.to_string(),
            second.to_string(),
            FALLBACK_RITUAL.to_string(),
        ),
        // No paragraph structure - fall back to character thirds
        _ => char_thirds(content),
    };

    Interpretation {
        resonance: non_empty_or(&resonance, FALLBACK_RESONANCE),
        weaving: non_empty_or(&weaving, FALLBACK_WEAVING),
        ritual: non_empty_or(&ritual, FALLBACK_RITUAL),
    }
}

fn char_thirds(content: &str) -> (String, String, String) {
    let chars: Vec<char> = content.chars().collect();
    let third = chars.len() / 3;
    let take = |range: std::ops::Range<usize>| -> String {
        chars[range].iter().collect::<String>().trim().to_string()
    };
    (
        take(0..third),
        take(third..2 * third),
        take(2 * third..chars.len()),
    )
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Resolve one logical field from the parsed object, preferring the current
/// key name and falling back to the legacy one.
fn resolve_field(map: &serde_json::Map<String, Value>, keys: &[&str; 2]) -> String {
    for key in keys {
        match map.get(*key) {
            Some(Value::String(text)) => return clean_text(text, keys),
            Some(Value::Null) | None => continue,
            Some(nested) => {
                // Nested structure where prose was expected - unwrap it
                if let Some(text) = extract_nested(nested, keys) {
                    return clean_text(&text, keys);
                }
                return clean_text(&nested.to_string(), keys);
            }
        }
    }
    String::new()
}

/// Recursively search a nested value for the prose belonging to `keys`.
fn extract_nested(value: &Value, keys: &[&str; 2]) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => {
            for key in keys {
                if let Some(inner) = map.get(*key) {
                    if let Some(text) = extract_nested(inner, keys) {
                        return Some(text);
                    }
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| extract_nested(item, keys)),
        _ => None,
    }
}

/// Scrub JSON/markdown artifacts out of an extracted field value.
///
/// `keys` names the field being cleaned, so a nested blob carrying several
/// fields yields the right one.
fn clean_text(value: &str, keys: &[&str; 2]) -> String {
    let mut text = value.trim().to_string();

    // A value that is itself JSON gets unwrapped before scrubbing
    if text.starts_with('{') || text.starts_with('[') {
        if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
            let mut candidates = vec![keys];
            for other in [&RESONANCE_KEYS, &WEAVING_KEYS, &RITUAL_KEYS] {
                if other != keys {
                    candidates.push(other);
                }
            }
            for candidate in candidates {
                if let Some(inner) = extract_nested(&parsed, candidate) {
                    text = inner;
                    break;
                }
            }
        }
    }

    text = EMBEDDED_FRAGMENT_RE.replace_all(&text, "").into_owned();
    text = FIELD_PREFIX_RE.replace_all(&text, "").into_owned();
    text = OPENING_JSON_RE.replace(&text, "").into_owned();
    text = TRAILING_FIELDS_RE.replace(&text, "").into_owned();
    text = CLOSING_BRACE_RE.replace(&text, "").into_owned();

    text = text
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    text = text
        .replace("\\\"", "\"")
        .replace("\\n", "\n")
        .replace("\\t", "\t");

    text = BRACE_BLOCK_RE.replace_all(&text, "").into_owned();
    text = BARE_NAME_PREFIX_RE.replace(&text, "").into_owned();

    text.trim().to_string()
}

/// Strip surrounding markdown code-fence markers
fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let text = if let Some(rest) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
    {
        rest
    } else {
        text.strip_prefix("```").unwrap_or(text)
    };
    let text = text.trim_start();
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_RESONANCE: &str =
        "The Silk has felt your query and the threads begin to shimmer with meaning.";
    const LONG_WEAVING: &str =
        "The legend speaks of patience rewarded; your situation carries the same seed.";
    const LONG_RITUAL: &str =
        "Each morning this week, write down three things you are grateful for.";

    // Hand-built so the keys keep the order models actually emit them in
    // (serde_json sorts keys alphabetically, which would defeat the
    // substring-narrowing tests)
    fn well_formed() -> String {
        format!(
            "{{\"resonance\": \"{}\", \"weaving\": \"{}\", \"ritual\": \"{}\"}}",
            LONG_RESONANCE, LONG_WEAVING, LONG_RITUAL
        )
    }

    #[test]
    fn parses_well_formed_json() {
        let result = normalize(&well_formed());
        assert_eq!(result.resonance, LONG_RESONANCE);
        assert_eq!(result.weaving, LONG_WEAVING);
        assert_eq!(result.ritual, LONG_RITUAL);
    }

    #[test]
    fn strips_markdown_fences() {
        let fenced = format!("```json\n{}\n```", well_formed());
        let result = normalize(&fenced);
        assert_eq!(result.resonance, LONG_RESONANCE);
    }

    #[test]
    fn strips_bare_fences() {
        let fenced = format!("```\n{}\n```", well_formed());
        let result = normalize(&fenced);
        assert_eq!(result.ritual, LONG_RITUAL);
    }

    #[test]
    fn narrows_json_embedded_in_prose() {
        let wrapped = format!("Here is your reading:\n{}\nMay it serve you.", well_formed());
        let result = normalize(&wrapped);
        assert_eq!(result.resonance, LONG_RESONANCE);
        assert_eq!(result.weaving, LONG_WEAVING);
    }

    #[test]
    fn accepts_legacy_key_scheme() {
        let legacy = serde_json::json!({
            "insight": LONG_RESONANCE,
            "guidance": LONG_WEAVING,
            "practice": LONG_RITUAL,
        })
        .to_string();
        let result = normalize(&legacy);
        assert_eq!(result.resonance, LONG_RESONANCE);
        assert_eq!(result.weaving, LONG_WEAVING);
        assert_eq!(result.ritual, LONG_RITUAL);
    }

    #[test]
    fn current_keys_win_over_legacy() {
        let mixed = serde_json::json!({
            "resonance": LONG_RESONANCE,
            "insight": "an old duplicate that should lose",
            "weaving": LONG_WEAVING,
            "ritual": LONG_RITUAL,
        })
        .to_string();
        let result = normalize(&mixed);
        assert_eq!(result.resonance, LONG_RESONANCE);
    }

    #[test]
    fn missing_third_field_gets_fallback() {
        let partial = serde_json::json!({
            "insight": LONG_RESONANCE,
            "guidance": LONG_WEAVING,
        })
        .to_string();
        let result = normalize(&partial);
        assert_eq!(result.resonance, LONG_RESONANCE);
        assert_eq!(result.weaving, LONG_WEAVING);
        assert_eq!(result.ritual, FALLBACK_RITUAL);
    }

    #[test]
    fn short_secondary_fields_get_fallback_floor() {
        let short = serde_json::json!({
            "resonance": LONG_RESONANCE,
            "weaving": "Too short",
            "ritual": "Hm",
        })
        .to_string();
        let result = normalize(&short);
        assert_eq!(result.resonance, LONG_RESONANCE);
        assert_eq!(result.weaving, FALLBACK_WEAVING);
        assert_eq!(result.ritual, FALLBACK_RITUAL);
    }

    #[test]
    fn nested_json_string_value_is_unwrapped() {
        let nested_value = format!("{{\"resonance\": \"{}\"}}", LONG_RESONANCE);
        let nested = serde_json::json!({
            "resonance": nested_value,
            "weaving": LONG_WEAVING,
            "ritual": LONG_RITUAL,
        })
        .to_string();
        let result = normalize(&nested);
        assert_eq!(result.resonance, LONG_RESONANCE);
    }

    #[test]
    fn nested_json_object_value_is_unwrapped() {
        let nested = serde_json::json!({
            "resonance": { "resonance": LONG_RESONANCE },
            "weaving": LONG_WEAVING,
            "ritual": LONG_RITUAL,
        })
        .to_string();
        let result = normalize(&nested);
        assert_eq!(result.resonance, LONG_RESONANCE);
    }

    #[test]
    fn escaped_sequences_are_unescaped() {
        // The parsed value carries literal backslash-quote sequences
        // (double-escaped upstream output)
        let value = "The Silk whispers: \\\"listen closely\\\" to the thread of your days";
        let raw = serde_json::json!({
            "resonance": value,
            "weaving": LONG_WEAVING,
            "ritual": LONG_RITUAL,
        })
        .to_string();
        let result = normalize(&raw);
        assert!(
            result.resonance.contains("\"listen closely\""),
            "got: {}",
            result.resonance
        );
    }

    #[test]
    fn bare_field_name_echo_is_stripped() {
        let echoed = serde_json::json!({
            "resonance": format!("resonance: {}", LONG_RESONANCE),
            "weaving": LONG_WEAVING,
            "ritual": LONG_RITUAL,
        })
        .to_string();
        let result = normalize(&echoed);
        assert_eq!(result.resonance, LONG_RESONANCE);
    }

    #[test]
    fn long_prose_splits_on_blank_lines() {
        let prose = format!("{}\n\n{}\n\n{}", LONG_RESONANCE, LONG_WEAVING, LONG_RITUAL);
        let result = normalize(&prose);
        assert_eq!(result.resonance, LONG_RESONANCE);
        assert_eq!(result.weaving, LONG_WEAVING);
        assert_eq!(result.ritual, LONG_RITUAL);
    }

    #[test]
    fn long_prose_with_two_paragraphs_gets_ritual_fallback() {
        let prose = format!("{}\n\n{}", LONG_RESONANCE, LONG_WEAVING);
        let result = normalize(&prose);
        assert_eq!(result.resonance, LONG_RESONANCE);
        assert_eq!(result.weaving, LONG_WEAVING);
        assert_eq!(result.ritual, FALLBACK_RITUAL);
    }

    #[test]
    fn long_unbroken_prose_falls_back_to_thirds() {
        let prose = "word ".repeat(40);
        let result = normalize(&prose);
        assert!(!result.resonance.is_empty());
        assert!(!result.weaving.is_empty());
        assert!(!result.ritual.is_empty());
    }

    #[test]
    fn short_garbage_becomes_primary_with_fallbacks() {
        let result = normalize("Just a stray reply");
        assert_eq!(result.resonance, "Just a stray reply");
        assert_eq!(result.weaving, FALLBACK_WEAVING);
        assert_eq!(result.ritual, FALLBACK_RITUAL);
    }

    #[test]
    fn empty_input_yields_all_fallbacks() {
        let result = normalize("");
        assert_eq!(result.resonance, FALLBACK_RESONANCE);
        assert_eq!(result.weaving, FALLBACK_WEAVING);
        assert_eq!(result.ritual, FALLBACK_RITUAL);
    }

    #[test]
    fn truncated_json_never_panics() {
        let truncated = format!("{{\"resonance\": \"{}", LONG_RESONANCE);
        let result = normalize(&truncated);
        assert!(!result.resonance.is_empty());
        assert!(!result.weaving.is_empty());
        assert!(!result.ritual.is_empty());
    }

    #[test]
    fn non_object_json_is_treated_as_raw() {
        let result = normalize("42");
        assert_eq!(result.resonance, "42");
        assert_eq!(result.weaving, FALLBACK_WEAVING);
    }

    #[test]
    fn totality_over_arbitrary_inputs() {
        let inputs = [
            "",
            " ",
            "\n\n\n",
            "{",
            "}{",
            "null",
            "[1, 2, 3]",
            "{\"unrelated\": true}",
            "```json",
            "{\"resonance\": null, \"weaving\": 7, \"ritual\": false}",
            "资讯与指引混在一起的一段中文输出，没有任何 JSON 结构。",
        ];
        for input in inputs {
            let result = normalize(input);
            assert!(!result.resonance.is_empty(), "input: {:?}", input);
            assert!(!result.weaving.is_empty(), "input: {:?}", input);
            assert!(!result.ritual.is_empty(), "input: {:?}", input);
        }
    }
}
