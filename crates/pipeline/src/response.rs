//! Turning raw capability output into domain values.
//!
//! Generators are asked for JSON but routinely wrap it in markdown fences,
//! prepend prose, or return something else entirely. Anything that cannot be
//! read becomes [`GenerationError::InvalidResponse`]; nothing here panics.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::IgnoredAny;
use serde_json::{Map, Value};

use crate::{ContentDna, GenerationError, PlatformArtifact, PlatformId};

static WRAPPING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A```[A-Za-z]*[ \t]*\r?\n?(.*)```\z").expect("fence pattern is valid")
});

/// Locates the JSON document inside a model response.
///
/// Tried in order: the whole trimmed text, the inside of a fence that wraps
/// the entire response, then the span from the first `{`/`[` to the last
/// `}`/`]`. Fences that appear inside a JSON string (a code sample in a post
/// body, say) are left alone. When nothing matches, the trimmed text is
/// returned and the caller's JSON error describes the problem.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    if serde_json::from_str::<IgnoredAny>(trimmed).is_ok() {
        return trimmed;
    }
    if let Some(inner) = WRAPPING_FENCE.captures(trimmed).and_then(|caps| caps.get(1)) {
        return inner.as_str().trim();
    }
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Parses generator output into a pending (unvalidated) artifact.
///
/// `title` and `body` are taken from the object; every other key is kept in
/// the artifact's metadata. A missing `title` or `body` becomes an empty string
/// so the validation rules, not the parser, decide whether that is acceptable.
pub fn parse_artifact(platform: &PlatformId, raw: &str) -> Result<PlatformArtifact, GenerationError> {
    let value: Value = serde_json::from_str(extract_json(raw))
        .map_err(|err| GenerationError::invalid(format!("response is not JSON: {err}")))?;

    let Value::Object(mut object) = value else {
        return Err(GenerationError::invalid("response is not a JSON object"));
    };

    let title = take_text(&mut object, "title")?;
    let body = take_text(&mut object, "body")?;

    let mut artifact = PlatformArtifact::new(platform.clone(), title, body);
    artifact.metadata = object;
    Ok(artifact)
}

/// Parses extractor output into a DNA record.
pub fn parse_dna(raw: &str) -> Result<ContentDna, GenerationError> {
    serde_json::from_str(extract_json(raw))
        .map_err(|err| GenerationError::invalid(format!("DNA response could not be read: {err}")))
}

fn take_text(object: &mut Map<String, Value>, key: &str) -> Result<String, GenerationError> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(GenerationError::invalid(format!(
            "field '{key}' must be a string, got {other}"
        ))),
    }
}
