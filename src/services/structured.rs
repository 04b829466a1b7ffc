use serde::de::DeserializeOwned;

/// Result of interpreting model output as a typed payload
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutput<T> {
    Parsed(T),
    Unparsed { raw: String, reason: String },
}

impl<T> StructuredOutput<T> {
    pub fn into_result(self) -> Result<T, String> {
        match self {
            StructuredOutput::Parsed(value) => Ok(value),
            StructuredOutput::Unparsed { reason, .. } => Err(reason),
        }
    }
}

/// Parses model output into `T`, tolerating prose or code fences around the JSON.
///
/// Tried in order: the whole text, the first fenced block, the outermost
/// `{...}` span. Never panics; failure carries the raw text back.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> StructuredOutput<T> {
    let trimmed = raw.trim();
    let mut first_error = None;

    let attempts = [Some(trimmed), fenced_block(trimmed), object_span(trimmed)];
    for candidate in attempts.into_iter().flatten() {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return StructuredOutput::Parsed(value),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    StructuredOutput::Unparsed {
        raw: raw.to_string(),
        reason: first_error.unwrap_or_else(|| "empty response".to_string()),
    }
}

/// Body of the first ``` fence, skipping an optional language tag
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let body_start = rest.find('\n').map_or(0, |newline| {
        let tag = rest[..newline].trim();
        if tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            newline + 1
        } else {
            0
        }
    });
    let body = &rest[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
