use std::borrow::Cow;

use crate::error::CompletionError;

const MAX_API_ERROR_CHARS: usize = 200;

/// Markers after which a credential usually follows. A local Ollama needs no
/// key, but the base URL may point at an authenticating proxy.
const SECRET_MARKERS: [&str; 6] = [
    "Authorization: Bearer ",
    "authorization: bearer ",
    "api_key=",
    "access_token=",
    "\"api_key\":\"",
    "\"token\":\"",
];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '+' | '/' | '=')
}

fn redact_after(text: &mut String, marker: &str) {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(marker) {
        let value_start = search_from + rel + marker.len();
        let value_len: usize = text[value_start..]
            .chars()
            .take_while(|c| is_secret_char(*c))
            .map(char::len_utf8)
            .sum();

        if value_len == 0 {
            search_from = value_start;
            continue;
        }

        text.replace_range(value_start..value_start + value_len, "[REDACTED]");
        search_from = value_start + "[REDACTED]".len();
    }
}

/// Redact credential-looking values from a service error body.
pub fn scrub_secret_patterns(input: &str) -> Cow<'_, str> {
    if !SECRET_MARKERS.iter().any(|m| input.contains(m)) {
        return Cow::Borrowed(input);
    }

    let mut scrubbed = input.to_string();
    for marker in SECRET_MARKERS {
        redact_after(&mut scrubbed, marker);
    }
    Cow::Owned(scrubbed)
}

/// Scrub secrets and cap the length of an error body.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input.trim());

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed.into_owned();
    }

    let truncated: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    format!("{truncated}...")
}

/// Build a sanitized completion error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> CompletionError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    CompletionError::Api {
        provider: provider.to_string(),
        status,
        message: sanitize_api_error(&body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_input_is_borrowed() {
        let out = scrub_secret_patterns("model 'llama3' not found");
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn bearer_token_is_redacted() {
        let out = scrub_secret_patterns("denied: Authorization: Bearer abc.def-123 rest");
        assert_eq!(out, "denied: Authorization: Bearer [REDACTED] rest");
    }

    #[test]
    fn json_token_is_redacted() {
        let out = scrub_secret_patterns(r#"{"token":"s3cr3t","error":"bad"}"#);
        assert!(!out.contains("s3cr3t"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn bare_marker_is_left_alone() {
        let out = scrub_secret_patterns("api_key= missing");
        assert_eq!(out, "api_key= missing");
    }

    #[test]
    fn long_bodies_are_truncated_on_char_boundary() {
        let body = "ä".repeat(500);
        let out = sanitize_api_error(&body);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), MAX_API_ERROR_CHARS + 3);
    }
}
