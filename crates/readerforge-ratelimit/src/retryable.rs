//! Retryability classification shared with the retry manager: an error's
//! rendered message is checked against a small allow-list of patterns
//! rather than downcast to a concrete error type, since the gateway's
//! underlying HTTP client errors are opaque by the time they reach here.

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "429", "too many requests"];
const TRANSPORT_TIMEOUT_MARKERS: &[&str] = &["timed out", "timeout", "deadline exceeded"];
const GATEWAY_STATUS_MARKERS: &[&str] = &["502", "503", "504", "bad gateway", "service unavailable"];
const CONNECTION_RESET_MARKERS: &[&str] = &["connection reset", "broken pipe", "econnreset"];

/// Whether `message` looks like a transient failure worth retrying.
#[must_use]
pub fn is_retryable(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS
        .iter()
        .chain(TRANSPORT_TIMEOUT_MARKERS)
        .chain(GATEWAY_STATUS_MARKERS)
        .chain(CONNECTION_RESET_MARKERS)
        .any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_rate_limit_and_gateway_errors() {
        assert!(is_retryable("upstream returned 429 Too Many Requests"));
        assert!(is_retryable("503 Service Unavailable"));
        assert!(is_retryable("connection reset by peer"));
    }

    #[test]
    fn rejects_non_transient_errors() {
        assert!(!is_retryable("invalid schema: missing field `title`"));
        assert!(!is_retryable("unauthorized: bad api key"));
    }
}
