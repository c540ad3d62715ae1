use thiserror::Error;

/// Errors raised while talking to the external reasoning service.
///
/// None of these abort an analysis run: the analyzer logs them per keyword
/// and carries on.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("reasoning service returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The service answered 2xx but without any completion text.
    #[error("reasoning service returned an empty completion")]
    EmptyCompletion,

    #[error("no API key configured for the reasoning service")]
    MissingCredential,

    #[error("invalid reasoning service base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
