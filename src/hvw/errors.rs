//! Error types for the HVW API client.

#[derive(Debug, thiserror::Error)]
pub enum HvwApiError {
    /// Transport failure or non-2xx status. The caller decides whether to
    /// retry; the client never does.
    #[error("HVW endpoint unavailable: {url}")]
    SourceUnavailable {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to parse HVW response ({status}) from {url}")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: anyhow::Error,
    },
}
