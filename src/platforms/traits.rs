use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::media::{ArtifactDescriptor, DownloadOptions, MediaInfo};

/// Why an extraction failed, separated so the orchestrator can attach
/// platform-specific remediation hints before the message reaches a job
/// record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("autenticação necessária: {0}")]
    AuthRequired(String),
    #[error("limite de requisições atingido: {0}")]
    RateLimited(String),
    #[error("conteúdo não encontrado: {0}")]
    NotFound(String),
    #[error("conteúdo bloqueado por política de direitos: {0}")]
    PolicyBlocked(String),
    #[error("{0}")]
    Transient(String),
}

impl ExtractError {
    /// Classifies raw library/subprocess error text by signature, sniffing
    /// "401"/"login" and "403"/"429" out of wrapped error messages.
    pub fn from_signature(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("401") || lower.contains("login") || lower.contains("unauthorized") {
            return ExtractError::AuthRequired(message);
        }
        if lower.contains("403") || lower.contains("429") || lower.contains("rate limit") {
            return ExtractError::RateLimited(message);
        }
        if lower.contains("404") || lower.contains("not found") {
            return ExtractError::NotFound(message);
        }
        ExtractError::Transient(message)
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ExtractError::from_signature(format!("HTTP {}: {}", status, err)),
            None => ExtractError::Transient(err.to_string()),
        }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        ExtractError::Transient(err.to_string())
    }
}

/// One pluggable strategy per platform family.
///
/// `fetch_media` must write only inside `dest_dir` (chosen by the caller,
/// never by the extractor) and may send progress fractions in [0, 100] on
/// `progress`; the values it sends are expected to be non-decreasing.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Metadata lookup with no side effects on disk.
    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ExtractError>;

    async fn fetch_media(
        &self,
        url: &str,
        opts: &DownloadOptions,
        dest_dir: &Path,
        progress: mpsc::Sender<f64>,
    ) -> Result<ArtifactDescriptor, ExtractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sniffing_classifies_auth() {
        assert!(matches!(
            ExtractError::from_signature("HTTP 401 Unauthorized"),
            ExtractError::AuthRequired(_)
        ));
        assert!(matches!(
            ExtractError::from_signature("Login required to view this post"),
            ExtractError::AuthRequired(_)
        ));
    }

    #[test]
    fn signature_sniffing_classifies_rate_limits() {
        assert!(matches!(
            ExtractError::from_signature("HTTP 429 Too Many Requests"),
            ExtractError::RateLimited(_)
        ));
        assert!(matches!(
            ExtractError::from_signature("server said: rate limit exceeded"),
            ExtractError::RateLimited(_)
        ));
    }

    #[test]
    fn signature_sniffing_defaults_to_transient() {
        assert!(matches!(
            ExtractError::from_signature("connection reset by peer"),
            ExtractError::Transient(_)
        ));
    }

    #[test]
    fn not_found_signature() {
        assert!(matches!(
            ExtractError::from_signature("HTTP 404"),
            ExtractError::NotFound(_)
        ));
    }
}
