use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong";

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error")]
    Transport(#[source] reqwest::Error),
    #[error("{message}")]
    Provider { status: u16, message: String },
    #[error("Unexpected response from catalog provider")]
    Malformed(#[source] serde_json::Error),
    #[error("Page {0} is outside the range the provider serves (1-500)")]
    InvalidPage(u32),
}

impl CatalogError {
    /// Builds the failure for a non-success response, preferring the provider's
    /// own `status_message` over the generic text.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct ProviderError {
            status_message: Option<String>,
        }

        let message = serde_json::from_slice::<ProviderError>(body)
            .ok()
            .and_then(|e| e.status_message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        CatalogError::Provider {
            status: status.as_u16(),
            message,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::Provider { status: 404, .. } => StatusCode::NOT_FOUND,
            CatalogError::InvalidPage(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}
