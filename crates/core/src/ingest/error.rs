use reqwest::StatusCode;
use std::fmt;

/// Non-success HTTP status from the statistics provider.
#[derive(Debug, Clone)]
pub struct ProviderStatusError {
    pub status: StatusCode,
    pub url: String,
    pub body: String,
}

impl ProviderStatusError {
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

impl fmt::Display for ProviderStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "data provider HTTP {} (url={}): {}",
            self.status, self.url, self.body
        )
    }
}

impl std::error::Error for ProviderStatusError {}
