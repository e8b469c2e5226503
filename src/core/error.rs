//! Error taxonomy shared by the refresh pipeline and the query paths.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream timed out, refused the connection or dropped it mid-response.
    #[error("External data source unavailable: {0}")]
    SourceUnavailable(String),

    /// Upstream answered, but not with something we can use.
    #[error("External data source returned invalid data: {0}")]
    SourceDataInvalid(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Failed to render summary: {0}")]
    Render(String),
}

impl AppError {
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        AppError::Persistence(err.to_string())
    }

    /// Short tag used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::SourceUnavailable(_) => "source_unavailable",
            AppError::SourceDataInvalid(_) => "source_data_invalid",
            AppError::NotFound(_) => "not_found",
            AppError::Persistence(_) => "persistence",
            AppError::Render(_) => "render",
        }
    }
}

impl From<fjall::Error> for AppError {
    fn from(err: fjall::Error) -> Self {
        AppError::persistence(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AppError::NotFound("Country".to_string()).to_string(),
            "Country not found"
        );
        assert_eq!(
            AppError::SourceUnavailable("timeout".to_string()).kind(),
            "source_unavailable"
        );
        assert!(
            AppError::persistence("disk full")
                .to_string()
                .contains("disk full")
        );
    }
}
