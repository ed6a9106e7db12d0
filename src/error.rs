pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("backend request failed: {context}")]
    Http {
        #[source]
        source: reqwest::Error,
        context: String,
    },
    #[error("backend rejected request ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("not signed in")]
    NotAuthenticated,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("page init failed for {path}")]
    PageInit {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("page init timed out after {timeout_ms}ms for {path}")]
    PageInitTimeout { path: String, timeout_ms: u64 },
}

impl From<std::io::Error> for AppError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl AppError {
    pub fn io_with_context(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn http_with_context(source: reqwest::Error, context: impl Into<String>) -> Self {
        Self::Http {
            source,
            context: context.into(),
        }
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn page_init(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::PageInit {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn page_init_timeout(path: impl Into<String>, timeout_ms: u64) -> Self {
        Self::PageInitTimeout {
            path: path.into(),
            timeout_ms,
        }
    }
}
