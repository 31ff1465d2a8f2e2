use thiserror::Error;

/// Exit code for a start/end argument that is not a usable date range.
pub const EXIT_BAD_DATE: u8 = 6;
/// Exit code for every other failure.
pub const EXIT_FAILURE: u8 = 111;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid date {value:?}, expected yyyy-MM-dd")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("start date {start} is after end date {end}")]
    InvertedRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("environment variable {0} must be set")]
    MissingEnv(&'static str),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ReportError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ReportError::InvalidDate { .. } | ReportError::InvertedRange { .. } => EXIT_BAD_DATE,
            _ => EXIT_FAILURE,
        }
    }

    /// Transport failures, throttling and server-side errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReportError::Http { .. } => true,
            ReportError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Picks the process exit code for an error bubbled up to `main`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ReportError>())
        .map(ReportError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}
