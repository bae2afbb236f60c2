pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors. All of them are raised before the first request is sent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`vus` must be a positive integer")]
    InvalidVus,

    #[error("`duration` is required")]
    MissingDuration,

    #[error("`timeout` must be a positive duration")]
    InvalidTimeout,

    #[error("invalid threshold selector `{selector}`: {reason}")]
    InvalidThresholdSelector { selector: String, reason: String },

    #[error("invalid threshold `{expression}` for `{selector}`: {reason}")]
    InvalidThreshold {
        selector: String,
        expression: String,
        reason: String,
    },

    #[error("invalid request url `{0}`")]
    InvalidUrl(String),

    #[error("invalid request method `{0}`")]
    InvalidMethod(String),

    #[error("check `{0}` must expect a status between 100 and 599")]
    InvalidCheck(String),
}
