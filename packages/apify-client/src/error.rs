use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

#[derive(Debug, Error)]
pub enum ApifyError {
    /// Non-2xx response from the Apify API.
    #[error("Apify API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The actor run finished in a non-success state.
    #[error("Apify run finished with status {0}")]
    RunFailed(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
