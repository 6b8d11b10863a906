use thiserror::Error;

use crate::api::transport::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The token endpoint answered with an `error` payload, kept verbatim.
    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("missing required keyword \"{name}\" for {operation}")]
    MissingParameter { operation: String, name: String },

    #[error("{status} {reason}: {body}")]
    Request {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("{resource} is not available at {at}")]
    Unavailable { resource: String, at: String },

    #[error("unknown operation \"{0}\"")]
    UnknownOperation(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid timestamp \"{value}\": {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] oauth2::url::ParseError),

    #[error(transparent)]
    InvalidHeader(#[from] oauth2::http::header::InvalidHeaderValue),
}
