use crate::lang;
use std::io;

/// ## Session error
///
/// What went wrong from the host's point of view. Errors raised by BASIC
/// itself are passed through untouched as `Engine`.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("usage error: {0}")]
    Usage(String),
    #[error("{0}")]
    Engine(#[from] lang::Error),
    #[error("{message}")]
    Resource {
        message: String,
        #[source]
        source: Option<io::Error>,
    },
}

impl Error {
    pub fn usage<T: Into<String>>(message: T) -> Error {
        Error::Usage(message.into())
    }

    pub fn resource<T: Into<String>>(message: T, source: Option<io::Error>) -> Error {
        Error::Resource {
            message: message.into(),
            source,
        }
    }

    /// The BASIC error code, for engine errors.
    pub fn code(&self) -> Option<u16> {
        match self {
            Error::Engine(e) => Some(e.code()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
