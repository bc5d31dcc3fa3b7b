//! Error types for the photo frame service

use std::fmt;

#[derive(Debug)]
pub enum PhotoFrameError {
    Source(synology_photos_client::SynologyError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for PhotoFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoFrameError::Source(err) => write!(f, "Photo source error: {}", err),
            PhotoFrameError::Io(err) => write!(f, "IO error: {}", err),
            PhotoFrameError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for PhotoFrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PhotoFrameError::Source(err) => Some(err),
            PhotoFrameError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<synology_photos_client::SynologyError> for PhotoFrameError {
    fn from(err: synology_photos_client::SynologyError) -> Self {
        PhotoFrameError::Source(err)
    }
}

impl From<std::io::Error> for PhotoFrameError {
    fn from(err: std::io::Error) -> Self {
        PhotoFrameError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for PhotoFrameError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        PhotoFrameError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PhotoFrameError>;
