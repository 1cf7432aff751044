use crate::transport::LinkError;
use std::{error::Error, fmt::Display};

/// What can stop the terminal front end.
#[derive(Debug)]
pub enum KioskGuiError {
    /// Drawing or reading the terminal failed.
    IOError(std::io::Error),
    /// The device link failed in a way the front end cannot recover from.
    LinkError(LinkError),
}

impl Display for KioskGuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IOError(e) => write!(f, "terminal error: {}", e),
            Self::LinkError(e) => write!(f, "{}", e),
        }
    }
}

impl Error for KioskGuiError {}

impl From<std::io::Error> for KioskGuiError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<LinkError> for KioskGuiError {
    fn from(value: LinkError) -> Self {
        Self::LinkError(value)
    }
}
