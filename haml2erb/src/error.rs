use std::fmt::{Debug, Display};

/// The crate's error type.
///
/// Implements [`From`] for [`std::io::Error`] and [`String`]/`&'static str`
/// so driver code and ad-hoc `?`-propagated messages compose naturally.
///
/// # Line numbers
/// [`Error::Syntax`] carries a 1-based source line when the reader knows
/// one. [`Error::Interpolation`] never has a line, since the interpolation
/// scanner operates on an already-extracted text fragment with no notion of
/// its position in the original file.
#[derive(Debug)]
pub enum Error {
    /// An error that happened while reading or writing a file.
    Io(std::io::Error),
    /// The HAML reader could not make sense of the input.
    Syntax { message: String, line: Option<usize> },
    /// The interpolation scanner hit end-of-input before a `#{` was closed.
    Interpolation { message: String },
    /// Catch-all for attribute/expression text that violates its own
    /// sub-grammar (e.g. an unterminated attribute hash).
    UserError { message: String },
}

use Error::*;

impl Error {
    pub fn syntax(message: impl Into<String>, line: Option<usize>) -> Self {
        Syntax {
            message: message.into(),
            line,
        }
    }

    pub fn interpolation(message: impl Into<String>) -> Self {
        Interpolation {
            message: message.into(),
        }
    }

    /// The source line this error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Syntax { line, .. } => *line,
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Syntax { message: a, line: la }, Syntax { message: b, line: lb }) => {
                a == b && la == lb
            }
            (Interpolation { message: a }, Interpolation { message: b }) => a == b,
            (UserError { message: a }, UserError { message: b }) => a == b,
            _ => false,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Io(io) => Display::fmt(io, f),
            Syntax { message, line: Some(line) } => write!(f, "{message} (line {line})"),
            Syntax { message, line: None } => write!(f, "{message}"),
            Interpolation { message } => write!(f, "{message}"),
            UserError { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Io(io) => Some(io),
            Syntax { .. } | Interpolation { .. } | UserError { .. } => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Io(value)
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        UserError { message: value }
    }
}

impl From<&'static str> for Error {
    fn from(value: &'static str) -> Self {
        UserError {
            message: value.into(),
        }
    }
}
