// This file is part of freq_cardinality. Copyright © 2026 freq_cardinality contributors.
// freq_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::io;

/// Result alias used throughout the crate. Defaults to the unit success type.
pub type Result<T = ()> = std::result::Result<T, Error>;

#[derive(Debug)]
enum Message {
    Dynamic(String),
    Static(&'static str),
}

/// Contains the cause of an [`Error`]
#[derive(Debug)]
pub enum Cause {
    /// IO error
    Io(io::Error),
    /// Rejected argument: bucket count out of range, negative delta or value, key with a NUL byte
    InvalidArgument,
    /// A count would have exceeded the 64-bit signed maximum
    Overflow,
    /// An allocation could not be satisfied
    OutOfMemory,
    /// A snapshot failed structural validation during restore
    CorruptSnapshot,
}

/// Errors returned by freq_cardinality
#[derive(Debug)]
pub struct Error {
    message: Message,
    cause: Cause,
}

impl Error {
    /// Wraps IO errors with a static message
    pub fn io_static(message: &'static str, cause: io::Error) -> Self {
        Self {
            message: Message::Static(message),
            cause: Cause::Io(cause),
        }
    }

    /// Wraps IO errors
    pub fn io(message: String, cause: io::Error) -> Self {
        Self {
            message: Message::Dynamic(message),
            cause: Cause::Io(cause),
        }
    }

    /// Rejected-argument error with a static message
    pub fn message_static(message: &'static str) -> Self {
        Self {
            message: Message::Static(message),
            cause: Cause::InvalidArgument,
        }
    }

    /// Rejected-argument error
    pub fn message(message: String) -> Self {
        Self {
            message: Message::Dynamic(message),
            cause: Cause::InvalidArgument,
        }
    }

    pub(crate) fn overflow_static(message: &'static str) -> Self {
        Self {
            message: Message::Static(message),
            cause: Cause::Overflow,
        }
    }

    pub(crate) fn out_of_memory_static(message: &'static str) -> Self {
        Self {
            message: Message::Static(message),
            cause: Cause::OutOfMemory,
        }
    }

    pub(crate) fn corrupt_static(message: &'static str) -> Self {
        Self {
            message: Message::Static(message),
            cause: Cause::CorruptSnapshot,
        }
    }

    pub fn get_cause(&self) -> &Cause {
        &self.cause
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.cause {
            Cause::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Message::Dynamic(string) => write!(f, "{}", string),
            Message::Static(str) => write!(f, "{}", str),
        }
    }
}
