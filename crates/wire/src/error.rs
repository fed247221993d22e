// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("message has no verb frame")]
    MissingVerb,

    #[error("verb {verb} expects {expected} argument frame(s), got {got}")]
    WrongArity { verb: String, expected: usize, got: usize },

    #[error("frame for {field} is not valid UTF-8")]
    NotUtf8 { field: &'static str },

    #[error("field {field} is not a valid integer")]
    NotAnInteger { field: &'static str },
}
