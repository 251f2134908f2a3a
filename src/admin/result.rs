//! Result wrappers shared by every admin operation.

use std::fmt;

use crate::error::{Error, KafkaCode, Result};

/// Error attached to a single result item.
///
/// Owns its message. The message is filled from the code's default
/// description when the broker sends none, so it is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub code: KafkaCode,
    pub message: String,
}

impl ItemError {
    pub fn new(code: KafkaCode, message: Option<String>) -> Self {
        let message = match message {
            Some(m) if !m.is_empty() => m,
            _ => code.description().to_string(),
        };
        Self { code, message }
    }

    /// Build from a wire error code; `0` means no error.
    pub fn from_wire(code: i16, message: Option<String>) -> Option<Self> {
        match KafkaCode::from_wire(code) {
            KafkaCode::None => None,
            code => Some(Self::new(code, message)),
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<ItemError> for Error {
    fn from(e: ItemError) -> Self {
        Error::broker(e.code, Some(e.message))
    }
}

/// Outcome of one admin call: an optional request-level error plus the
/// per-item results the broker returned.
///
/// A request-level error does not imply the item list is empty: when the
/// broker rejects the whole request but still lists items, they are kept.
/// Failures that never produced a response (transport, timeout, unsupported
/// version) always come with no items.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminResult<T> {
    error: Option<Error>,
    items: Vec<T>,
}

impl<T> AdminResult<T> {
    pub fn ok(items: Vec<T>) -> Self {
        Self { error: None, items }
    }

    pub fn failed(error: Error) -> Self {
        Self {
            error: Some(error),
            items: Vec::new(),
        }
    }

    pub fn with_error(error: Option<Error>, items: Vec<T>) -> Self {
        Self { error, items }
    }

    /// The request-level error, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Collapse into a `Result`, dropping items when a request error is set.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.items),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> AdminResult<U> {
        AdminResult {
            error: self.error,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

impl<T> Default for AdminResult<T> {
    fn default() -> Self {
        Self::ok(Vec::new())
    }
}
