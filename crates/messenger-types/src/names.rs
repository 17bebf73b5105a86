//! # Names
//!
//! Every action and event on the bus is addressed as `"<Namespace>:<member>"`,
//! e.g. `"KeyringController:getState"` or `"KeyringController:unlock"`.

use crate::errors::MessengerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the namespace and the member part of a name.
pub const NAME_SEPARATOR: char = ':';

/// A controller or service namespace, e.g. `"AuthenticationController"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace string.
    ///
    /// # Errors
    ///
    /// `MessengerError::InvalidName` if the string is empty or contains `:`.
    pub fn new(name: impl Into<String>) -> Result<Self, MessengerError> {
        let name = name.into();
        if name.is_empty() || name.contains(NAME_SEPARATOR) {
            return Err(MessengerError::InvalidName { name });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `name` is addressed inside this namespace.
    pub fn owns(&self, name: &QualifiedName) -> bool {
        name.namespace() == self.as_str()
    }
}

impl TryFrom<String> for Namespace {
    type Error = MessengerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully qualified action or event name.
///
/// The string is split at the first `:`; members may themselves contain
/// further colons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    full: String,
    split: usize,
}

impl QualifiedName {
    /// Parse a `"<Namespace>:<member>"` string.
    ///
    /// # Errors
    ///
    /// `MessengerError::InvalidName` if either side of the separator is empty
    /// or the separator is missing.
    pub fn parse(name: impl Into<String>) -> Result<Self, MessengerError> {
        let full = name.into();
        match full.find(NAME_SEPARATOR) {
            Some(split) if split > 0 && split + 1 < full.len() => Ok(Self { full, split }),
            _ => Err(MessengerError::InvalidName { name: full }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.full[..self.split]
    }

    pub fn member(&self) -> &str {
        &self.full[self.split + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = MessengerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for QualifiedName {
    type Error = MessengerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<QualifiedName> for String {
    fn from(value: QualifiedName) -> Self {
        value.full
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}
