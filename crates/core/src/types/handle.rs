//! Driver handles: the public slug in `/deliveries/{handle}`.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error("Handle is required")]
    Empty,
    #[error("Handle must be at least {min} characters")]
    TooShort { min: usize },
    #[error("Handle must be at most {max} characters")]
    TooLong { max: usize },
    #[error("Handle can only contain letters, numbers, underscores, and hyphens")]
    InvalidCharacter(char),
}

/// A validated, lower-cased driver handle.
///
/// ```
/// use openweed_core::DriverHandle;
///
/// assert_eq!(DriverHandle::parse("AtxWeedDog").unwrap().as_str(), "atxweeddog");
/// assert!(DriverHandle::parse("ab").is_err());
/// assert!(DriverHandle::parse("no spaces").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct DriverHandle(String);

impl DriverHandle {
    pub const MIN_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 30;

    /// # Errors
    ///
    /// Returns an error when the trimmed input is empty, outside 3..=30
    /// characters, or contains anything besides ASCII letters, digits, `_`
    /// and `-`.
    pub fn parse(s: &str) -> Result<Self, HandleError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(HandleError::Empty);
        }
        if let Some(bad) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(HandleError::InvalidCharacter(bad));
        }
        // ASCII only from here, so len() counts characters.
        if s.len() < Self::MIN_LENGTH {
            return Err(HandleError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(HandleError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DriverHandle {
    type Error = HandleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DriverHandle> for String {
    fn from(handle: DriverHandle) -> Self {
        handle.0
    }
}
