//! Smokers Lounge rules.
//!
//! The lounge is polled, not pushed: clients fetch history once, then ask for
//! messages newer than the last id they saw every [`POLL_INTERVAL_SECS`].

use crate::ChatMessageId;

/// Room used when a client does not name one.
pub const DEFAULT_ROOM: &str = "general";
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;
pub const MAX_MESSAGE_LENGTH: usize = 1000;
pub const MAX_ROOM_LENGTH: usize = 64;
/// Advertised to clients in history responses.
pub const POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatMessageError {
    #[error("Message cannot be empty")]
    Empty,
    #[error("Message must be at most {max} characters")]
    TooLong { max: usize },
    #[error("Invalid room name")]
    InvalidRoom,
}

/// Trim a message body and check its length.
///
/// # Errors
///
/// [`ChatMessageError::Empty`] for blank input, [`ChatMessageError::TooLong`]
/// past [`MAX_MESSAGE_LENGTH`] characters.
pub fn normalize_message(raw: &str) -> Result<String, ChatMessageError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ChatMessageError::Empty);
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatMessageError::TooLong {
            max: MAX_MESSAGE_LENGTH,
        });
    }
    Ok(trimmed.to_owned())
}

/// Lower-cased room key, [`DEFAULT_ROOM`] when absent or blank.
///
/// # Errors
///
/// Room keys share the zone-key alphabet: ASCII letters, digits and `-`/`_`.
pub fn normalize_room(raw: Option<&str>) -> Result<String, ChatMessageError> {
    let room = raw.map(str::trim).filter(|r| !r.is_empty());
    let Some(room) = room else {
        return Ok(DEFAULT_ROOM.to_owned());
    };
    let valid = room.len() <= MAX_ROOM_LENGTH
        && room
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ChatMessageError::InvalidRoom);
    }
    Ok(room.to_ascii_lowercase())
}

/// History page size: [`DEFAULT_HISTORY_LIMIT`] when absent, clamped to
/// `1..=MAX_HISTORY_LIMIT`.
#[must_use]
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

/// Which end of a room's history one page is cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    /// First load: the newest messages.
    Latest,
    /// Polling: the oldest messages past the cursor. A burst larger than one
    /// page is then read across several polls instead of skipped.
    After(ChatMessageId),
}

impl HistoryWindow {
    #[must_use]
    pub const fn from_cursor(after: Option<ChatMessageId>) -> Self {
        match after {
            Some(id) => Self::After(id),
            None => Self::Latest,
        }
    }

    /// Whether the page is fetched newest first and must be reversed to
    /// come out oldest first.
    #[must_use]
    pub const fn newest_first(self) -> bool {
        matches!(self, Self::Latest)
    }
}
