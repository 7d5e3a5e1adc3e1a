//! Canonical room naming for pairwise conversations.
//!
//! Two kinds of room exist: the *personal room*, named exactly by a user's
//! identity (reaches every live connection of that user), and the
//! *conversation room* for a pair of participants, named by sorting both
//! trimmed identities and joining them with [`ROOM_DELIMITER`]. The
//! derivation is pure and order-independent:
//! `conversation_key(a, b) == conversation_key(b, a)`.

/// Delimiter between the two sorted identities in a conversation key.
///
/// Not permitted inside identities; [`trimmed_identity`] rejects it so a
/// conversation key can never collide with a personal room name.
pub const ROOM_DELIMITER: char = '_';

/// Errors raised when deriving room names from identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// An identity was empty after trimming, or contained the delimiter.
    #[error("invalid participant identity")]
    InvalidParticipant,
}

/// Trims an identity and validates it for room derivation.
///
/// # Errors
///
/// Returns [`RoomError::InvalidParticipant`] if the identity is empty after
/// trimming or contains [`ROOM_DELIMITER`].
pub fn trimmed_identity(raw: &str) -> Result<&str, RoomError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains(ROOM_DELIMITER) {
        return Err(RoomError::InvalidParticipant);
    }
    Ok(trimmed)
}

/// Derives the canonical conversation room key for a pair of participants.
///
/// Both identities are trimmed, sorted lexicographically, and joined with
/// [`ROOM_DELIMITER`], so the key is identical regardless of argument order
/// or surrounding whitespace.
///
/// # Errors
///
/// Returns [`RoomError::InvalidParticipant`] if either identity fails
/// [`trimmed_identity`].
pub fn conversation_key(user_a: &str, user_b: &str) -> Result<String, RoomError> {
    let a = trimmed_identity(user_a)?;
    let b = trimmed_identity(user_b)?;
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    Ok(format!("{first}{ROOM_DELIMITER}{second}"))
}
