//! Contact-matching leaderboard model.

/// One reconstructed leaderboard row.
///
/// Ephemeral: rebuilt on every contact-matching round trip, never cached
/// and never serialized. `unhashed_phone` exists only on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardItem {
    /// SHA-256 hex digest of the normalized number
    pub hashed_phone: String,
    /// Plaintext number recovered from the local hash map
    pub unhashed_phone: String,
    /// Matched-contact count reported by the server
    pub count: u64,
}
