// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Privacy-preserving contact matching.
//!
//! Plaintext numbers never leave the device: each normalized number is
//! SHA-256 hashed, and only hashes the server has not seen before are
//! transmitted. The hash -> plaintext mapping is built at hash time and
//! carried through the round trip, so leaderboard reconstruction never
//! depends on positional alignment between separately maintained arrays.

use crate::current_user::CurrentUser;
use crate::error::{Result, SyncError};
use crate::models::{LeaderboardItem, User, UserPatch};
use crate::remote::{RemoteClient, RemoteRequest};
use crate::repo::UserRepository;
use crate::store::{namespaces, KeyedStore, PersistentStore};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Single key inside the contact-hash namespace.
const UPSERTED_KEY: &str = "upserted";

/// One leaderboard row as the server sends it.
#[derive(Debug, Deserialize)]
struct WireLeaderboardEntry {
    hashed_phone: String,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct ContactMatchResponse {
    /// Every hash the server now holds for this user; replaces the local
    /// upserted set wholesale.
    all_hashes: Vec<String>,
    #[serde(default)]
    leaderboard: Vec<WireLeaderboardEntry>,
    #[serde(default)]
    users: Vec<UserPatch>,
}

/// Result of one contact-matching round trip.
#[derive(Debug)]
pub struct ContactMatchOutcome {
    /// Reconstructed leaderboard, spam and own-number rows removed.
    pub leaderboard: Vec<LeaderboardItem>,
    /// Contacts who turned out to be registered users, merged and cached.
    pub matched_users: Vec<User>,
}

/// Service for hashed contact upload and leaderboard reconstruction.
pub struct ContactMatchService {
    users: Arc<UserRepository>,
    current_user: CurrentUser,
    remote: Arc<dyn RemoteClient>,
    upserted: KeyedStore<Vec<String>>,
    default_country_code: String,
    spam_prefixes: Vec<String>,
}

impl ContactMatchService {
    pub fn new(
        users: Arc<UserRepository>,
        current_user: CurrentUser,
        remote: Arc<dyn RemoteClient>,
        persist: Arc<dyn PersistentStore>,
        default_country_code: String,
        spam_prefixes: Vec<String>,
    ) -> Self {
        Self {
            users,
            current_user,
            remote,
            upserted: KeyedStore::new(namespaces::CONTACT_HASHES, 4, persist),
            default_country_code,
            spam_prefixes,
        }
    }

    /// Upload the hashed delta of `contact_numbers` and rebuild the
    /// leaderboard from the response.
    pub async fn match_contacts(
        &self,
        contact_numbers: &[String],
        own_number: &str,
    ) -> Result<ContactMatchOutcome> {
        self.current_user.require_id().await?;

        let own_normalized = normalize_phone(own_number, &self.default_country_code)
            .ok_or_else(|| SyncError::Encoding(format!("unusable own number: {}", own_number)))?;
        let own_hash = hash_phone(&own_normalized);

        // Hash -> plaintext, built in lock step with hashing. Ordered
        // hash list kept separately so the delta preserves contact order.
        let mut by_hash: HashMap<String, String> = HashMap::new();
        let mut ordered_hashes: Vec<String> = Vec::new();
        for raw in contact_numbers {
            let Some(normalized) = normalize_phone(raw, &self.default_country_code) else {
                continue;
            };
            let hash = hash_phone(&normalized);
            if by_hash.insert(hash.clone(), normalized).is_none() {
                ordered_hashes.push(hash);
            }
        }

        let previously_upserted: HashSet<String> = self
            .upserted
            .get(UPSERTED_KEY)
            .await
            .unwrap_or_default()
            .into_iter()
            .collect();
        let to_send: Vec<String> = ordered_hashes
            .iter()
            .filter(|h| !previously_upserted.contains(*h))
            .cloned()
            .collect();

        tracing::debug!(
            contacts = ordered_hashes.len(),
            delta = to_send.len(),
            "Uploading contact hash delta"
        );

        let response: ContactMatchResponse = self
            .remote
            .call(RemoteRequest::post("/contacts/match").json(serde_json::json!({
                "hashes": to_send,
                "own_hash": own_hash,
            })))
            .await?
            .decode()?;

        // The server's view replaces the local set wholesale.
        self.upserted.set(UPSERTED_KEY, response.all_hashes).await;

        let mut leaderboard = Vec::with_capacity(response.leaderboard.len());
        for entry in response.leaderboard {
            let Some(plaintext) = by_hash.get(&entry.hashed_phone) else {
                tracing::debug!(hash = %entry.hashed_phone, "Leaderboard hash not in local contacts");
                continue;
            };
            if plaintext == &own_normalized || self.is_spam(plaintext) {
                continue;
            }
            leaderboard.push(LeaderboardItem {
                hashed_phone: entry.hashed_phone,
                unhashed_phone: plaintext.clone(),
                count: entry.count,
            });
        }

        let mut matched_users = Vec::with_capacity(response.users.len());
        for patch in response.users {
            let Some(id) = patch.id.clone().filter(|id| !id.is_empty()) else {
                continue;
            };
            if let Some(user) = self.users.merge_cached(&id, patch).await {
                matched_users.push(user);
            }
        }

        Ok(ContactMatchOutcome {
            leaderboard,
            matched_users,
        })
    }

    /// Forget which hashes were previously sent (e.g. on sign-out).
    pub async fn reset(&self) {
        self.upserted.remove_all().await;
    }

    fn is_spam(&self, number: &str) -> bool {
        self.spam_prefixes.iter().any(|p| number.starts_with(p))
    }
}

/// Normalize a raw contact number to `+<digits>`: strip everything but
/// digits and prepend the default country code to bare 10-digit numbers.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 7 {
        return None;
    }
    if digits.len() == 10 {
        Some(format!("+{}{}", default_country_code, digits))
    } else {
        Some(format!("+{}", digits))
    }
}

/// One-way hash of a normalized number: SHA-256, lowercase hex.
pub fn hash_phone(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_country_code_to_ten_digit_numbers() {
        assert_eq!(
            normalize_phone("(555) 111-0000", "1").as_deref(),
            Some("+15551110000")
        );
    }

    #[test]
    fn normalize_keeps_existing_country_code() {
        assert_eq!(
            normalize_phone("+44 7700 900123", "1").as_deref(),
            Some("+447700900123")
        );
    }

    #[test]
    fn normalize_rejects_junk() {
        assert!(normalize_phone("ext. 12", "1").is_none());
        assert!(normalize_phone("", "1").is_none());
    }

    #[test]
    fn hashing_is_stable_and_hex() {
        let h = hash_phone("+15551110000");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_phone("+15551110000"));
        assert_ne!(h, hash_phone("+15552220000"));
    }
}
