//! Typed in-process stores for the identity core
//!
//! The original design multiplexed one KV namespace for every record kind via
//! key prefixes. Here each kind gets its own store with its own TTL policy:
//! nonces expire after `NONCE_TTL_SECONDS`, verification records and Merkle
//! root records never expire and are removed only by explicit deletion.
//! All keys are lowercased hex.

use std::collections::HashMap;
use std::sync::RwLock;

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use crate::models::{BotPointer, GitHubVerification, MerkleRootRecord};
use crate::services::signature::canonical;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("no live challenge for this address")]
    NoChallenge,

    #[error("message does not match the issued challenge")]
    MessageMismatch,
}

/// Canonical sign-in message. The server reconstructs this from the stored
/// challenge rather than trusting a client-supplied blob, so the server is
/// the source of truth for what should have been signed.
pub fn login_message(nonce: &str, issued_at: DateTime<Utc>) -> String {
    format!(
        "Sign in to OracleNet\n\nNonce: {}\nTimestamp: {}",
        nonce,
        issued_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub nonce: String,
    pub message: String,
    pub issued_at: DateTime<Utc>,
}

struct ChallengeEntry {
    nonce: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Per-address single-use challenges with TTL expiry. At most one live
/// challenge per address; issuing again overwrites the previous one.
pub struct NonceStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, ChallengeEntry>>,
}

impl NonceStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_seconds as i64),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Generate an 8-hex-char nonce from the OS CSPRNG, store it, and return
    /// the message for the client to sign.
    pub fn issue(&self, address: Address) -> IssuedChallenge {
        let mut bytes = [0u8; 4];
        OsRng.fill_bytes(&mut bytes);
        let nonce = hex::encode(bytes);
        let issued_at = Utc::now();

        self.entries.write().unwrap().insert(
            canonical(address),
            ChallengeEntry {
                nonce: nonce.clone(),
                issued_at,
                expires_at: issued_at + self.ttl,
            },
        );

        IssuedChallenge {
            message: login_message(&nonce, issued_at),
            nonce,
            issued_at,
        }
    }

    /// Reconstruct the canonical message for the live challenge, if any.
    /// Expired entries are purged on access.
    pub fn message_for(&self, address: Address) -> Option<String> {
        let key = canonical(address);
        let mut entries = self.entries.write().unwrap();
        match entries.get(&key) {
            Some(entry) if Utc::now() <= entry.expires_at => {
                Some(login_message(&entry.nonce, entry.issued_at))
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Single-use consumption: the candidate must exactly match the
    /// reconstructed message. Deletion happens under the write lock
    /// (compare-and-delete), so a challenge is consumed at most once.
    /// A mismatch leaves the entry in place, allowing retry within the TTL.
    pub fn verify_and_consume(
        &self,
        address: Address,
        candidate: &str,
    ) -> Result<(), ChallengeError> {
        let key = canonical(address);
        let mut entries = self.entries.write().unwrap();

        let entry = entries.get(&key).ok_or(ChallengeError::NoChallenge)?;
        if Utc::now() > entry.expires_at {
            entries.remove(&key);
            return Err(ChallengeError::NoChallenge);
        }

        if candidate != login_message(&entry.nonce, entry.issued_at) {
            return Err(ChallengeError::MessageMismatch);
        }

        entries.remove(&key);
        Ok(())
    }
}

/// Permanent GitHub verification records, keyed by lowercased human wallet.
/// Exactly one binding per wallet; re-verification overwrites. Overwriting
/// does not touch Merkle root records already attributed to the old GitHub
/// identity (open question, kept as the original behaves).
pub struct VerificationStore {
    records: RwLock<HashMap<String, GitHubVerification>>,
}

impl VerificationStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn put(&self, record: GitHubVerification) {
        self.records
            .write()
            .unwrap()
            .insert(record.human_wallet.clone(), record);
    }

    pub fn get(&self, address: Address) -> Option<GitHubVerification> {
        self.records.read().unwrap().get(&canonical(address)).cloned()
    }
}

impl Default for VerificationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Permanent Merkle root records keyed by lowercased root hex, plus the
/// per-bot pointer index. The root record is authoritative; the pointer is a
/// cache rebuilt on every batch write.
pub struct RootStore {
    records: RwLock<HashMap<String, MerkleRootRecord>>,
    bots: RwLock<HashMap<String, BotPointer>>,
}

impl RootStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            bots: RwLock::new(HashMap::new()),
        }
    }

    pub fn put(&self, record: MerkleRootRecord) {
        {
            let mut bots = self.bots.write().unwrap();
            for assignment in &record.assignments {
                bots.insert(
                    canonical(assignment.bot),
                    BotPointer {
                        merkle_root: record.merkle_root.clone(),
                        oracle_name: assignment.oracle.clone(),
                        birth_issue: assignment.issue,
                        human_wallet: record.human_wallet.clone(),
                        github_username: record.github_username.clone(),
                    },
                );
            }
        }
        self.records
            .write()
            .unwrap()
            .insert(record.merkle_root.clone(), record);
    }

    pub fn get(&self, root: B256) -> Option<MerkleRootRecord> {
        self.records
            .read()
            .unwrap()
            .get(&format!("{root:#x}"))
            .cloned()
    }

    pub fn bot_pointer(&self, bot: Address) -> Option<BotPointer> {
        self.bots.read().unwrap().get(&canonical(bot)).cloned()
    }
}

impl Default for RootStore {
    fn default() -> Self {
        Self::new()
    }
}
