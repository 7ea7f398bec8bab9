//! Data models for API requests/responses and stored records

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One declared delegation: this bot wallet, under this display name,
/// corresponds to birth-issue #N.
///
/// Field names match the wire format used by the web client
/// (`{bot, oracle, issue}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub bot: Address,
    pub oracle: String,
    pub issue: u64,
}

/// Permanent proof that a human wallet controls a GitHub account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubVerification {
    pub human_wallet: String,
    pub github_username: String,
    pub verified_at: DateTime<Utc>,
    pub proof_url: String,
}

/// Permanent record of a signed assignment batch, keyed by Merkle root.
/// Authoritative over the per-bot pointer index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleRootRecord {
    pub merkle_root: String,
    pub human_wallet: String,
    pub github_username: String,
    pub assignments: Vec<Assignment>,
    pub assigned_at: DateTime<Utc>,
}

/// Cached lookup from a bot wallet to its committed assignment. Rebuilt from
/// the root record on every write; never consulted as the source of truth.
#[derive(Debug, Clone, Serialize)]
pub struct BotPointer {
    pub merkle_root: String,
    pub oracle_name: String,
    pub birth_issue: u64,
    pub human_wallet: String,
    pub github_username: String,
}

/// Oracle account as persisted in the external record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub wallet_address: Option<String>,
    pub github_username: Option<String>,
    pub birth_issue: Option<u64>,
    pub approved: bool,
    pub karma: i64,
}

// ---------------------------------------------------------------------------
// Request / response bodies (camelCase on the wire, like the original API)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NonceRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct NonceResponse {
    pub success: bool,
    pub nonce: String,
    pub message: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct SiweVerifyRequest {
    pub address: String,
    pub signature: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SiweVerifyResponse {
    pub success: bool,
    pub created: bool,
    pub oracle: OracleAccount,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub registered: bool,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleAccount>,
}

#[derive(Debug, Deserialize)]
pub struct LinkWalletRequest {
    pub address: String,
    pub signature: String,
    #[serde(rename = "oracleName")]
    pub oracle_name: String,
}

#[derive(Debug, Serialize)]
pub struct LinkWalletResponse {
    pub success: bool,
    pub linked: bool,
    pub oracle: OracleAccount,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyGithubRequest {
    #[serde(rename = "gistUrl")]
    pub gist_url: String,
    pub signer: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyGithubResponse {
    pub success: bool,
    #[serde(rename = "githubUsername")]
    pub github_username: String,
    pub wallet: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckVerifiedQuery {
    pub wallet: String,
}

#[derive(Debug, Serialize)]
pub struct CheckVerifiedResponse {
    pub verified: bool,
    #[serde(rename = "githubUsername", skip_serializing_if = "Option::is_none")]
    pub github_username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignBotsRequest {
    #[serde(rename = "merkleRoot")]
    pub merkle_root: String,
    pub assignments: Vec<Assignment>,
    pub signature: String,
    pub message: String,
    #[serde(rename = "humanWallet")]
    pub human_wallet: String,
}

#[derive(Debug, Serialize)]
pub struct AssignBotsResponse {
    pub success: bool,
    #[serde(rename = "merkleRoot")]
    pub merkle_root: String,
    #[serde(rename = "botCount")]
    pub bot_count: usize,
    #[serde(rename = "githubUsername")]
    pub github_username: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaimBotRequest {
    pub signature: String,
    pub message: String,
    #[serde(rename = "botWallet")]
    pub bot_wallet: String,
    pub leaf: Assignment,
    pub proof: Vec<String>,
    #[serde(rename = "merkleRoot")]
    pub merkle_root: String,
}

#[derive(Debug, Deserialize)]
pub struct LegacyClaimRequest {
    pub name: Option<String>,
    #[serde(rename = "gistUrl")]
    pub gist_url: String,
    #[serde(rename = "issueUrl")]
    pub issue_url: String,
    pub signer: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    pub created: bool,
    pub oracle: OracleAccount,
    pub token: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verified_check_uses_camel_case_on_the_wire() {
        let body = serde_json::to_value(CheckVerifiedResponse {
            verified: true,
            github_username: Some("alice".to_string()),
        })
        .unwrap();

        assert_eq!(body["githubUsername"], "alice");
        assert!(body.get("github_username").is_none());
    }
}
