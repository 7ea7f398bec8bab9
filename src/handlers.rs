//! HTTP handlers implementing the identity verification protocol
//!
//! Four causally ordered flows: SIWE login, GitHub gist proof, Merkle batch
//! assignment, and bot claim (Merkle proof or legacy issue-comment). Every
//! step validates and fails fast; no record is written unless every check of
//! its flow has passed.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use alloy::primitives::{Address, B256};

use crate::config::Config;
use crate::error::AppError;
use crate::models::*;
use crate::services::accounts::{AccountAttributes, AccountResolver, AccountStore};
use crate::services::github::{parse_gist_url, parse_issue_comment_url, Gist, ProofFetcher};
use crate::services::merkle::{self, RootCheck};
use crate::services::session::SessionSigner;
use crate::services::signature::{self, canonical, display};
use crate::store::{ChallengeError, NonceStore, RootStore, VerificationStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub nonces: Arc<NonceStore>,
    pub verifications: Arc<VerificationStore>,
    pub roots: Arc<RootStore>,
    pub github: Arc<dyn ProofFetcher>,
    pub accounts: Arc<dyn AccountStore>,
    pub resolver: Arc<AccountResolver>,
}

impl AppState {
    pub fn new(
        config: Config,
        github: Arc<dyn ProofFetcher>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        let sessions = SessionSigner::new(&config.session_secret, config.session_ttl_seconds);
        Self {
            nonces: Arc::new(NonceStore::new(config.nonce_ttl_seconds)),
            verifications: Arc::new(VerificationStore::new()),
            roots: Arc::new(RootStore::new()),
            resolver: Arc::new(AccountResolver::new(accounts.clone(), sessions)),
            github,
            accounts,
            config,
        }
    }
}

fn parse_wallet(raw: &str, field: &'static str) -> Result<Address, AppError> {
    if raw.is_empty() {
        return Err(AppError::MissingField(field));
    }
    raw.parse::<Address>()
        .map_err(|_| AppError::InvalidAddress(raw.to_string()))
}

fn parse_root(raw: &str) -> Result<B256, AppError> {
    raw.parse::<B256>()
        .map_err(|_| AppError::InvalidRoot(raw.to_string()))
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "oraclenet-identity".to_string(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ---------------------------------------------------------------------------
// Flow A: SIWE login
// ---------------------------------------------------------------------------

/// Issue a single-use challenge for an address to sign.
pub async fn request_nonce(
    State(state): State<AppState>,
    Json(req): Json<NonceRequest>,
) -> Result<Json<NonceResponse>, AppError> {
    let wallet = parse_wallet(&req.address, "address")?;

    let issued = state.nonces.issue(wallet);
    tracing::debug!(wallet = %canonical(wallet), nonce = %issued.nonce, "issued SIWE nonce");

    Ok(Json(NonceResponse {
        success: true,
        nonce: issued.nonce,
        message: issued.message,
        expires_in: state.config.nonce_ttl_seconds,
    }))
}

/// Consume the challenge for `address` after verifying `signature` over the
/// server-reconstructed message. Both the message match and the signature
/// recovery must pass; a bad signature leaves the challenge in place.
fn consume_challenge(
    state: &AppState,
    wallet: Address,
    signature_hex: &str,
) -> Result<(), AppError> {
    if signature_hex.is_empty() {
        return Err(AppError::MissingField("signature"));
    }

    let message = state.nonces.message_for(wallet).ok_or(AppError::NoChallenge)?;

    let recovered = signature::recover(&message, signature_hex)
        .map_err(|e| AppError::InvalidSignature(e.to_string()))?;
    if recovered != wallet {
        return Err(AppError::InvalidSignature(format!(
            "recovered {}, expected {}",
            display(recovered),
            display(wallet)
        )));
    }

    state
        .nonces
        .verify_and_consume(wallet, &message)
        .map_err(|e| match e {
            ChallengeError::NoChallenge => AppError::NoChallenge,
            ChallengeError::MessageMismatch => AppError::MessageMismatch,
        })
}

/// Verify a signed challenge and find-or-create the oracle account.
pub async fn siwe_verify(
    State(state): State<AppState>,
    Json(req): Json<SiweVerifyRequest>,
) -> Result<Json<SiweVerifyResponse>, AppError> {
    let wallet = parse_wallet(&req.address, "address")?;
    consume_challenge(&state, wallet, &req.signature)?;

    let resolved = state
        .resolver
        .resolve(wallet, req.name, AccountAttributes::default())
        .await?;

    tracing::info!(
        wallet = %canonical(wallet),
        oracle = %resolved.account.id,
        created = resolved.created,
        "SIWE login"
    );

    Ok(Json(SiweVerifyResponse {
        success: true,
        created: resolved.created,
        oracle: resolved.account,
        token: resolved.token,
    }))
}

/// Check whether a wallet already has an account.
pub async fn siwe_check(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>, AppError> {
    let wallet = parse_wallet(&query.address, "address")?;
    let oracle = state.accounts.find_by_wallet(&canonical(wallet)).await?;

    Ok(Json(CheckResponse {
        registered: oracle.is_some(),
        address: canonical(wallet),
        oracle,
    }))
}

/// Bind a wallet to a pre-existing named account, gated by the same nonce
/// challenge as login.
pub async fn link_wallet(
    State(state): State<AppState>,
    Json(req): Json<LinkWalletRequest>,
) -> Result<Json<LinkWalletResponse>, AppError> {
    let wallet = parse_wallet(&req.address, "address")?;
    if req.oracle_name.is_empty() {
        return Err(AppError::MissingField("oracleName"));
    }
    consume_challenge(&state, wallet, &req.signature)?;

    let resolved = state.resolver.link(wallet, &req.oracle_name).await?;

    tracing::info!(
        wallet = %canonical(wallet),
        oracle = %resolved.account.id,
        "wallet linked"
    );

    Ok(Json(LinkWalletResponse {
        success: true,
        linked: true,
        oracle: resolved.account,
        token: resolved.token,
    }))
}

// ---------------------------------------------------------------------------
// Flow B: GitHub gist proof
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
struct GistProof {
    message: String,
    signature: String,
}

/// Fetch a gist and recover the signer of the `{message, signature}` proof in
/// its first file. Returns the gist and the recovered address.
async fn fetch_gist_proof(state: &AppState, gist_url: &str) -> Result<(Gist, Address), AppError> {
    let gist_id =
        parse_gist_url(gist_url).ok_or_else(|| AppError::InvalidGistUrl(gist_url.to_string()))?;

    let gist = state
        .github
        .fetch_gist(&gist_id)
        .await
        .map_err(|e| AppError::GitHubFetch(e.to_string()))?;

    let file = gist.files.first().ok_or(AppError::NoFilesInGist)?;
    let proof: GistProof =
        serde_json::from_str(&file.content).map_err(|_| AppError::InvalidProofJson)?;

    let recovered = signature::recover(&proof.message, &proof.signature)
        .map_err(|e| AppError::InvalidSignature(e.to_string()))?;

    Ok((gist, recovered))
}

/// Prove simultaneous control of a wallet and a GitHub account via a gist the
/// claimed signer authored. Writes the permanent verification record.
pub async fn verify_github(
    State(state): State<AppState>,
    Json(req): Json<VerifyGithubRequest>,
) -> Result<Json<VerifyGithubResponse>, AppError> {
    let signer = parse_wallet(&req.signer, "signer")?;

    let (gist, recovered) = fetch_gist_proof(&state, &req.gist_url).await?;
    if recovered != signer {
        return Err(AppError::SignatureMismatch {
            expected: display(signer),
            recovered: display(recovered),
        });
    }

    let github_username = gist.owner_login.ok_or(AppError::OwnerUnresolvable)?;

    state.verifications.put(GitHubVerification {
        human_wallet: canonical(signer),
        github_username: github_username.clone(),
        verified_at: Utc::now(),
        proof_url: req.gist_url,
    });

    tracing::info!(
        wallet = %canonical(signer),
        github = %github_username,
        "GitHub identity verified"
    );

    Ok(Json(VerifyGithubResponse {
        success: true,
        github_username,
        wallet: canonical(signer),
    }))
}

/// Read-only lookup of a wallet's verification record.
pub async fn check_verified(
    State(state): State<AppState>,
    Query(query): Query<CheckVerifiedQuery>,
) -> Result<Json<CheckVerifiedResponse>, AppError> {
    let wallet = parse_wallet(&query.wallet, "wallet")?;
    let record = state.verifications.get(wallet);

    Ok(Json(CheckVerifiedResponse {
        verified: record.is_some(),
        github_username: record.map(|r| r.github_username),
    }))
}

// ---------------------------------------------------------------------------
// Flow C: batch bot assignment
// ---------------------------------------------------------------------------

/// Accept a signed Merkle commitment over a batch of bot assignments. The
/// root is only stored after being independently recomputed from the
/// submitted assignment list.
pub async fn assign_bots(
    State(state): State<AppState>,
    Json(req): Json<AssignBotsRequest>,
) -> Result<Json<AssignBotsResponse>, AppError> {
    let human = parse_wallet(&req.human_wallet, "humanWallet")?;
    let claimed_root = parse_root(&req.merkle_root)?;
    if req.assignments.is_empty() {
        return Err(AppError::EmptyAssignments);
    }
    if req.message.is_empty() {
        return Err(AppError::MissingField("message"));
    }
    if req.signature.is_empty() {
        return Err(AppError::MissingField("signature"));
    }

    // Flow B must have succeeded for this wallet first
    let verification = state
        .verifications
        .get(human)
        .ok_or_else(|| AppError::NotVerified(canonical(human)))?;

    let root = match merkle::check_root(claimed_root, &req.assignments)
        .map_err(|_| AppError::EmptyAssignments)?
    {
        RootCheck::Verified(root) => root,
        RootCheck::Mismatch { claimed, computed } => {
            return Err(AppError::RootMismatch {
                claimed: format!("{claimed:#x}"),
                computed: format!("{computed:#x}"),
            });
        }
    };

    let recovered = signature::recover(&req.message, &req.signature)
        .map_err(|e| AppError::InvalidSignature(e.to_string()))?;
    if recovered != human {
        return Err(AppError::SignatureMismatch {
            expected: display(human),
            recovered: display(recovered),
        });
    }

    let bot_count = req.assignments.len();
    state.roots.put(MerkleRootRecord {
        merkle_root: format!("{root:#x}"),
        human_wallet: canonical(human),
        github_username: verification.github_username.clone(),
        assignments: req.assignments,
        assigned_at: Utc::now(),
    });

    tracing::info!(
        root = %format!("{root:#x}"),
        human = %canonical(human),
        github = %verification.github_username,
        bot_count,
        "assignment batch accepted"
    );

    Ok(Json(AssignBotsResponse {
        success: true,
        merkle_root: format!("{root:#x}"),
        bot_count,
        github_username: verification.github_username,
    }))
}

// ---------------------------------------------------------------------------
// Flow D: bot claim
// ---------------------------------------------------------------------------

/// How a bot proves its right to an identity. Both variants end in the same
/// account resolution.
enum ClaimStrategy {
    /// Inclusion of a committed assignment under a stored Merkle root.
    MerkleProof {
        oracle_name: String,
        birth_issue: u64,
        github_username: String,
    },
    /// Gist proof cross-checked against a birth-issue comment by the same
    /// GitHub user. Kept for pre-Merkle oracles.
    LegacyIssueComment {
        oracle_name: String,
        birth_issue: u64,
        github_username: String,
    },
}

async fn complete_claim(
    state: &AppState,
    bot: Address,
    strategy: ClaimStrategy,
) -> Result<Json<ClaimResponse>, AppError> {
    let (oracle_name, birth_issue, github_username, path) = match strategy {
        ClaimStrategy::MerkleProof {
            oracle_name,
            birth_issue,
            github_username,
        } => (oracle_name, birth_issue, github_username, "merkle"),
        ClaimStrategy::LegacyIssueComment {
            oracle_name,
            birth_issue,
            github_username,
        } => (oracle_name, birth_issue, github_username, "legacy"),
    };

    let resolved = state
        .resolver
        .resolve(
            bot,
            None,
            AccountAttributes {
                name: Some(oracle_name),
                github_username: Some(github_username),
                birth_issue: Some(birth_issue),
                approved: Some(true),
            },
        )
        .await?;

    tracing::info!(
        bot = %canonical(bot),
        oracle = %resolved.account.id,
        created = resolved.created,
        path,
        "bot claimed"
    );

    Ok(Json(ClaimResponse {
        success: true,
        created: resolved.created,
        oracle: resolved.account,
        token: resolved.token,
    }))
}

/// Claim a bot identity with a Merkle inclusion proof against a previously
/// accepted assignment batch.
pub async fn claim_bot(
    State(state): State<AppState>,
    Json(req): Json<ClaimBotRequest>,
) -> Result<Json<ClaimResponse>, AppError> {
    let bot = parse_wallet(&req.bot_wallet, "botWallet")?;
    let root = parse_root(&req.merkle_root)?;
    if req.message.is_empty() {
        return Err(AppError::MissingField("message"));
    }
    if req.signature.is_empty() {
        return Err(AppError::MissingField("signature"));
    }

    let record = state
        .roots
        .get(root)
        .ok_or_else(|| AppError::RootNotFound(format!("{root:#x}")))?;

    // The stored record is authoritative; the submitted leaf must match the
    // assignment the human actually committed to.
    let stored = record
        .assignments
        .iter()
        .find(|a| a.bot == bot)
        .ok_or_else(|| AppError::NotAssigned(canonical(bot)))?;

    if req.leaf.bot != bot || req.leaf.oracle != stored.oracle || req.leaf.issue != stored.issue {
        return Err(AppError::LeafMismatch);
    }

    let proof: Vec<B256> = req
        .proof
        .iter()
        .map(|p| p.parse::<B256>())
        .collect::<Result<_, _>>()
        .map_err(|_| AppError::InvalidProof)?;

    if !merkle::verify_proof(root, merkle::leaf_hash(&req.leaf), &proof) {
        return Err(AppError::InvalidProof);
    }

    let recovered = signature::recover(&req.message, &req.signature)
        .map_err(|e| AppError::InvalidSignature(e.to_string()))?;
    if recovered != bot {
        return Err(AppError::SignatureMismatch {
            expected: display(bot),
            recovered: display(recovered),
        });
    }

    complete_claim(
        &state,
        bot,
        ClaimStrategy::MerkleProof {
            oracle_name: stored.oracle.clone(),
            birth_issue: stored.issue,
            github_username: record.github_username.clone(),
        },
    )
    .await
}

/// Legacy claim: a gist proof plus a comment on the birth-issue announcement
/// by the same GitHub user, no Merkle commitment involved.
pub async fn claim_legacy(
    State(state): State<AppState>,
    Json(req): Json<LegacyClaimRequest>,
) -> Result<Json<ClaimResponse>, AppError> {
    let signer = parse_wallet(&req.signer, "signer")?;

    let (gist, recovered) = fetch_gist_proof(&state, &req.gist_url).await?;
    if recovered != signer {
        return Err(AppError::SignatureMismatch {
            expected: display(signer),
            recovered: display(recovered),
        });
    }
    let gist_owner = gist.owner_login.ok_or(AppError::OwnerUnresolvable)?;

    let issue_ref = parse_issue_comment_url(&req.issue_url)
        .ok_or_else(|| AppError::InvalidIssueUrl(req.issue_url.clone()))?;

    let comment = state
        .github
        .fetch_issue_comment(&issue_ref.owner, &issue_ref.repo, issue_ref.comment_id)
        .await
        .map_err(|e| AppError::CommentFetch(e.to_string()))?;

    if !comment.author_login.eq_ignore_ascii_case(&gist_owner) {
        return Err(AppError::GithubUserMismatch {
            gist_owner,
            comment_author: comment.author_login,
        });
    }

    let oracle_name = req.name.unwrap_or_else(|| gist_owner.clone());

    complete_claim(
        &state,
        signer,
        ClaimStrategy::LegacyIssueComment {
            oracle_name,
            birth_issue: issue_ref.issue_number,
            github_username: gist_owner,
        },
    )
    .await
}
