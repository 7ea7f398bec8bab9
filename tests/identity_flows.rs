//! End-to-end flow tests for the identity protocol, driven through the HTTP
//! handlers with in-memory collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use alloy::signers::{local::PrivateKeySigner, SignerSync};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::Json;

use oraclenet_identity::config::Config;
use oraclenet_identity::error::AppError;
use oraclenet_identity::handlers::{self, AppState};
use oraclenet_identity::models::*;
use oraclenet_identity::services::accounts::MemoryAccountStore;
use oraclenet_identity::services::github::{
    Gist, GistFile, GitHubFetchError, IssueComment, ProofFetcher,
};
use oraclenet_identity::services::merkle;
use oraclenet_identity::services::signature::canonical;

#[derive(Default)]
struct StubGitHub {
    gists: HashMap<String, Gist>,
    comments: HashMap<u64, IssueComment>,
}

#[async_trait]
impl ProofFetcher for StubGitHub {
    async fn fetch_gist(&self, gist_id: &str) -> Result<Gist, GitHubFetchError> {
        self.gists
            .get(gist_id)
            .cloned()
            .ok_or(GitHubFetchError::Status {
                status: 404,
                message: "Not Found".to_string(),
            })
    }

    async fn fetch_issue_comment(
        &self,
        _owner: &str,
        _repo: &str,
        comment_id: u64,
    ) -> Result<IssueComment, GitHubFetchError> {
        self.comments
            .get(&comment_id)
            .cloned()
            .ok_or(GitHubFetchError::Status {
                status: 404,
                message: "Not Found".to_string(),
            })
    }
}

fn test_state(github: StubGitHub) -> AppState {
    let config = Config {
        port: 0,
        github_api_url: "http://stub".to_string(),
        github_token: None,
        record_store_url: None,
        record_store_token: None,
        session_secret: "test-secret".to_string(),
        session_ttl_seconds: 3600,
        nonce_ttl_seconds: 300,
    };
    AppState::new(config, Arc::new(github), Arc::new(MemoryAccountStore::new()))
}

fn sign(signer: &PrivateKeySigner, message: &str) -> String {
    let sig = signer.sign_message_sync(message.as_bytes()).unwrap();
    format!("0x{}", hex::encode(sig.as_bytes()))
}

fn proof_gist(signer: &PrivateKeySigner, owner: &str) -> Gist {
    let message = "I own this wallet for OracleNet";
    let content = serde_json::json!({
        "message": message,
        "signature": sign(signer, message),
    })
    .to_string();

    Gist {
        owner_login: Some(owner.to_string()),
        files: vec![GistFile {
            filename: "proof.json".to_string(),
            content,
        }],
    }
}

async fn login(state: &AppState, signer: &PrivateKeySigner, name: Option<&str>) -> SiweVerifyResponse {
    let address = format!("{:#x}", signer.address());

    let nonce = handlers::request_nonce(
        State(state.clone()),
        Json(NonceRequest {
            address: address.clone(),
        }),
    )
    .await
    .unwrap()
    .0;

    handlers::siwe_verify(
        State(state.clone()),
        Json(SiweVerifyRequest {
            address,
            signature: sign(signer, &nonce.message),
            name: name.map(str::to_string),
        }),
    )
    .await
    .unwrap()
    .0
}

async fn verify_github_for(state: &AppState, signer: &PrivateKeySigner, gist_url: &str) {
    let response = handlers::verify_github(
        State(state.clone()),
        Json(VerifyGithubRequest {
            gist_url: gist_url.to_string(),
            signer: format!("{:#x}", signer.address()),
        }),
    )
    .await
    .unwrap()
    .0;
    assert!(response.success);
}

fn batch_for(bots: &[&PrivateKeySigner]) -> Vec<Assignment> {
    bots.iter()
        .enumerate()
        .map(|(i, bot)| Assignment {
            bot: bot.address(),
            oracle: format!("ORACLE-{i}"),
            issue: 100 + i as u64,
        })
        .collect()
}

async fn submit_batch(
    state: &AppState,
    human: &PrivateKeySigner,
    assignments: Vec<Assignment>,
) -> Result<AssignBotsResponse, AppError> {
    let root = merkle::compute_root(&assignments).unwrap();
    let message = format!("Assign {} bots under root {root:#x}", assignments.len());

    handlers::assign_bots(
        State(state.clone()),
        Json(AssignBotsRequest {
            merkle_root: format!("{root:#x}"),
            assignments,
            signature: sign(human, &message),
            message,
            human_wallet: format!("{:#x}", human.address()),
        }),
    )
    .await
    .map(|r| r.0)
}

async fn claim(
    state: &AppState,
    bot: &PrivateKeySigner,
    leaf: Assignment,
    proof: Vec<String>,
    root: String,
) -> Result<ClaimResponse, AppError> {
    let message = format!("Claim oracle identity under root {root}");

    handlers::claim_bot(
        State(state.clone()),
        Json(ClaimBotRequest {
            signature: sign(bot, &message),
            message,
            bot_wallet: format!("{:#x}", bot.address()),
            leaf,
            proof,
            merkle_root: root,
        }),
    )
    .await
    .map(|r| r.0)
}

// ---------------------------------------------------------------------------
// Flow A
// ---------------------------------------------------------------------------

#[tokio::test]
async fn siwe_login_creates_once_then_reuses() {
    let state = test_state(StubGitHub::default());
    let wallet = PrivateKeySigner::random();

    let first = login(&state, &wallet, Some("TestOracle")).await;
    assert!(first.created);
    assert_eq!(first.oracle.name, "TestOracle");
    assert!(first.oracle.approved);
    assert!(!first.token.is_empty());

    let second = login(&state, &wallet, None).await;
    assert!(!second.created);
    assert_eq!(second.oracle.id, first.oracle.id);
}

#[tokio::test]
async fn siwe_verify_without_nonce_is_rejected() {
    let state = test_state(StubGitHub::default());
    let wallet = PrivateKeySigner::random();

    let err = handlers::siwe_verify(
        State(state.clone()),
        Json(SiweVerifyRequest {
            address: format!("{:#x}", wallet.address()),
            signature: sign(&wallet, "anything"),
            name: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NoChallenge));
}

#[tokio::test]
async fn siwe_nonce_is_single_use() {
    let state = test_state(StubGitHub::default());
    let wallet = PrivateKeySigner::random();
    let address = format!("{:#x}", wallet.address());

    let nonce = handlers::request_nonce(
        State(state.clone()),
        Json(NonceRequest {
            address: address.clone(),
        }),
    )
    .await
    .unwrap()
    .0;
    let signature = sign(&wallet, &nonce.message);

    handlers::siwe_verify(
        State(state.clone()),
        Json(SiweVerifyRequest {
            address: address.clone(),
            signature: signature.clone(),
            name: None,
        }),
    )
    .await
    .unwrap();

    // Replaying the same signature must fail: the challenge was consumed
    let err = handlers::siwe_verify(
        State(state.clone()),
        Json(SiweVerifyRequest {
            address,
            signature,
            name: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NoChallenge));
}

#[tokio::test]
async fn siwe_rejects_wrong_key_and_keeps_challenge() {
    let state = test_state(StubGitHub::default());
    let wallet = PrivateKeySigner::random();
    let imposter = PrivateKeySigner::random();
    let address = format!("{:#x}", wallet.address());

    let nonce = handlers::request_nonce(
        State(state.clone()),
        Json(NonceRequest {
            address: address.clone(),
        }),
    )
    .await
    .unwrap()
    .0;

    let err = handlers::siwe_verify(
        State(state.clone()),
        Json(SiweVerifyRequest {
            address: address.clone(),
            signature: sign(&imposter, &nonce.message),
            name: None,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidSignature(_)));

    // The challenge survives a failed attempt; the real key still signs in
    let ok = handlers::siwe_verify(
        State(state.clone()),
        Json(SiweVerifyRequest {
            address,
            signature: sign(&wallet, &nonce.message),
            name: None,
        }),
    )
    .await
    .unwrap()
    .0;
    assert!(ok.created);
}

#[tokio::test]
async fn siwe_check_reports_registration() {
    let state = test_state(StubGitHub::default());
    let wallet = PrivateKeySigner::random();
    let address = format!("{:#x}", wallet.address());

    let before = handlers::siwe_check(
        State(state.clone()),
        Query(CheckQuery {
            address: address.clone(),
        }),
    )
    .await
    .unwrap()
    .0;
    assert!(!before.registered);

    login(&state, &wallet, None).await;

    let after = handlers::siwe_check(State(state.clone()), Query(CheckQuery { address }))
        .await
        .unwrap()
        .0;
    assert!(after.registered);
    assert!(after.oracle.is_some());
}

// ---------------------------------------------------------------------------
// Wallet linking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn link_wallet_rejects_foreign_binding() {
    let state = test_state(StubGitHub::default());
    let owner = PrivateKeySigner::random();
    let intruder = PrivateKeySigner::random();

    login(&state, &owner, Some("SHRIMP")).await;

    let address = format!("{:#x}", intruder.address());
    let nonce = handlers::request_nonce(
        State(state.clone()),
        Json(NonceRequest {
            address: address.clone(),
        }),
    )
    .await
    .unwrap()
    .0;

    let err = handlers::link_wallet(
        State(state.clone()),
        Json(LinkWalletRequest {
            address,
            signature: sign(&intruder, &nonce.message),
            oracle_name: "SHRIMP".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::AlreadyLinked(_)));
}

#[tokio::test]
async fn link_wallet_unknown_oracle_is_not_found() {
    let state = test_state(StubGitHub::default());
    let wallet = PrivateKeySigner::random();
    let address = format!("{:#x}", wallet.address());

    let nonce = handlers::request_nonce(
        State(state.clone()),
        Json(NonceRequest {
            address: address.clone(),
        }),
    )
    .await
    .unwrap()
    .0;

    let err = handlers::link_wallet(
        State(state.clone()),
        Json(LinkWalletRequest {
            address,
            signature: sign(&wallet, &nonce.message),
            oracle_name: "NOBODY".to_string(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::OracleNotFound(_)));
}

// ---------------------------------------------------------------------------
// Flow B
// ---------------------------------------------------------------------------

#[tokio::test]
async fn github_verification_binds_wallet_to_username() {
    let human = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);

    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let checked = handlers::check_verified(
        State(state.clone()),
        Query(CheckVerifiedQuery {
            wallet: format!("{:#x}", human.address()),
        }),
    )
    .await
    .unwrap()
    .0;
    assert!(checked.verified);
    assert_eq!(checked.github_username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn github_verification_signer_mismatch_writes_nothing() {
    let human = PrivateKeySigner::random();
    let other = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    // Gist proof signed by a different key than the claimed signer
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&other, "alice"));
    let state = test_state(github);

    let err = handlers::verify_github(
        State(state.clone()),
        Json(VerifyGithubRequest {
            gist_url: "https://gist.github.com/alice/abc123def456".to_string(),
            signer: format!("{:#x}", human.address()),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::SignatureMismatch { .. }));
    assert!(err.to_string().contains("Signature mismatch"));

    let checked = handlers::check_verified(
        State(state.clone()),
        Query(CheckVerifiedQuery {
            wallet: format!("{:#x}", human.address()),
        }),
    )
    .await
    .unwrap()
    .0;
    assert!(!checked.verified);
}

#[tokio::test]
async fn github_verification_surfaces_fetch_failures() {
    let state = test_state(StubGitHub::default());
    let human = PrivateKeySigner::random();

    let err = handlers::verify_github(
        State(state.clone()),
        Json(VerifyGithubRequest {
            gist_url: "https://gist.github.com/alice/feedfacefeedface".to_string(),
            signer: format!("{:#x}", human.address()),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::GitHubFetch(_)));
}

// ---------------------------------------------------------------------------
// Flow C
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assignment_requires_prior_github_verification() {
    let state = test_state(StubGitHub::default());
    let human = PrivateKeySigner::random();
    let bot = PrivateKeySigner::random();

    let err = submit_batch(&state, &human, batch_for(&[&bot])).await.unwrap_err();
    assert!(matches!(err, AppError::NotVerified(_)));
}

#[tokio::test]
async fn assignment_rejects_forged_root() {
    let human = PrivateKeySigner::random();
    let bot = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);
    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let assignments = batch_for(&[&bot]);
    // A syntactically valid signature over a root not derived from the batch
    let forged_root = format!("0x{}", "ab".repeat(32));
    let message = format!("Assign 1 bots under root {forged_root}");

    let err = handlers::assign_bots(
        State(state.clone()),
        Json(AssignBotsRequest {
            merkle_root: forged_root,
            assignments,
            signature: sign(&human, &message),
            message,
            human_wallet: format!("{:#x}", human.address()),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::RootMismatch { .. }));
}

#[tokio::test]
async fn assignment_rejects_wrong_signer() {
    let human = PrivateKeySigner::random();
    let imposter = PrivateKeySigner::random();
    let bot = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);
    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let assignments = batch_for(&[&bot]);
    let root = merkle::compute_root(&assignments).unwrap();
    let message = format!("Assign 1 bots under root {root:#x}");

    let err = handlers::assign_bots(
        State(state.clone()),
        Json(AssignBotsRequest {
            merkle_root: format!("{root:#x}"),
            assignments,
            signature: sign(&imposter, &message),
            message,
            human_wallet: format!("{:#x}", human.address()),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::SignatureMismatch { .. }));
}

#[tokio::test]
async fn empty_assignment_batch_is_rejected_before_hashing() {
    let human = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);
    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let err = handlers::assign_bots(
        State(state.clone()),
        Json(AssignBotsRequest {
            merkle_root: format!("0x{}", "00".repeat(32)),
            assignments: vec![],
            signature: "0xsig".to_string(),
            message: "msg".to_string(),
            human_wallet: format!("{:#x}", human.address()),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::EmptyAssignments));
}

// ---------------------------------------------------------------------------
// Flow D + end-to-end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_bots_inherit_one_github_identity() {
    let human = PrivateKeySigner::random();
    let bots: Vec<PrivateKeySigner> = (0..3).map(|_| PrivateKeySigner::random()).collect();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);
    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let assignments = batch_for(&bots.iter().collect::<Vec<_>>());
    let accepted = submit_batch(&state, &human, assignments.clone()).await.unwrap();
    assert_eq!(accepted.bot_count, 3);
    assert_eq!(accepted.github_username, "alice");

    let mut oracle_ids = Vec::new();
    for (i, bot) in bots.iter().enumerate() {
        let proof = merkle::proof_for(&assignments, i)
            .unwrap()
            .iter()
            .map(|p| format!("{p:#x}"))
            .collect();

        let claimed = claim(
            &state,
            bot,
            assignments[i].clone(),
            proof,
            accepted.merkle_root.clone(),
        )
        .await
        .unwrap();

        assert!(claimed.created);
        assert!(claimed.oracle.approved);
        assert_eq!(claimed.oracle.github_username.as_deref(), Some("alice"));
        assert_eq!(claimed.oracle.birth_issue, Some(100 + i as u64));
        assert_eq!(claimed.oracle.name, format!("ORACLE-{i}"));
        assert_eq!(
            claimed.oracle.wallet_address.as_deref(),
            Some(canonical(bot.address()).as_str())
        );
        oracle_ids.push(claimed.oracle.id);
    }

    oracle_ids.sort();
    oracle_ids.dedup();
    assert_eq!(oracle_ids.len(), 3, "three distinct oracle accounts");
}

#[tokio::test]
async fn claim_against_unknown_root_is_rejected() {
    let state = test_state(StubGitHub::default());
    let bot = PrivateKeySigner::random();
    let assignments = batch_for(&[&bot]);
    let root = merkle::compute_root(&assignments).unwrap();

    let err = claim(
        &state,
        &bot,
        assignments[0].clone(),
        vec![],
        format!("{root:#x}"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::RootNotFound(_)));
}

#[tokio::test]
async fn claim_with_divergent_leaf_is_rejected() {
    let human = PrivateKeySigner::random();
    let bot = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);
    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let assignments = batch_for(&[&bot]);
    let accepted = submit_batch(&state, &human, assignments.clone()).await.unwrap();

    // Same bot, different oracle name than the human committed to
    let mut forged_leaf = assignments[0].clone();
    forged_leaf.oracle = "STOLEN-NAME".to_string();
    let proof = merkle::proof_for(&assignments, 0)
        .unwrap()
        .iter()
        .map(|p| format!("{p:#x}"))
        .collect();

    let err = claim(&state, &bot, forged_leaf, proof, accepted.merkle_root)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::LeafMismatch));
}

#[tokio::test]
async fn claim_by_unassigned_bot_is_rejected() {
    let human = PrivateKeySigner::random();
    let bot = PrivateKeySigner::random();
    let outsider = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);
    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let assignments = batch_for(&[&bot]);
    let accepted = submit_batch(&state, &human, assignments.clone()).await.unwrap();

    let mut leaf = assignments[0].clone();
    leaf.bot = outsider.address();

    let err = claim(&state, &outsider, leaf, vec![], accepted.merkle_root)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotAssigned(_)));
}

#[tokio::test]
async fn claim_with_tampered_proof_is_rejected() {
    let human = PrivateKeySigner::random();
    let bots: Vec<PrivateKeySigner> = (0..2).map(|_| PrivateKeySigner::random()).collect();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);
    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let assignments = batch_for(&bots.iter().collect::<Vec<_>>());
    let accepted = submit_batch(&state, &human, assignments.clone()).await.unwrap();

    // Proof for leaf 1 does not prove leaf 0
    let wrong_proof = merkle::proof_for(&assignments, 1)
        .unwrap()
        .iter()
        .map(|p| format!("{p:#x}"))
        .collect();

    let err = claim(
        &state,
        &bots[0],
        assignments[0].clone(),
        wrong_proof,
        accepted.merkle_root,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidProof));
}

#[tokio::test]
async fn claim_with_wrong_bot_signature_is_rejected() {
    let human = PrivateKeySigner::random();
    let bot = PrivateKeySigner::random();
    let imposter = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&human, "alice"));
    let state = test_state(github);
    verify_github_for(&state, &human, "https://gist.github.com/alice/abc123def456").await;

    let assignments = batch_for(&[&bot]);
    let accepted = submit_batch(&state, &human, assignments.clone()).await.unwrap();

    let proof: Vec<String> = merkle::proof_for(&assignments, 0)
        .unwrap()
        .iter()
        .map(|p| format!("{p:#x}"))
        .collect();
    let message = format!("Claim oracle identity under root {}", accepted.merkle_root);

    let err = handlers::claim_bot(
        State(state.clone()),
        Json(ClaimBotRequest {
            signature: sign(&imposter, &message),
            message,
            bot_wallet: format!("{:#x}", bot.address()),
            leaf: assignments[0].clone(),
            proof,
            merkle_root: accepted.merkle_root,
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::SignatureMismatch { .. }));
}

// ---------------------------------------------------------------------------
// Legacy claim
// ---------------------------------------------------------------------------

#[tokio::test]
async fn legacy_claim_binds_bot_via_issue_comment() {
    let bot = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&bot, "alice"));
    github.comments.insert(
        991122,
        IssueComment {
            author_login: "alice".to_string(),
        },
    );
    let state = test_state(github);

    let claimed = handlers::claim_legacy(
        State(state.clone()),
        Json(LegacyClaimRequest {
            name: Some("SHRIMP".to_string()),
            gist_url: "https://gist.github.com/alice/abc123def456".to_string(),
            issue_url: "https://github.com/Soul-Brews-Studio/oracle-v2/issues/57#issuecomment-991122"
                .to_string(),
            signer: format!("{:#x}", bot.address()),
        }),
    )
    .await
    .unwrap()
    .0;

    assert!(claimed.created);
    assert_eq!(claimed.oracle.name, "SHRIMP");
    assert_eq!(claimed.oracle.github_username.as_deref(), Some("alice"));
    assert_eq!(claimed.oracle.birth_issue, Some(57));
    assert!(claimed.oracle.approved);
}

#[tokio::test]
async fn legacy_claim_rejects_comment_author_mismatch() {
    let bot = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&bot, "alice"));
    github.comments.insert(
        991122,
        IssueComment {
            author_login: "mallory".to_string(),
        },
    );
    let state = test_state(github);

    let err = handlers::claim_legacy(
        State(state.clone()),
        Json(LegacyClaimRequest {
            name: None,
            gist_url: "https://gist.github.com/alice/abc123def456".to_string(),
            issue_url: "https://github.com/Soul-Brews-Studio/oracle-v2/issues/57#issuecomment-991122"
                .to_string(),
            signer: format!("{:#x}", bot.address()),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::GithubUserMismatch { .. }));
}

#[tokio::test]
async fn legacy_claim_rejects_bad_issue_url() {
    let bot = PrivateKeySigner::random();
    let mut github = StubGitHub::default();
    github
        .gists
        .insert("abc123def456".to_string(), proof_gist(&bot, "alice"));
    let state = test_state(github);

    let err = handlers::claim_legacy(
        State(state.clone()),
        Json(LegacyClaimRequest {
            name: None,
            gist_url: "https://gist.github.com/alice/abc123def456".to_string(),
            issue_url: "https://github.com/Soul-Brews-Studio/oracle-v2/issues/57".to_string(),
            signer: format!("{:#x}", bot.address()),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidIssueUrl(_)));
}
