//! Error types for the identity server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // Validation, rejected before any external call
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid Ethereum address: {0}")]
    InvalidAddress(String),

    #[error("Invalid Merkle root: {0}")]
    InvalidRoot(String),

    #[error("Assignment list must not be empty")]
    EmptyAssignments,

    #[error("Invalid GitHub gist URL: {0}")]
    InvalidGistUrl(String),

    #[error("Invalid GitHub issue URL: {0}")]
    InvalidIssueUrl(String),

    // Challenge
    #[error("No nonce found for this address. Request a nonce first")]
    NoChallenge,

    #[error("Signed message does not match the issued challenge")]
    MessageMismatch,

    // Crypto verification
    #[error("Signature verification failed: {0}")]
    InvalidSignature(String),

    #[error("Signature mismatch: expected {expected}, recovered {recovered}")]
    SignatureMismatch { expected: String, recovered: String },

    // External GitHub fetch
    #[error("GitHub fetch failed: {0}")]
    GitHubFetch(String),

    #[error("GitHub comment fetch failed: {0}")]
    CommentFetch(String),

    #[error("Gist has no files")]
    NoFilesInGist,

    #[error("Gist proof is not valid JSON with message and signature")]
    InvalidProofJson,

    #[error("Gist owner could not be resolved")]
    OwnerUnresolvable,

    #[error("Issue comment author @{comment_author} does not match gist owner @{gist_owner}")]
    GithubUserMismatch {
        gist_owner: String,
        comment_author: String,
    },

    // Consistency: client bug or forgery attempt, always rejected
    #[error("Recomputed Merkle root {computed} does not match submitted root {claimed}")]
    RootMismatch { claimed: String, computed: String },

    #[error("Submitted leaf does not match the stored assignment for this bot")]
    LeafMismatch,

    #[error("Merkle proof does not verify against the stored root")]
    InvalidProof,

    // State
    #[error("Wallet {0} has no GitHub verification record")]
    NotVerified(String),

    #[error("No assignment batch found for Merkle root {0}")]
    RootNotFound(String),

    #[error("Bot {0} is not assigned under this Merkle root")]
    NotAssigned(String),

    #[error("No oracle named {0}")]
    OracleNotFound(String),

    #[error("Oracle {0} is already linked to a different wallet")]
    AlreadyLinked(String),

    // External account store
    #[error("Account store error: {0}")]
    UpstreamAccount(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable reason code surfaced alongside the message.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::MissingField(_) => "MissingField",
            AppError::InvalidAddress(_) => "InvalidAddress",
            AppError::InvalidRoot(_) => "InvalidRoot",
            AppError::EmptyAssignments => "EmptyAssignments",
            AppError::InvalidGistUrl(_) => "InvalidGistUrl",
            AppError::InvalidIssueUrl(_) => "InvalidIssueUrl",
            AppError::NoChallenge => "NoChallenge",
            AppError::MessageMismatch => "MessageMismatch",
            AppError::InvalidSignature(_) => "InvalidSignature",
            AppError::SignatureMismatch { .. } => "SignatureMismatch",
            AppError::GitHubFetch(_) => "GistFetchFailed",
            AppError::CommentFetch(_) => "CommentFetchFailed",
            AppError::NoFilesInGist => "NoFilesInGist",
            AppError::InvalidProofJson => "InvalidProofJson",
            AppError::OwnerUnresolvable => "OwnerUnresolvable",
            AppError::GithubUserMismatch { .. } => "GithubUserMismatch",
            AppError::RootMismatch { .. } => "RootMismatch",
            AppError::LeafMismatch => "LeafMismatch",
            AppError::InvalidProof => "InvalidProof",
            AppError::NotVerified(_) => "NotVerified",
            AppError::RootNotFound(_) => "RootNotFound",
            AppError::NotAssigned(_) => "NotAssigned",
            AppError::OracleNotFound(_) => "OracleNotFound",
            AppError::AlreadyLinked(_) => "AlreadyLinked",
            AppError::UpstreamAccount(_) => "UpstreamAccountError",
            AppError::Internal(_) => "Internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingField(_)
            | AppError::InvalidAddress(_)
            | AppError::InvalidRoot(_)
            | AppError::EmptyAssignments
            | AppError::InvalidGistUrl(_)
            | AppError::InvalidIssueUrl(_) => StatusCode::BAD_REQUEST,

            AppError::NoChallenge
            | AppError::MessageMismatch
            | AppError::InvalidSignature(_)
            | AppError::SignatureMismatch { .. } => StatusCode::UNAUTHORIZED,

            AppError::GitHubFetch(_) | AppError::CommentFetch(_) => StatusCode::BAD_GATEWAY,

            AppError::NoFilesInGist
            | AppError::InvalidProofJson
            | AppError::OwnerUnresolvable
            | AppError::GithubUserMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::RootMismatch { .. } | AppError::LeafMismatch | AppError::InvalidProof => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            AppError::NotVerified(_) => StatusCode::FORBIDDEN,

            AppError::RootNotFound(_)
            | AppError::NotAssigned(_)
            | AppError::OracleNotFound(_) => StatusCode::NOT_FOUND,

            AppError::AlreadyLinked(_) => StatusCode::CONFLICT,

            AppError::UpstreamAccount(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "reason": self.reason(),
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}
