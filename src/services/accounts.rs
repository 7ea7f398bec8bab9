//! Oracle account resolution
//!
//! Maps a verified identity to a persistent account record in the external
//! record store: create-if-absent, merge-update-if-present, then mint a
//! session token. The store is behind a trait so flows can run against the
//! in-memory implementation (standalone mode and tests) or the PocketBase-
//! style REST client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;
use crate::models::OracleAccount;
use crate::services::session::SessionSigner;
use crate::services::signature::canonical;

#[derive(Error, Debug)]
pub enum AccountStoreError {
    #[error("record store error: {0}")]
    Upstream(String),
}

impl From<AccountStoreError> for AppError {
    fn from(err: AccountStoreError) -> Self {
        AppError::UpstreamAccount(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub wallet_address: Option<String>,
    pub github_username: Option<String>,
    pub birth_issue: Option<u64>,
    pub approved: bool,
    pub karma: i64,
}

/// Partial update; `None` fields are left untouched in the stored record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_issue: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.wallet_address.is_none()
            && self.github_username.is_none()
            && self.birth_issue.is_none()
            && self.approved.is_none()
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_wallet(&self, wallet: &str)
        -> Result<Option<OracleAccount>, AccountStoreError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<OracleAccount>, AccountStoreError>;

    async fn create(&self, account: NewAccount) -> Result<OracleAccount, AccountStoreError>;

    async fn update(
        &self,
        id: &str,
        update: AccountUpdate,
    ) -> Result<OracleAccount, AccountStoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store (standalone mode, tests)
// ---------------------------------------------------------------------------

pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, OracleAccount>>,
    next_id: AtomicU64,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_update(account: &mut OracleAccount, update: AccountUpdate) {
    if let Some(name) = update.name {
        account.name = name;
    }
    if let Some(wallet) = update.wallet_address {
        account.wallet_address = Some(wallet);
    }
    if let Some(github) = update.github_username {
        account.github_username = Some(github);
    }
    if let Some(issue) = update.birth_issue {
        account.birth_issue = Some(issue);
    }
    if let Some(approved) = update.approved {
        account.approved = approved;
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_wallet(
        &self,
        wallet: &str,
    ) -> Result<Option<OracleAccount>, AccountStoreError> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .values()
            .find(|a| a.wallet_address.as_deref() == Some(wallet))
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<OracleAccount>, AccountStoreError> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .values()
            .find(|a| a.name == name)
            .cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<OracleAccount, AccountStoreError> {
        let id = format!("orc{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = OracleAccount {
            id: id.clone(),
            name: account.name,
            email: account.email,
            wallet_address: account.wallet_address,
            github_username: account.github_username,
            birth_issue: account.birth_issue,
            approved: account.approved,
            karma: account.karma,
        };
        self.accounts.write().unwrap().insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        update: AccountUpdate,
    ) -> Result<OracleAccount, AccountStoreError> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| AccountStoreError::Upstream(format!("no account {id}")))?;
        apply_update(account, update);
        Ok(account.clone())
    }
}

// ---------------------------------------------------------------------------
// External record store client (PocketBase-style REST API)
// ---------------------------------------------------------------------------

pub struct RecordStoreClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordList {
    items: Vec<OracleAccount>,
}

/// Escape a value for embedding in a single-quoted filter literal. Without
/// this, a quote in a client-supplied oracle name rewrites the filter
/// expression itself.
fn filter_value(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

impl RecordStoreClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn records_url(&self) -> String {
        format!("{}/api/collections/oracles/records", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", token),
            None => request,
        }
    }

    async fn find_one(&self, filter: String) -> Result<Option<OracleAccount>, AccountStoreError> {
        let request = self
            .http
            .get(self.records_url())
            .query(&[("filter", filter.as_str()), ("perPage", "1")]);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AccountStoreError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AccountStoreError::Upstream(format!(
                "list failed with status {}",
                response.status()
            )));
        }

        let list: RecordList = response
            .json()
            .await
            .map_err(|e| AccountStoreError::Upstream(e.to_string()))?;
        Ok(list.items.into_iter().next())
    }
}

#[async_trait]
impl AccountStore for RecordStoreClient {
    async fn find_by_wallet(
        &self,
        wallet: &str,
    ) -> Result<Option<OracleAccount>, AccountStoreError> {
        self.find_one(format!("(wallet_address='{}')", filter_value(wallet)))
            .await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<OracleAccount>, AccountStoreError> {
        self.find_one(format!("(name='{}')", filter_value(name))).await
    }

    async fn create(&self, account: NewAccount) -> Result<OracleAccount, AccountStoreError> {
        let request = self.http.post(self.records_url()).json(&account);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AccountStoreError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AccountStoreError::Upstream(format!(
                "create failed with status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AccountStoreError::Upstream(e.to_string()))
    }

    async fn update(
        &self,
        id: &str,
        update: AccountUpdate,
    ) -> Result<OracleAccount, AccountStoreError> {
        let request = self
            .http
            .patch(format!("{}/{id}", self.records_url()))
            .json(&update);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AccountStoreError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AccountStoreError::Upstream(format!(
                "update failed with status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AccountStoreError::Upstream(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Attributes merged into an account on resolution. `None` fields never
/// overwrite existing values.
#[derive(Debug, Clone, Default)]
pub struct AccountAttributes {
    pub name: Option<String>,
    pub github_username: Option<String>,
    pub birth_issue: Option<u64>,
    pub approved: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub account: OracleAccount,
    pub created: bool,
    pub token: String,
}

pub struct AccountResolver {
    store: Arc<dyn AccountStore>,
    sessions: SessionSigner,
}

/// Synthetic email derived from the wallet so the record store's
/// email-uniqueness constraint holds without a real address.
fn wallet_email(wallet_key: &str) -> String {
    format!("{}@wallet.oraclenet", &wallet_key[2..10])
}

fn default_name(wallet_key: &str) -> String {
    format!("Oracle-{}", &wallet_key[..8])
}

impl AccountResolver {
    pub fn new(store: Arc<dyn AccountStore>, sessions: SessionSigner) -> Self {
        Self { store, sessions }
    }

    /// Find-or-create the account for a wallet, merge in `attrs`, and mint a
    /// fresh session token. `initial_name` is only a creation hint and never
    /// renames an existing account.
    pub async fn resolve(
        &self,
        wallet: Address,
        initial_name: Option<String>,
        attrs: AccountAttributes,
    ) -> Result<Resolved, AppError> {
        let wallet_key = canonical(wallet);

        let (account, created) = match self.store.find_by_wallet(&wallet_key).await? {
            Some(existing) => {
                let update = AccountUpdate {
                    name: attrs.name,
                    wallet_address: None,
                    github_username: attrs.github_username,
                    birth_issue: attrs.birth_issue,
                    approved: attrs.approved,
                };
                let account = if update.is_empty() {
                    existing
                } else {
                    self.store.update(&existing.id, update).await?
                };
                (account, false)
            }
            None => {
                let name = attrs
                    .name
                    .or(initial_name)
                    .unwrap_or_else(|| default_name(&wallet_key));
                let account = self
                    .store
                    .create(NewAccount {
                        name,
                        email: wallet_email(&wallet_key),
                        wallet_address: Some(wallet_key.clone()),
                        github_username: attrs.github_username,
                        birth_issue: attrs.birth_issue,
                        approved: attrs.approved.unwrap_or(true),
                        karma: 0,
                    })
                    .await?;
                (account, true)
            }
        };

        let token = self
            .sessions
            .issue(&wallet_key, &account.id)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Resolved {
            account,
            created,
            token,
        })
    }

    /// Bind a wallet to a pre-existing named account. Rejected when the
    /// account is already linked to a different wallet.
    pub async fn link(&self, wallet: Address, oracle_name: &str) -> Result<Resolved, AppError> {
        let wallet_key = canonical(wallet);

        let account = self
            .store
            .find_by_name(oracle_name)
            .await?
            .ok_or_else(|| AppError::OracleNotFound(oracle_name.to_string()))?;

        match account.wallet_address.as_deref() {
            Some(existing) if existing != wallet_key => {
                return Err(AppError::AlreadyLinked(oracle_name.to_string()));
            }
            _ => {}
        }

        let account = self
            .store
            .update(
                &account.id,
                AccountUpdate {
                    wallet_address: Some(wallet_key.clone()),
                    ..AccountUpdate::default()
                },
            )
            .await?;

        let token = self
            .sessions
            .issue(&wallet_key, &account.id)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Resolved {
            account,
            created: false,
            token,
        })
    }
}
