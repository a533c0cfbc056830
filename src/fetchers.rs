//! Network collaborator seams
//!
//! The parser itself never performs I/O. Callers that need address-table
//! contents, token account metadata or pool state resolved implement these
//! traits and run them before handing the transaction in.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Resolved contents of one address lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AltAddresses {
    pub writable: Vec<String>,
    pub readonly: Vec<String>,
}

/// Controls when a caller bothers resolving lookup tables at all.
#[derive(Debug, Clone, PartialEq)]
pub enum AltTrigger {
    /// Resolve for every versioned transaction.
    All,
    /// Resolve only when one of these programs appears in the transaction.
    ProgramIds(Vec<String>),
    /// Resolve only when one of these accounts appears in the transaction.
    Accounts(Vec<String>),
}

impl AltTrigger {
    pub fn matches(&self, program_ids: &[String], account_keys: &[String]) -> bool {
        match self {
            Self::All => true,
            Self::ProgramIds(wanted) => wanted.iter().any(|w| program_ids.contains(w)),
            Self::Accounts(wanted) => wanted.iter().any(|w| account_keys.contains(w)),
        }
    }
}

/// Fetches address lookup tables referenced by a versioned transaction,
/// keyed by table account.
#[async_trait]
pub trait AltFetcher: Send + Sync {
    async fn fetch(&self, table_keys: &[String]) -> Result<HashMap<String, AltAddresses>, FetchError>;
}

/// Mint and decimals for one token account, as an RPC would report it.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAccountInfo {
    pub mint: String,
    pub owner: String,
    pub decimals: u8,
}

/// Fetches token account metadata; the result is positionally aligned with
/// the request, `None` for accounts that do not exist or are not token
/// accounts.
#[async_trait]
pub trait TokenAccountFetcher: Send + Sync {
    async fn fetch(&self, keys: &[String]) -> Result<Vec<Option<TokenAccountInfo>>, FetchError>;
}

/// Fetches raw pool state for enrichment; the shape is pool specific so the
/// result stays untyped.
#[async_trait]
pub trait PoolInfoFetcher: Send + Sync {
    async fn fetch(&self, pool_keys: &[String]) -> Result<Vec<Value>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_matching() {
        let programs = vec!["P1".to_string()];
        let accounts = vec!["A1".to_string(), "A2".to_string()];
        assert!(AltTrigger::All.matches(&programs, &accounts));
        assert!(AltTrigger::ProgramIds(vec!["P1".into()]).matches(&programs, &accounts));
        assert!(!AltTrigger::ProgramIds(vec!["P9".into()]).matches(&programs, &accounts));
        assert!(AltTrigger::Accounts(vec!["A2".into()]).matches(&programs, &accounts));
        assert!(!AltTrigger::Accounts(vec!["A9".into()]).matches(&programs, &accounts));
    }

    struct StaticAlt;

    #[async_trait]
    impl AltFetcher for StaticAlt {
        async fn fetch(
            &self,
            table_keys: &[String],
        ) -> Result<HashMap<String, AltAddresses>, FetchError> {
            Ok(table_keys
                .iter()
                .map(|k| (k.clone(), AltAddresses::default()))
                .collect())
        }
    }

    #[tokio::test]
    async fn fetcher_traits_are_object_safe() {
        let fetcher: Box<dyn AltFetcher> = Box::new(StaticAlt);
        let out = fetcher.fetch(&["tbl".to_string()]).await.unwrap();
        assert!(out.contains_key("tbl"));
    }
}
