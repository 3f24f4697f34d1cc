//! Account and proxy loading
//!
//! `account.json` holds a JSON array of `{ "bearer", "geminiApiKey" }`
//! records. `proxy.txt` holds one proxy URI per line. Proxies are handed to
//! accounts round-robin by index.

use std::path::Path;

use crate::types::{Account, AccountSlot, ProxyAssignment};
use crate::{Result, VoyageError};

/// Default account file name
pub const DEFAULT_ACCOUNTS_FILE: &str = "account.json";

/// Default proxy file name
pub const DEFAULT_PROXIES_FILE: &str = "proxy.txt";

/// Parse account records from JSON text
pub fn parse_accounts(content: &str) -> Result<Vec<Account>> {
    let accounts: Vec<Account> = serde_json::from_str(content)
        .map_err(|e| VoyageError::Accounts(format!("Invalid account data: {}", e)))?;

    if accounts.is_empty() {
        return Err(VoyageError::Accounts("Account list is empty".to_string()));
    }

    if let Some(pos) = accounts
        .iter()
        .position(|a| a.bearer.trim().is_empty() || a.gemini_api_key.trim().is_empty())
    {
        return Err(VoyageError::Accounts(format!(
            "Account {} is missing its bearer token or geminiApiKey",
            pos + 1
        )));
    }

    Ok(accounts)
}

/// Load accounts from `path`; a missing, malformed or empty file is an error
pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VoyageError::Accounts(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let accounts = parse_accounts(&content)?;
    tracing::info!("Loaded {} account(s) from {:?}", accounts.len(), path);
    Ok(accounts)
}

/// Parse newline-delimited proxy URIs, skipping blank lines
pub fn parse_proxies(content: &str) -> Vec<ProxyAssignment> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ProxyAssignment::new)
        .collect()
}

/// Load proxies from `path`
pub fn load_proxies(path: &Path) -> Result<Vec<ProxyAssignment>> {
    let content = std::fs::read_to_string(path)?;
    let proxies = parse_proxies(&content);
    tracing::info!("Loaded {} prox(ies) from {:?}", proxies.len(), path);
    Ok(proxies)
}

/// Pair every account with its proxy (`proxies[i % len]`), or none when the pool is empty
pub fn assign_proxies(accounts: Vec<Account>, proxies: &[ProxyAssignment]) -> Vec<AccountSlot> {
    accounts
        .into_iter()
        .enumerate()
        .map(|(index, account)| {
            let proxy = if proxies.is_empty() {
                None
            } else {
                Some(proxies[index % proxies.len()].clone())
            };
            AccountSlot::new(index, account, proxy)
        })
        .collect()
}
