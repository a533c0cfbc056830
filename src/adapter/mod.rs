//! Transaction adapter - unified access layer over both wire encodings
//!
//! Normalizes legacy and versioned transactions into one view: an
//! index-stable account-key table, a per-parse token registry
//! (account -> mint/decimals), and SOL/SPL balance deltas. Construction is
//! the only pass that builds state; every query afterwards is a
//! deterministic function of the immutable input plus the registries.

use crate::core::constants::*;
use crate::core::events::{BalanceChange, TokenAmount};
use crate::error::ParseError;
use crate::input::*;
use serde_json::Value;
use std::collections::HashMap;

/// Unified instruction view produced by [`TransactionAdapter::resolve_instruction`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstruction {
    pub program_id: String,
    pub accounts: Vec<String>,
    pub data: Vec<u8>,
    pub parsed: Option<ParsedPayload>,
}

/// Structured `{type, info}` payload of a pre-parsed instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPayload {
    pub kind: String,
    pub info: Value,
}

impl ParsedPayload {
    pub fn info_str(&self, field: &str) -> Option<&str> {
        self.info.get(field).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TokenAccountMeta {
    mint: String,
    decimals: u8,
}

/// Per-parse adapter over one transaction. The token/decimals registries are
/// private to the instance, so independent parses may run concurrently.
pub struct TransactionAdapter<'a> {
    input: &'a TransactionInput,
    message: &'a Message,
    versioned: bool,
    account_keys: Vec<String>,
    registry: HashMap<String, TokenAccountMeta>,
    mint_decimals: HashMap<String, u8>,
    owners: HashMap<String, String>,
    token_pre: HashMap<String, TokenAmount>,
    token_post: HashMap<String, TokenAmount>,
}

impl<'a> TransactionAdapter<'a> {
    /// Builds the adapter: detects the encoding, assembles the account-key
    /// table and runs token discovery. Missing optional fields never fail
    /// the build; only a missing message does.
    pub fn new(input: &'a TransactionInput) -> Result<Self, ParseError> {
        let message = input
            .transaction
            .message
            .as_ref()
            .ok_or(ParseError::MissingMessage)?;

        let versioned = message.header.is_some() && !message.account_keys.is_empty();

        // Account table: (legacy inline | v0 static) ++ ALT writable ++ ALT
        // readonly. Index-stable for the lifetime of this parse.
        let mut account_keys: Vec<String> = message
            .account_keys
            .iter()
            .map(|k| k.pubkey().to_string())
            .collect();
        if let Some(meta) = input.meta.as_ref() {
            account_keys.extend(meta.loaded_addresses.writable.iter().cloned());
            account_keys.extend(meta.loaded_addresses.readonly.iter().cloned());
        }

        let mut adapter = Self {
            input,
            message,
            versioned,
            account_keys,
            registry: HashMap::new(),
            mint_decimals: HashMap::new(),
            owners: HashMap::new(),
            token_pre: HashMap::new(),
            token_post: HashMap::new(),
        };
        adapter.discover_tokens();
        Ok(adapter)
    }

    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    pub fn slot(&self) -> u64 {
        self.input.slot
    }

    pub fn timestamp(&self) -> i64 {
        self.input.block_time.unwrap_or(0)
    }

    pub fn signature(&self) -> &str {
        self.input
            .transaction
            .signatures
            .first()
            .map_or("", String::as_str)
    }

    /// Index 0 of the account table is always the fee payer.
    pub fn fee_payer(&self) -> &str {
        self.account_keys.first().map_or("", String::as_str)
    }

    pub fn signers(&self) -> Vec<String> {
        if self.versioned {
            let n = self
                .message
                .header
                .map_or(0, |h| h.num_required_signatures as usize);
            self.account_keys.iter().take(n).cloned().collect()
        } else {
            self.message
                .account_keys
                .iter()
                .filter(|k| k.is_signer())
                .map(|k| k.pubkey().to_string())
                .collect()
        }
    }

    pub fn is_success(&self) -> bool {
        self.input.meta.as_ref().map_or(true, |m| m.err.is_none())
    }

    pub fn fee(&self) -> u64 {
        self.input.meta.as_ref().map_or(0, |m| m.fee)
    }

    pub fn compute_units(&self) -> Option<u64> {
        self.input.meta.as_ref()?.compute_units_consumed
    }

    pub fn account_keys(&self) -> &[String] {
        &self.account_keys
    }

    pub fn account_at(&self, index: usize) -> Option<&str> {
        self.account_keys.get(index).map(String::as_str)
    }

    pub fn instructions(&self) -> &'a [InstructionPayload] {
        &self.message.instructions
    }

    pub fn inner_groups(&self) -> &'a [InnerInstructionGroup] {
        self.input
            .meta
            .as_ref()
            .map_or(&[], |m| m.inner_instructions.as_slice())
    }

    pub fn inner_group(&self, outer_index: usize) -> Option<&'a InnerInstructionGroup> {
        self.inner_groups().iter().find(|g| g.index == outer_index)
    }

    /// Polymorphic decode into the unified instruction view. Compiled
    /// instructions resolve account indices against the table and base58
    /// decode the payload; pre-parsed ones pass their named fields through.
    /// Unresolvable program index yields `None` and the caller skips.
    pub fn resolve_instruction(
        &self,
        instruction: &InstructionPayload,
    ) -> Option<ResolvedInstruction> {
        match instruction {
            InstructionPayload::Compiled { program_id_index, accounts, data } => {
                let program_id = self.account_at(*program_id_index as usize)?.to_string();
                let accounts = accounts
                    .iter()
                    .filter_map(|&i| self.account_at(i as usize).map(str::to_string))
                    .collect();
                let data = bs58::decode(data).into_vec().unwrap_or_default();
                Some(ResolvedInstruction { program_id, accounts, data, parsed: None })
            }
            InstructionPayload::Parsed { program_id, accounts, data, parsed, .. } => {
                let data = data
                    .as_deref()
                    .map(|d| bs58::decode(d).into_vec().unwrap_or_default())
                    .unwrap_or_default();
                let parsed = parsed.as_ref().and_then(|p| {
                    let kind = p.get("type")?.as_str()?.to_string();
                    let info = p.get("info").cloned().unwrap_or(Value::Null);
                    Some(ParsedPayload { kind, info })
                });
                Some(ResolvedInstruction {
                    program_id: program_id.clone(),
                    accounts: accounts.clone(),
                    data,
                    parsed,
                })
            }
        }
    }

    pub fn mint_of(&self, account: &str) -> Option<&str> {
        self.registry.get(account).map(|m| m.mint.as_str())
    }

    pub fn decimals_of_account(&self, account: &str) -> Option<u8> {
        self.registry.get(account).map(|m| m.decimals)
    }

    /// Registry first, then the static fallback table.
    pub fn decimals_of_mint(&self, mint: &str) -> Option<u8> {
        self.mint_decimals
            .get(mint)
            .copied()
            .or_else(|| TOKEN_DECIMALS.get(mint).copied())
    }

    pub fn owner_of(&self, account: &str) -> Option<&str> {
        self.owners.get(account).map(String::as_str)
    }

    pub fn token_pre_balance(&self, account: &str) -> Option<&TokenAmount> {
        self.token_pre.get(account)
    }

    pub fn token_post_balance(&self, account: &str) -> Option<&TokenAmount> {
        self.token_post.get(account)
    }

    pub fn sol_pre_balance(&self, account: &str) -> Option<u64> {
        let meta = self.input.meta.as_ref()?;
        let index = self.account_keys.iter().position(|k| k == account)?;
        meta.pre_balances.get(index).copied()
    }

    pub fn sol_post_balance(&self, account: &str) -> Option<u64> {
        let meta = self.input.meta.as_ref()?;
        let index = self.account_keys.iter().position(|k| k == account)?;
        meta.post_balances.get(index).copied()
    }

    /// Net SOL deltas per account (or per resolved owner). Zero-net entries
    /// never appear.
    pub fn sol_balance_changes(&self, by_owner: bool) -> HashMap<String, BalanceChange> {
        let Some(meta) = self.input.meta.as_ref() else {
            return HashMap::new();
        };
        let mut pre_sums: HashMap<&str, u128> = HashMap::new();
        let mut post_sums: HashMap<&str, u128> = HashMap::new();
        for (index, key) in self.account_keys.iter().enumerate() {
            let pre = meta.pre_balances.get(index).copied().unwrap_or(0);
            let post = meta.post_balances.get(index).copied().unwrap_or(0);
            if pre == 0 && post == 0 {
                continue;
            }
            let key = if by_owner {
                self.owner_of(key).unwrap_or(key)
            } else {
                key
            };
            *pre_sums.entry(key).or_default() += pre as u128;
            *post_sums.entry(key).or_default() += post as u128;
        }

        let mut changes = HashMap::new();
        for &key in pre_sums.keys().chain(post_sums.keys()) {
            let pre = pre_sums.get(key).copied().unwrap_or(0);
            let post = post_sums.get(key).copied().unwrap_or(0);
            if let Some(change) = BalanceChange::diff(pre, post, SOL_DECIMALS) {
                changes.insert(key.to_string(), change);
            }
        }
        changes
    }

    /// Net SPL deltas, merged by (key, mint) where key is the token account
    /// address or its resolved owner. Zero-net entries never appear.
    pub fn token_balance_changes(
        &self,
        by_owner: bool,
    ) -> HashMap<String, HashMap<String, BalanceChange>> {
        let Some(meta) = self.input.meta.as_ref() else {
            return HashMap::new();
        };

        let pre_sums = self.accumulate_token_sums(&meta.pre_token_balances, by_owner);
        let post_sums = self.accumulate_token_sums(&meta.post_token_balances, by_owner);

        let mut changes: HashMap<String, HashMap<String, BalanceChange>> = HashMap::new();
        for &(key, mint) in pre_sums.keys().chain(post_sums.keys()) {
            let (pre, pre_decimals) = pre_sums.get(&(key, mint)).copied().unwrap_or((0, 0));
            let (post, post_decimals) = post_sums.get(&(key, mint)).copied().unwrap_or((0, 0));
            let decimals = if post_decimals != 0 { post_decimals } else { pre_decimals };
            if let Some(change) = BalanceChange::diff(pre, post, decimals) {
                changes
                    .entry(key.to_string())
                    .or_default()
                    .insert(mint.to_string(), change);
            }
        }
        changes
    }

    fn accumulate_token_sums<'b>(
        &'b self,
        balances: &'b [TokenBalance],
        by_owner: bool,
    ) -> HashMap<(&'b str, &'b str), (u128, u8)> {
        let mut sums: HashMap<(&str, &str), (u128, u8)> = HashMap::new();
        for balance in balances {
            let Some(account) = self.account_at(balance.account_index) else {
                continue;
            };
            let key = if by_owner {
                balance.owner.as_deref().unwrap_or(account)
            } else {
                account
            };
            let amount: u128 = balance.ui_token_amount.amount.parse().unwrap_or(0);
            let entry = sums
                .entry((key, balance.mint.as_str()))
                .or_insert((0, balance.ui_token_amount.decimals));
            entry.0 += amount;
        }
        sums
    }

    /// One-time token discovery. The authoritative source is the pre/post
    /// token balances; the fallback scans every token-program instruction
    /// (top-level and inner) and infers account/mint bindings from the
    /// opcode-specific byte layouts. SOL is always present at 9 decimals.
    fn discover_tokens(&mut self) {
        self.mint_decimals.insert(SOL_MINT.to_string(), SOL_DECIMALS);

        if let Some(meta) = self.input.meta.as_ref() {
            for balance in meta.pre_token_balances.iter().chain(&meta.post_token_balances) {
                let Some(account) = self.account_keys.get(balance.account_index).cloned() else {
                    continue;
                };
                let decimals = balance.ui_token_amount.decimals;
                self.registry.insert(
                    account.clone(),
                    TokenAccountMeta { mint: balance.mint.clone(), decimals },
                );
                self.mint_decimals.insert(balance.mint.clone(), decimals);
                if let Some(owner) = balance.owner.clone() {
                    self.owners.insert(account, owner);
                }
            }
            for balance in &meta.pre_token_balances {
                if let Some(account) = self.account_keys.get(balance.account_index) {
                    self.token_pre
                        .insert(account.clone(), token_amount_of(&balance.ui_token_amount));
                }
            }
            for balance in &meta.post_token_balances {
                if let Some(account) = self.account_keys.get(balance.account_index) {
                    self.token_post
                        .insert(account.clone(), token_amount_of(&balance.ui_token_amount));
                }
            }
        }

        // Fallback pass over every token-program instruction.
        let scanned: Vec<ResolvedInstruction> = self
            .instructions()
            .iter()
            .chain(self.inner_groups().iter().flat_map(|g| g.instructions.iter()))
            .filter_map(|ix| self.resolve_instruction(ix))
            .filter(|ix| is_token_program(&ix.program_id))
            .collect();
        for ix in &scanned {
            self.register_from_token_instruction(ix);
        }
    }

    /// Opcode-specific account/mint inference. Layout: opcode byte at 0,
    /// u64 LE amount at 1..9, decimals byte at 9 for the Checked variants.
    fn register_from_token_instruction(&mut self, ix: &ResolvedInstruction) {
        if let Some(parsed) = ix.parsed.clone() {
            self.register_from_parsed(&parsed);
            return;
        }
        let Some(&opcode) = ix.data.first() else { return };
        let accounts = &ix.accounts;
        let checked_decimals = ix.data.get(9).copied();
        match opcode {
            // transfer: [source, destination, authority] - no mint in the
            // layout; propagate a known binding across the pair.
            3 => {
                let (Some(source), Some(destination)) = (accounts.first(), accounts.get(1)) else {
                    return;
                };
                let known = self
                    .registry
                    .get(source)
                    .or_else(|| self.registry.get(destination))
                    .cloned();
                if let Some(meta) = known {
                    self.register(source, &meta.mint, meta.decimals);
                    self.register(destination, &meta.mint, meta.decimals);
                }
            }
            // transferChecked: [source, mint, destination, authority]
            12 => {
                let (Some(source), Some(mint), Some(destination)) =
                    (accounts.first(), accounts.get(1), accounts.get(2))
                else {
                    return;
                };
                let decimals = checked_decimals
                    .or_else(|| self.decimals_of_mint(mint))
                    .unwrap_or(0);
                self.register(source, mint, decimals);
                self.register(destination, mint, decimals);
            }
            // mintTo / mintToChecked: [mint, destination, authority]
            7 | 14 => {
                let (Some(mint), Some(destination)) = (accounts.first(), accounts.get(1)) else {
                    return;
                };
                let decimals = checked_decimals
                    .filter(|_| opcode == 14)
                    .or_else(|| self.decimals_of_mint(mint))
                    .unwrap_or(0);
                self.register(destination, mint, decimals);
            }
            // burn / burnChecked: [account, mint, authority]
            8 | 15 => {
                let (Some(account), Some(mint)) = (accounts.first(), accounts.get(1)) else {
                    return;
                };
                let decimals = checked_decimals
                    .filter(|_| opcode == 15)
                    .or_else(|| self.decimals_of_mint(mint))
                    .unwrap_or(0);
                self.register(account, mint, decimals);
            }
            // closeAccount carries no mint information.
            9 => {}
            _ => {}
        }
    }

    fn register_from_parsed(&mut self, parsed: &ParsedPayload) {
        let Some(mint) = parsed.info_str("mint").map(str::to_string) else {
            return;
        };
        let decimals = parsed
            .info
            .get("tokenAmount")
            .and_then(|t| t.get("decimals"))
            .and_then(Value::as_u64)
            .map(|d| d as u8)
            .or_else(|| self.decimals_of_mint(&mint))
            .unwrap_or(0);
        for field in ["source", "destination", "account"] {
            if let Some(account) = parsed.info_str(field).map(str::to_string) {
                self.register(&account, &mint, decimals);
            }
        }
    }

    /// Token-balance registrations are authoritative and run first; the
    /// instruction scan only fills gaps.
    fn register(&mut self, account: &str, mint: &str, decimals: u8) {
        self.registry
            .entry(account.to_string())
            .or_insert_with(|| TokenAccountMeta { mint: mint.to_string(), decimals });
        self.mint_decimals
            .entry(mint.to_string())
            .or_insert(decimals);
    }
}

fn token_amount_of(ui: &UiTokenAmount) -> TokenAmount {
    TokenAmount {
        amount: ui.amount.clone(),
        ui_amount: ui.ui_amount,
        decimals: ui.decimals,
    }
}
