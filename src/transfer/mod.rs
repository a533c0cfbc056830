//! Transfer classifier
//!
//! Single linear pass over outer instructions and their inner-instruction
//! groups, producing a map of semantic transfer events keyed
//! `"programId:outer-inner"` for later correlation by the protocol decoders.
//!
//! Attribution: each inner group starts keyed by the outer instruction's own
//! program (groups owned by the system program are skipped entirely), and is
//! re-keyed to an inner instruction's program whenever that program is
//! neither the system program nor in the vault/passthrough ignore list - CPI
//! callees own their transfers even when invoked through a routing outer
//! instruction.
//!
//! Failure policy: insufficient accounts or bytes produce no event; an
//! unresolved mint drops the event, except native transfers which always
//! resolve to SOL.

use crate::adapter::{ResolvedInstruction, TransactionAdapter};
use crate::core::constants::*;
use crate::core::events::{TokenAmount, TransferEvent, TransferKind};
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

/// Opt-in extra action kinds, passed by value through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtraActions {
    pub mint_to: bool,
    pub mint_to_checked: bool,
    pub burn: bool,
    pub burn_checked: bool,
}

impl ExtraActions {
    pub const NONE: Self = Self {
        mint_to: false,
        mint_to_checked: false,
        burn: false,
        burn_checked: false,
    };

    pub const ALL: Self = Self {
        mint_to: true,
        mint_to_checked: true,
        burn: true,
        burn_checked: true,
    };

    fn allows(&self, kind: TransferKind) -> bool {
        match kind {
            TransferKind::MintTo => self.mint_to,
            TransferKind::MintToChecked => self.mint_to_checked,
            TransferKind::Burn => self.burn,
            TransferKind::BurnChecked => self.burn_checked,
            _ => true,
        }
    }
}

/// Numeric (outer, inner) view of an `"outer"` / `"outer-inner"` index
/// string; inner defaults below any real inner index so outer-only entries
/// sort first.
pub fn parse_idx(idx: &str) -> (i64, i64) {
    match idx.split_once('-') {
        Some((outer, inner)) => (
            outer.parse().unwrap_or(i64::MAX),
            inner.parse().unwrap_or(i64::MAX),
        ),
        None => (idx.parse().unwrap_or(i64::MAX), -1),
    }
}

/// Map of semantic transfer events keyed by owning program and instruction
/// position.
#[derive(Debug, Default)]
pub struct TransferActionMap {
    map: HashMap<String, Vec<TransferEvent>>,
}

impl TransferActionMap {
    fn push(&mut self, key: String, event: TransferEvent) {
        self.map.entry(key).or_default().push(event);
    }

    pub fn get(&self, key: &str) -> Option<&[TransferEvent]> {
        self.map.get(key).map(Vec::as_slice)
    }

    /// All transfers attributed to `program_id` under outer instruction
    /// `outer_index`, in instruction order. Covers both the exact
    /// `"pid:outer"` key and every `"pid:outer-inner"` key.
    pub fn transfers_for(&self, program_id: &str, outer_index: usize) -> Vec<TransferEvent> {
        let exact = format!("{program_id}:{outer_index}");
        let prefix = format!("{program_id}:{outer_index}-");
        let mut out: Vec<TransferEvent> = self
            .map
            .iter()
            .filter(|(key, _)| *key == &exact || key.starts_with(&prefix))
            .flat_map(|(_, events)| events.iter().cloned())
            .collect();
        out.sort_by_key(|e| parse_idx(&e.idx));
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<TransferEvent>)> {
        self.map.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Every event in the map, sorted by instruction position. Includes the
    /// top-level bucket: an un-wrapped outer transfer appears nowhere else.
    /// Top-level events carry outer-only indices and sort before the inner
    /// events of the same outer instruction.
    pub fn flattened(&self) -> Vec<TransferEvent> {
        let mut out: Vec<TransferEvent> = self
            .map
            .values()
            .flat_map(|events| events.iter().cloned())
            .collect();
        out.sort_by_key(|e| parse_idx(&e.idx));
        out
    }

    pub fn top_level(&self) -> &[TransferEvent] {
        self.map
            .get(TOP_LEVEL_TRANSFER_KEY)
            .map_or(&[], Vec::as_slice)
    }
}

pub struct TransferClassifier<'p, 'a> {
    adapter: &'p TransactionAdapter<'a>,
}

impl<'p, 'a> TransferClassifier<'p, 'a> {
    pub fn new(adapter: &'p TransactionAdapter<'a>) -> Self {
        Self { adapter }
    }

    /// The single pass described in the module docs, plus a separate
    /// top-level pass storing outer transfers under the constant
    /// `"transfer"` bucket to capture un-wrapped transfers.
    pub fn classify(&self, extra: ExtraActions) -> TransferActionMap {
        let mut map = TransferActionMap::default();

        for (outer_index, raw) in self.adapter.instructions().iter().enumerate() {
            let Some(outer) = self.adapter.resolve_instruction(raw) else {
                continue;
            };

            if let Some(event) = self.classify_instruction(&outer, &outer_index.to_string(), extra)
            {
                map.push(TOP_LEVEL_TRANSFER_KEY.to_string(), event);
            }

            if outer.program_id == SYSTEM_PROGRAM_ID {
                continue;
            }
            let Some(group) = self.adapter.inner_group(outer_index) else {
                continue;
            };

            let mut attribution = outer.program_id.clone();
            for (inner_index, raw_inner) in group.instructions.iter().enumerate() {
                let Some(inner) = self.adapter.resolve_instruction(raw_inner) else {
                    continue;
                };
                if inner.program_id != SYSTEM_PROGRAM_ID
                    && !ATTRIBUTION_IGNORED_PROGRAMS.contains(inner.program_id.as_str())
                {
                    attribution = inner.program_id.clone();
                }
                let idx = format!("{outer_index}-{inner_index}");
                if let Some(event) = self.classify_instruction(&inner, &idx, extra) {
                    map.push(format!("{attribution}:{idx}"), event);
                }
            }
        }
        map
    }

    /// Classifies one resolved instruction into a transfer event, or `None`.
    /// Structured instructions classify by their textual type field;
    /// compiled ones by the opcode byte.
    fn classify_instruction(
        &self,
        ix: &ResolvedInstruction,
        idx: &str,
        extra: ExtraActions,
    ) -> Option<TransferEvent> {
        let kind = if let Some(parsed) = ix.parsed.as_ref() {
            match (ix.program_id.as_str(), parsed.kind.as_str()) {
                (SYSTEM_PROGRAM_ID, "transfer") => TransferKind::NativeTransfer,
                (pid, "transfer") if is_token_program(pid) => TransferKind::Transfer,
                (pid, "transferChecked") if is_token_program(pid) => TransferKind::TransferChecked,
                (pid, "mintTo") if is_token_program(pid) => TransferKind::MintTo,
                (pid, "mintToChecked") if is_token_program(pid) => TransferKind::MintToChecked,
                (pid, "burn") if is_token_program(pid) => TransferKind::Burn,
                (pid, "burnChecked") if is_token_program(pid) => TransferKind::BurnChecked,
                _ => return None,
            }
        } else if ix.program_id == SYSTEM_PROGRAM_ID {
            // System instructions carry a u32 LE opcode; transfer is 2.
            if ix.data.len() < 12 || u32::from_le_bytes(ix.data[0..4].try_into().ok()?) != 2 {
                return None;
            }
            TransferKind::NativeTransfer
        } else if is_token_program(&ix.program_id) {
            match ix.data.first()? {
                3 => TransferKind::Transfer,
                12 => TransferKind::TransferChecked,
                7 => TransferKind::MintTo,
                14 => TransferKind::MintToChecked,
                8 => TransferKind::Burn,
                15 => TransferKind::BurnChecked,
                _ => return None,
            }
        } else {
            return None;
        };

        if !extra.allows(kind) {
            return None;
        }
        let event = match kind {
            TransferKind::NativeTransfer => self.decode_native(ix, idx),
            _ => self.decode_token(ix, kind, idx),
        };
        if event.is_none() {
            trace!(program = %ix.program_id, idx, "transfer candidate skipped");
        }
        event
    }

    fn decode_native(&self, ix: &ResolvedInstruction, idx: &str) -> Option<TransferEvent> {
        let (source, destination, lamports) = if let Some(parsed) = ix.parsed.as_ref() {
            (
                parsed.info_str("source")?.to_string(),
                parsed.info_str("destination")?.to_string(),
                parsed.info.get("lamports").and_then(Value::as_u64)?,
            )
        } else {
            let source = ix.accounts.first()?.clone();
            let destination = ix.accounts.get(1)?.clone();
            let lamports = u64::from_le_bytes(ix.data.get(4..12)?.try_into().ok()?);
            (source, destination, lamports)
        };

        let pre = |account: &str| {
            self.adapter
                .sol_pre_balance(account)
                .map(|v| TokenAmount::from_raw(v as u128, SOL_DECIMALS))
        };
        let post = |account: &str| {
            self.adapter
                .sol_post_balance(account)
                .map(|v| TokenAmount::from_raw(v as u128, SOL_DECIMALS))
        };

        Some(TransferEvent {
            kind: TransferKind::NativeTransfer,
            program_id: ix.program_id.clone(),
            destination_owner: self.adapter.owner_of(&destination).map(str::to_string),
            authority: None,
            mint: SOL_MINT.to_string(),
            amount: TokenAmount::from_raw(lamports as u128, SOL_DECIMALS),
            source_pre_balance: pre(&source),
            source_post_balance: post(&source),
            destination_pre_balance: pre(&destination),
            destination_post_balance: post(&destination),
            idx: idx.to_string(),
            is_fee: self.is_fee_destination(&destination),
            source,
            destination,
        })
    }

    fn decode_token(
        &self,
        ix: &ResolvedInstruction,
        kind: TransferKind,
        idx: &str,
    ) -> Option<TransferEvent> {
        let (source, destination, authority, explicit_mint, amount, decimals) =
            if let Some(parsed) = ix.parsed.as_ref() {
                self.token_fields_from_parsed(parsed, kind)?
            } else {
                self.token_fields_from_compiled(ix, kind)?
            };

        // Registry resolution, destination first then source; events whose
        // mint stays unknown are dropped.
        let mint = explicit_mint
            .or_else(|| self.adapter.mint_of(&destination).map(str::to_string))
            .or_else(|| self.adapter.mint_of(&source).map(str::to_string))?;
        let decimals = decimals
            .or_else(|| self.adapter.decimals_of_mint(&mint))
            .unwrap_or(0);

        Some(TransferEvent {
            kind,
            program_id: ix.program_id.clone(),
            destination_owner: self.adapter.owner_of(&destination).map(str::to_string),
            authority,
            mint,
            amount: TokenAmount::from_raw(amount as u128, decimals),
            source_pre_balance: self.adapter.token_pre_balance(&source).cloned(),
            source_post_balance: self.adapter.token_post_balance(&source).cloned(),
            destination_pre_balance: self.adapter.token_pre_balance(&destination).cloned(),
            destination_post_balance: self.adapter.token_post_balance(&destination).cloned(),
            idx: idx.to_string(),
            is_fee: self.is_fee_destination(&destination),
            source,
            destination,
        })
    }

    #[allow(clippy::type_complexity)]
    fn token_fields_from_parsed(
        &self,
        parsed: &crate::adapter::ParsedPayload,
        kind: TransferKind,
    ) -> Option<(String, String, Option<String>, Option<String>, u64, Option<u8>)> {
        let info = &parsed.info;
        let authority = parsed
            .info_str("authority")
            .or_else(|| parsed.info_str("multisigAuthority"))
            .map(str::to_string);
        let explicit_mint = parsed.info_str("mint").map(str::to_string);

        let (amount, decimals) = match info.get("tokenAmount") {
            Some(token_amount) => (
                token_amount
                    .get("amount")
                    .and_then(Value::as_str)?
                    .parse()
                    .ok()?,
                token_amount
                    .get("decimals")
                    .and_then(Value::as_u64)
                    .map(|d| d as u8),
            ),
            None => (parsed.info_str("amount")?.parse().ok()?, None),
        };

        let (source, destination) = match kind {
            TransferKind::MintTo | TransferKind::MintToChecked => (
                explicit_mint.clone()?,
                parsed.info_str("account")?.to_string(),
            ),
            TransferKind::Burn | TransferKind::BurnChecked => (
                parsed.info_str("account")?.to_string(),
                explicit_mint.clone()?,
            ),
            _ => (
                parsed.info_str("source")?.to_string(),
                parsed.info_str("destination")?.to_string(),
            ),
        };
        Some((source, destination, authority, explicit_mint, amount, decimals))
    }

    /// Fixed positional layouts; opcode at 0, u64 LE amount at 1..9,
    /// decimals byte at 9 for the Checked variants.
    #[allow(clippy::type_complexity)]
    fn token_fields_from_compiled(
        &self,
        ix: &ResolvedInstruction,
        kind: TransferKind,
    ) -> Option<(String, String, Option<String>, Option<String>, u64, Option<u8>)> {
        let amount = u64::from_le_bytes(ix.data.get(1..9)?.try_into().ok()?);
        let checked_decimals = ix.data.get(9).copied();
        let account = |i: usize| ix.accounts.get(i).cloned();

        Some(match kind {
            TransferKind::Transfer => (
                account(0)?,
                account(1)?,
                account(2),
                None,
                amount,
                None,
            ),
            TransferKind::TransferChecked => (
                account(0)?,
                account(2)?,
                account(3),
                account(1),
                amount,
                checked_decimals,
            ),
            TransferKind::MintTo | TransferKind::MintToChecked => {
                let decimals =
                    checked_decimals.filter(|_| kind == TransferKind::MintToChecked);
                (account(0)?, account(1)?, account(2), account(0), amount, decimals)
            }
            TransferKind::Burn | TransferKind::BurnChecked => {
                let decimals = checked_decimals.filter(|_| kind == TransferKind::BurnChecked);
                (account(0)?, account(1)?, account(2), account(1), amount, decimals)
            }
            TransferKind::NativeTransfer => return None,
        })
    }

    /// Fee detection is owner-resolved: a transfer into any token account
    /// owned by a fee collector counts.
    fn is_fee_destination(&self, destination: &str) -> bool {
        let resolved = self.adapter.owner_of(destination).unwrap_or(destination);
        FEE_ADDRESSES.contains(resolved)
    }
}
