//! Output event types
//!
//! Every entity here is transient and scoped to one transaction parse. All
//! types serialize directly with serde; addresses are base58 strings end to
//! end, raw token amounts are decimal integer strings.

use serde::{Deserialize, Serialize};

/// A token amount carried as its exact raw integer string plus a derived
/// human-scaled float. The raw string always parses as a non-negative
/// integer, except for net change amounts which may be signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TokenAmount {
    pub amount: String,
    pub ui_amount: Option<f64>,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn from_raw(raw: u128, decimals: u8) -> Self {
        Self {
            amount: raw.to_string(),
            ui_amount: Some(ui_amount(raw as i128, decimals)),
            decimals,
        }
    }

    /// Builds a signed change amount.
    pub fn from_change(raw: i128, decimals: u8) -> Self {
        Self {
            amount: raw.to_string(),
            ui_amount: Some(ui_amount(raw, decimals)),
            decimals,
        }
    }

    /// The raw amount as an unsigned integer; `None` for signed change
    /// amounts and malformed strings.
    pub fn raw(&self) -> Option<u128> {
        self.amount.parse().ok()
    }
}

/// Human-scaled amount: raw / 10^decimals.
pub fn ui_amount(raw: i128, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Pre/post/change triple for one (account, mint) pair. Only constructed
/// when pre != post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub pre: TokenAmount,
    pub post: TokenAmount,
    pub change: TokenAmount,
}

impl BalanceChange {
    /// Returns `None` when the balances are equal, so maps built from this
    /// never hold a zero-delta entry.
    pub fn diff(pre: u128, post: u128, decimals: u8) -> Option<Self> {
        if pre == post {
            return None;
        }
        Some(Self {
            pre: TokenAmount::from_raw(pre, decimals),
            post: TokenAmount::from_raw(post, decimals),
            change: TokenAmount::from_change(post as i128 - pre as i128, decimals),
        })
    }
}

/// Semantic kind of a token movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferKind {
    Transfer,
    TransferChecked,
    NativeTransfer,
    MintTo,
    MintToChecked,
    Burn,
    BurnChecked,
}

/// One semantic token-transfer event, created once per matching instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub kind: TransferKind,
    pub program_id: String,
    pub source: String,
    pub destination: String,
    pub destination_owner: Option<String>,
    pub authority: Option<String>,
    pub mint: String,
    pub amount: TokenAmount,
    pub source_pre_balance: Option<TokenAmount>,
    pub source_post_balance: Option<TokenAmount>,
    pub destination_pre_balance: Option<TokenAmount>,
    pub destination_post_balance: Option<TokenAmount>,
    /// `"outer"` or `"outer-inner"` position of the instruction.
    pub idx: String,
    pub is_fee: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Buy,
    Sell,
    /// Direction could not be inferred.
    Swap,
}

/// One side of a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TokenInfo {
    pub mint: String,
    pub amount: f64,
    pub amount_raw: String,
    pub decimals: u8,
    pub authority: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub balance_change: Option<BalanceChange>,
}

impl TokenInfo {
    pub fn new(mint: &str, raw: u128, decimals: u8) -> Self {
        Self {
            mint: mint.to_string(),
            amount: ui_amount(raw as i128, decimals),
            amount_raw: raw.to_string(),
            decimals,
            ..Default::default()
        }
    }
}

/// Which DEX program and route produced a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DexInfo {
    pub program_id: String,
    pub amm: String,
    pub route: String,
}

/// One logical swap. Emitted per matched swap instruction; multi-hop chains
/// may additionally be collapsed into a single representative TradeInfo
/// without mutating the originals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeInfo {
    pub user: String,
    pub trade_type: TradeType,
    pub pools: Vec<String>,
    pub input_token: TokenInfo,
    pub output_token: TokenInfo,
    pub fee: Option<TokenInfo>,
    pub program_id: String,
    pub amm: String,
    pub route: String,
    pub slot: u64,
    pub timestamp: i64,
    pub signature: String,
    pub idx: String,
    pub signers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PoolEventType {
    Create,
    Add,
    Remove,
}

/// Liquidity event, sharing provenance fields with TradeInfo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEvent {
    pub event_type: PoolEventType,
    pub user: String,
    pub pool_id: String,
    pub pool_lp_mint: Option<String>,
    pub token0_mint: Option<String>,
    pub token0_amount: Option<TokenAmount>,
    pub token1_mint: Option<String>,
    pub token1_amount: Option<TokenAmount>,
    pub program_id: String,
    pub amm: String,
    pub slot: u64,
    pub timestamp: i64,
    pub signature: String,
    pub idx: String,
    pub signers: Vec<String>,
}

/// Token-launch event, sharing provenance fields with TradeInfo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemeEvent {
    pub mint: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub uri: Option<String>,
    pub bonding_curve: Option<String>,
    pub creator: String,
    pub user: String,
    pub program_id: String,
    pub amm: String,
    pub slot: u64,
    pub timestamp: i64,
    pub signature: String,
    pub idx: String,
    pub signers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_amount_round_trip_for_all_decimals() {
        // Re-deriving the raw integer from the printed raw string recovers
        // the original exactly, for decimals 0..=9.
        for decimals in 0u8..=9 {
            let raw = 123_456_789u128;
            let amount = TokenAmount::from_raw(raw, decimals);
            assert_eq!(amount.amount.parse::<u128>().unwrap(), raw);
            assert_eq!(amount.raw(), Some(raw));
            let ui = amount.ui_amount.unwrap();
            assert!((ui - raw as f64 / 10f64.powi(decimals as i32)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn change_amount_may_be_signed() {
        let change = TokenAmount::from_change(-500, 6);
        assert_eq!(change.amount, "-500");
        assert_eq!(change.raw(), None);
    }

    #[test]
    fn balance_change_absent_when_pre_equals_post() {
        assert!(BalanceChange::diff(1_000, 1_000, 6).is_none());
        let change = BalanceChange::diff(1_000_000, 0, 6).unwrap();
        assert_eq!(change.change.amount, "-1000000");
    }
}
