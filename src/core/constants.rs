//! Process-wide static reference data
//!
//! Program catalog, well-known mints, fee collectors and router programs.
//! All tables are read-only and initialized once; concurrent parses read them
//! without synchronization.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Wrapped SOL mint, used as the SOL sentinel throughout the crate.
/// Always registered at 9 decimals.
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

pub const SOL_DECIMALS: u8 = 9;

pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
pub const COMPUTE_BUDGET_PROGRAM_ID: &str = "ComputeBudget111111111111111111111111111111";
pub const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";

/// Constant bucket for the top-level transfer pass of the classifier.
pub const TOP_LEVEL_TRANSFER_KEY: &str = "transfer";

/// Returns true when `program_id` is the SPL token or token-2022 program.
pub fn is_token_program(program_id: &str) -> bool {
    program_id == TOKEN_PROGRAM_ID || program_id == TOKEN_2022_PROGRAM_ID
}

/// Fallback decimals for well-known mints, consulted when a mint was never
/// observed in the transaction's token balances or token instructions.
pub static TOKEN_DECIMALS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(SOL_MINT, 9);
    m.insert(USDC_MINT, 6);
    m.insert(USDT_MINT, 6);
    m
});

/// Mints treated as quote currency by the BUY/SELL heuristic. A swap whose
/// input is one of these is labeled BUY. Stable-to-stable swaps are
/// misclassified by design; see the module docs of `swap`.
pub static QUOTE_MINTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| [SOL_MINT, USDC_MINT, USDT_MINT].into_iter().collect());

/// Known fee-collector destinations. Transfers whose owner-resolved
/// destination is in this set are flagged `is_fee` and excluded from swap
/// amount summation.
pub static FEE_ADDRESSES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // pump.fun bonding-curve fee account
        "CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM",
        // pump.fun AMM protocol fee recipient
        "62qc2CNXwrYqQScmEdiZFFAnJR262PxWEuNQtxfafNgV",
        // pump.fun AMM protocol fee recipient (secondary)
        "7VtfL8fvgNfhz17qKRMjzQEXgbdpnHHHQRh54R9jP2RJ",
    ]
    .into_iter()
    .collect()
});

/// Router / aggregator programs. Used by the swap synthesizer to recognize
/// passthrough transfers and to correct input/output assignment.
pub static ROUTER_PROGRAMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Jupiter aggregator v6
        "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
        // Banana Gun router
        "BANANAjs7FJiPQqJTGFzkZJndT9o7UmKiYYGaJz6frGu",
    ]
    .into_iter()
    .collect()
});

/// Programs that never take transfer attribution when seen as an inner
/// instruction: token programs themselves plus vault/passthrough programs.
pub static ATTRIBUTION_IGNORED_PROGRAMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        TOKEN_PROGRAM_ID,
        TOKEN_2022_PROGRAM_ID,
        ASSOCIATED_TOKEN_PROGRAM_ID,
        COMPUTE_BUDGET_PROGRAM_ID,
        MEMO_PROGRAM_ID,
    ]
    .into_iter()
    .collect()
});
