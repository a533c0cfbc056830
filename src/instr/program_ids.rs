//! Centralized program id constants and the program catalog
//!
//! Addresses are kept as base58 strings: instruction payloads and account
//! tables arrive as strings, and dispatch is pure string comparison.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// pump.fun bonding curve program
pub const PUMPFUN_PROGRAM_ID: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

/// pump.fun AMM (PumpSwap)
pub const PUMP_AMM_PROGRAM_ID: &str = "pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA";

/// Raydium AMM V4
pub const RAYDIUM_AMM_V4_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Banana Gun trading bot router
pub const BANANA_GUN_PROGRAM_ID: &str = "BANANAjs7FJiPQqJTGFzkZJndT9o7UmKiYYGaJz6frGu";

/// Jupiter aggregator v6
pub const JUPITER_V6_PROGRAM_ID: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramInfo {
    pub name: &'static str,
    pub tags: &'static [&'static str],
}

/// Read-only program catalog, loaded once.
pub static PROGRAM_CATALOG: Lazy<HashMap<&'static str, ProgramInfo>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        PUMPFUN_PROGRAM_ID,
        ProgramInfo { name: "Pumpfun", tags: &["amm", "meme"] },
    );
    m.insert(
        PUMP_AMM_PROGRAM_ID,
        ProgramInfo { name: "Pumpswap", tags: &["amm"] },
    );
    m.insert(
        RAYDIUM_AMM_V4_PROGRAM_ID,
        ProgramInfo { name: "RaydiumV4", tags: &["amm"] },
    );
    m.insert(
        BANANA_GUN_PROGRAM_ID,
        ProgramInfo { name: "BananaGun", tags: &["bot", "route"] },
    );
    m.insert(
        JUPITER_V6_PROGRAM_ID,
        ProgramInfo { name: "Jupiter", tags: &["route"] },
    );
    m
});

pub fn program_name(program_id: &str) -> &'static str {
    PROGRAM_CATALOG.get(program_id).map_or("Unknown", |p| p.name)
}
