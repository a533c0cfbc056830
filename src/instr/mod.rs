//! Protocol decoders
//!
//! Every exchange-specific decoder follows the same shape: filter the
//! classified instructions to its program, match leading bytes against known
//! discriminators, validate the fixed positional account layout, then decode
//! amounts either from the payload (binary cursor) or by correlating with
//! the transfer classifier's map. Any unmet precondition silently skips that
//! one instruction and never aborts the enclosing transaction parse.

pub mod banana_gun;
pub mod program_ids;
pub mod pump_amm;
pub mod pumpfun;
pub mod raydium_amm;
pub mod utils;

use crate::adapter::{ResolvedInstruction, TransactionAdapter};
use crate::core::events::{DexInfo, MemeEvent, PoolEvent, TradeInfo};
use crate::transfer::TransferActionMap;

/// A raw instruction with its owning program and position, as produced by
/// the external CPI-walking classifier. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedInstruction {
    pub instruction: ResolvedInstruction,
    pub program_id: String,
    pub outer_index: usize,
    /// `None` for top-level instructions.
    pub inner_index: Option<usize>,
}

impl ClassifiedInstruction {
    /// `"outer"` or `"outer-inner"` position string.
    pub fn idx(&self) -> String {
        match self.inner_index {
            Some(inner) => format!("{}-{}", self.outer_index, inner),
            None => self.outer_index.to_string(),
        }
    }
}

/// The consumed black-box classifier: walks CPI nesting and groups raw
/// instructions by owning program.
pub trait InstructionClassifier {
    fn program_ids(&self) -> Vec<String>;
    fn instructions_for(&self, program_id: &str) -> Vec<ClassifiedInstruction>;
}

/// Everything a decoder may consult for one transaction.
pub struct DecodeContext<'p, 'a> {
    pub adapter: &'p TransactionAdapter<'a>,
    pub transfers: &'p TransferActionMap,
}

#[derive(Debug, Default)]
pub struct DecodedEvents {
    pub trades: Vec<TradeInfo>,
    pub liquidities: Vec<PoolEvent>,
    pub memes: Vec<MemeEvent>,
}

impl DecodedEvents {
    pub fn extend(&mut self, other: DecodedEvents) {
        self.trades.extend(other.trades);
        self.liquidities.extend(other.liquidities);
        self.memes.extend(other.memes);
    }
}

pub trait ProtocolDecoder: Send + Sync {
    fn program_id(&self) -> &'static str;
    fn dex_info(&self) -> DexInfo;
    fn decode(&self, ctx: &DecodeContext, instructions: &[ClassifiedInstruction]) -> DecodedEvents;
}

/// The built-in decoder set, in dispatch order.
pub fn default_decoders() -> Vec<Box<dyn ProtocolDecoder>> {
    vec![
        Box::new(pumpfun::PumpfunDecoder),
        Box::new(pump_amm::PumpAmmDecoder),
        Box::new(raydium_amm::RaydiumAmmDecoder),
        Box::new(banana_gun::BananaGunDecoder),
    ]
}

/// Provenance fields shared by every emitted event.
pub(crate) fn provenance(adapter: &TransactionAdapter<'_>) -> Provenance {
    Provenance {
        slot: adapter.slot(),
        timestamp: adapter.timestamp(),
        signature: adapter.signature().to_string(),
        signers: adapter.signers(),
        user: adapter.fee_payer().to_string(),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Provenance {
    pub slot: u64,
    pub timestamp: i64,
    pub signature: String,
    pub signers: Vec<String>,
    pub user: String,
}
