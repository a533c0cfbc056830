//! Solana DEX transaction parser
//!
//! Takes one raw transaction (legacy or versioned v0), classifies its token
//! and native transfers, decodes the instruction payloads of known DEX
//! programs and emits structured trade, transfer, liquidity and token-launch
//! events. CPI walking is delegated to a caller-provided
//! [`InstructionClassifier`]; network lookups to the [`fetchers`] traits.
//! The parser itself is pure and synchronous.

pub mod adapter;
pub mod core;
pub mod cursor;
pub mod error;
pub mod fetchers;
pub mod input;
pub mod instr; // per-protocol instruction decoders
pub mod parser;
pub mod swap;
pub mod transfer;

// Main API surface.
pub use crate::core::events::{
    BalanceChange, DexInfo, MemeEvent, PoolEvent, PoolEventType, TokenAmount, TokenInfo,
    TradeInfo, TradeType, TransferEvent, TransferKind,
};
pub use adapter::TransactionAdapter;
pub use error::ParseError;
pub use input::TransactionInput;
pub use instr::{
    default_decoders, ClassifiedInstruction, DecodeContext, DecodedEvents, InstructionClassifier,
    ProtocolDecoder,
};
pub use parser::{DexParser, ParseConfig, ParseResult};
pub use transfer::{ExtraActions, TransferActionMap, TransferClassifier};
