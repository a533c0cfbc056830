//! Top-level parse pipeline
//!
//! One `parse` call builds the adapter, runs the transfer classifier, hands
//! the classified instructions to every registered protocol decoder and
//! collects the results. The only hard failure is an unparseable envelope;
//! every other problem degrades to fewer events in an otherwise successful
//! result.

use crate::adapter::TransactionAdapter;
use crate::core::events::{MemeEvent, PoolEvent, TradeInfo, TransferEvent};
use crate::error::ParseError;
use crate::input::TransactionInput;
use crate::instr::{
    default_decoders, DecodeContext, DecodedEvents, InstructionClassifier, ProtocolDecoder,
};
use crate::transfer::{parse_idx, ExtraActions, TransferClassifier};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseConfig {
    /// Which mint/burn kinds the transfer classifier reports.
    pub extra_actions: ExtraActions,
}

/// Outcome of one transaction parse. `state` is false only when the
/// envelope itself could not be understood.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub state: bool,
    pub msg: Option<String>,
    pub trades: Vec<TradeInfo>,
    pub liquidities: Vec<PoolEvent>,
    pub transfers: Vec<TransferEvent>,
    pub meme_events: Vec<MemeEvent>,
}

impl ParseResult {
    fn failed(msg: String) -> Self {
        Self { state: false, msg: Some(msg), ..Default::default() }
    }
}

pub struct DexParser {
    config: ParseConfig,
    decoders: Vec<Box<dyn ProtocolDecoder>>,
}

impl Default for DexParser {
    fn default() -> Self {
        Self::new(ParseConfig::default())
    }
}

impl DexParser {
    pub fn new(config: ParseConfig) -> Self {
        Self { config, decoders: default_decoders() }
    }

    /// Replaces the built-in decoder set.
    pub fn with_decoders(config: ParseConfig, decoders: Vec<Box<dyn ProtocolDecoder>>) -> Self {
        Self { config, decoders }
    }

    pub fn parse(
        &self,
        input: &TransactionInput,
        classifier: &dyn InstructionClassifier,
    ) -> ParseResult {
        let adapter = match TransactionAdapter::new(input) {
            Ok(adapter) => adapter,
            Err(err) => return ParseResult::failed(err.to_string()),
        };

        let transfers = TransferClassifier::new(&adapter).classify(self.config.extra_actions);
        let ctx = DecodeContext { adapter: &adapter, transfers: &transfers };

        let mut events = DecodedEvents::default();
        for decoder in &self.decoders {
            let instructions = classifier.instructions_for(decoder.program_id());
            if instructions.is_empty() {
                continue;
            }
            debug!(
                program = decoder.program_id(),
                count = instructions.len(),
                "dispatching decoder"
            );
            events.extend(decoder.decode(&ctx, &instructions));
        }
        events.trades.sort_by_key(|t| parse_idx(&t.idx));
        events.liquidities.sort_by_key(|e| parse_idx(&e.idx));

        ParseResult {
            state: true,
            msg: None,
            trades: events.trades,
            liquidities: events.liquidities,
            transfers: transfers.flattened(),
            meme_events: events.memes,
        }
    }

    /// Deserializes a JSON transaction then parses it. The decode failure
    /// here is the one hard error the pipeline reports.
    pub fn parse_value(
        &self,
        value: &serde_json::Value,
        classifier: &dyn InstructionClassifier,
    ) -> ParseResult {
        match serde_json::from_value::<TransactionInput>(value.clone()) {
            Ok(input) => self.parse(&input, classifier),
            Err(err) => ParseResult::failed(ParseError::from(err).to_string()),
        }
    }
}
