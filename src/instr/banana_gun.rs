//! Banana Gun bot router decoder
//!
//! Payloads arrive obfuscated: every 8-byte block is XORed with a fixed
//! secret key and a mask derived from the block position. After
//! deobfuscation the layout is an 8-byte header, the input and output
//! amounts as u64 LE, and a direction flag byte. Trades are always quoted
//! in SOL; the traded mint comes from the correlated transfers. When the
//! flag byte carries no usable value, direction falls back to canonical
//! associated-token-account derivation.

use crate::core::constants::{SOL_DECIMALS, SOL_MINT};
use crate::core::events::{DexInfo, TokenInfo, TradeInfo, TradeType};
use crate::instr::program_ids::{program_name, BANANA_GUN_PROGRAM_ID};
use crate::instr::utils::{deobfuscate, infer_direction, read_u64_le};
use crate::instr::{provenance, ClassifiedInstruction, DecodeContext, DecodedEvents, ProtocolDecoder};
use tracing::trace;

const SECRET_KEY: [u8; 8] = [0x5a, 0x19, 0xc3, 0x7e, 0x88, 0x24, 0xd1, 0x4f];

/// Deobfuscated payload offsets.
mod layout {
    pub const INPUT_AMOUNT: usize = 8;
    pub const OUTPUT_AMOUNT: usize = 16;
    pub const DIRECTION: usize = 24;
    pub const MIN_LEN: usize = 25;

    pub const DIRECTION_BUY: u8 = 0;
    pub const DIRECTION_SELL: u8 = 1;
}

mod accounts {
    pub const USER: usize = 0;
    pub const INPUT_TOKEN_ACCOUNT: usize = 1;
    pub const OUTPUT_TOKEN_ACCOUNT: usize = 2;
    pub const MIN: usize = 3;
}

pub struct BananaGunDecoder;

impl ProtocolDecoder for BananaGunDecoder {
    fn program_id(&self) -> &'static str {
        BANANA_GUN_PROGRAM_ID
    }

    fn dex_info(&self) -> DexInfo {
        let name = program_name(BANANA_GUN_PROGRAM_ID);
        DexInfo {
            program_id: BANANA_GUN_PROGRAM_ID.to_string(),
            amm: name.to_string(),
            route: name.to_string(),
        }
    }

    fn decode(&self, ctx: &DecodeContext, instructions: &[ClassifiedInstruction]) -> DecodedEvents {
        let mut events = DecodedEvents::default();
        for classified in instructions {
            if let Some(trade) = self.decode_swap(ctx, classified) {
                events.trades.push(trade);
            }
        }
        events
    }
}

impl BananaGunDecoder {
    fn decode_swap(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
    ) -> Option<TradeInfo> {
        let instruction = &classified.instruction;
        if instruction.accounts.len() < accounts::MIN
            || instruction.data.len() < layout::MIN_LEN
        {
            return None;
        }

        let mut payload = instruction.data.clone();
        deobfuscate(&mut payload, &SECRET_KEY);
        let input_amount = read_u64_le(&payload, layout::INPUT_AMOUNT)?;
        let output_amount = read_u64_le(&payload, layout::OUTPUT_AMOUNT)?;
        let direction_flag = payload[layout::DIRECTION];

        // The bot wraps another DEX via CPI, so the traded mint shows up in
        // the transfers attributed to this outer instruction.
        let transfers = ctx
            .transfers
            .transfers_for(BANANA_GUN_PROGRAM_ID, classified.outer_index);
        let mint = transfers
            .iter()
            .map(|t| t.mint.as_str())
            .find(|m| *m != SOL_MINT)?
            .to_string();

        let user = instruction.accounts[accounts::USER].clone();
        let trade_type = match direction_flag {
            layout::DIRECTION_BUY => TradeType::Buy,
            layout::DIRECTION_SELL => TradeType::Sell,
            _ => {
                trace!(idx = %classified.idx(), flag = direction_flag, "direction flag unusable");
                infer_direction(
                    &user,
                    &mint,
                    &instruction.accounts[accounts::INPUT_TOKEN_ACCOUNT],
                    &instruction.accounts[accounts::OUTPUT_TOKEN_ACCOUNT],
                )
            }
        };

        let token_decimals = ctx.adapter.decimals_of_mint(&mint).unwrap_or(0);
        let (input_token, output_token) = match trade_type {
            TradeType::Sell => (
                TokenInfo::new(&mint, input_amount as u128, token_decimals),
                TokenInfo::new(SOL_MINT, output_amount as u128, SOL_DECIMALS),
            ),
            // SWAP keeps the BUY shape; the quote side is SOL either way.
            _ => (
                TokenInfo::new(SOL_MINT, input_amount as u128, SOL_DECIMALS),
                TokenInfo::new(&mint, output_amount as u128, token_decimals),
            ),
        };

        let prov = provenance(ctx.adapter);
        let dex = self.dex_info();
        let mut trade = TradeInfo {
            user,
            trade_type,
            pools: Vec::new(),
            input_token,
            output_token,
            fee: None,
            program_id: dex.program_id,
            amm: dex.amm,
            route: dex.route,
            slot: prov.slot,
            timestamp: prov.timestamp,
            signature: prov.signature,
            idx: classified.idx(),
            signers: prov.signers,
        };
        crate::swap::attach_transfer_info(&mut trade, ctx);
        crate::swap::attach_fee(&mut trade, ctx);
        Some(trade)
    }
}
