//! pump.fun bonding-curve decoder
//!
//! Buy and sell payloads carry only slippage bounds, so trade amounts come
//! from the correlated transfer events. The create variant is fully
//! self-describing and decodes name/symbol/uri from the payload.

use crate::core::events::{DexInfo, MemeEvent, TradeInfo};
use crate::cursor::cursor_pool;
use crate::instr::program_ids::{program_name, PUMPFUN_PROGRAM_ID};
use crate::instr::utils::discriminator8;
use crate::instr::{provenance, ClassifiedInstruction, DecodeContext, DecodedEvents, ProtocolDecoder};
use crate::swap;
use tracing::trace;

pub mod discriminators {
    pub const BUY: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
    pub const SELL: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];
    pub const CREATE: [u8; 8] = [24, 30, 200, 40, 5, 28, 7, 119];
}

/// Account positions shared by buy and sell.
mod accounts {
    pub const BONDING_CURVE: usize = 3;
    pub const MIN_SWAP: usize = 7;

    pub const CREATE_MINT: usize = 0;
    pub const CREATE_BONDING_CURVE: usize = 2;
    pub const CREATE_USER: usize = 7;
    pub const MIN_CREATE: usize = 8;
}

pub struct PumpfunDecoder;

impl ProtocolDecoder for PumpfunDecoder {
    fn program_id(&self) -> &'static str {
        PUMPFUN_PROGRAM_ID
    }

    fn dex_info(&self) -> DexInfo {
        let name = program_name(PUMPFUN_PROGRAM_ID);
        DexInfo {
            program_id: PUMPFUN_PROGRAM_ID.to_string(),
            amm: name.to_string(),
            route: name.to_string(),
        }
    }

    fn decode(&self, ctx: &DecodeContext, instructions: &[ClassifiedInstruction]) -> DecodedEvents {
        let mut events = DecodedEvents::default();
        for classified in instructions {
            let data = &classified.instruction.data;
            let Some(disc) = discriminator8(data) else {
                continue;
            };
            match disc {
                discriminators::BUY | discriminators::SELL => {
                    if let Some(trade) = self.decode_swap(ctx, classified) {
                        events.trades.push(trade);
                    }
                }
                discriminators::CREATE => {
                    if let Some(meme) = self.decode_create(ctx, classified) {
                        events.memes.push(meme);
                    }
                }
                _ => trace!(idx = %classified.idx(), "unknown pumpfun discriminator"),
            }
        }
        events
    }
}

impl PumpfunDecoder {
    fn decode_swap(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
    ) -> Option<TradeInfo> {
        let accounts = &classified.instruction.accounts;
        if accounts.len() < accounts::MIN_SWAP {
            return None;
        }
        let transfers = ctx
            .transfers
            .transfers_for(PUMPFUN_PROGRAM_ID, classified.outer_index);
        let mut trade = swap::synthesize(
            ctx,
            &transfers,
            &self.dex_info(),
            &classified.idx(),
            false,
        )?;
        trade.pools = vec![accounts[accounts::BONDING_CURVE].clone()];
        Some(trade)
    }

    /// Token launch. Payload after the discriminator: name, symbol and uri
    /// as length-prefixed strings, then the creator pubkey on newer
    /// deployments.
    fn decode_create(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
    ) -> Option<MemeEvent> {
        let accounts = &classified.instruction.accounts;
        if accounts.len() < accounts::MIN_CREATE {
            return None;
        }

        let mut cursor = cursor_pool().acquire(&classified.instruction.data);
        cursor.skip(8);
        let name = cursor.read_string();
        let symbol = cursor.read_string();
        let uri = cursor.read_string();
        if cursor.failed() {
            return None;
        }
        let creator = if cursor.remaining() >= 32 {
            cursor.read_pubkey()
        } else {
            accounts[accounts::CREATE_USER].clone()
        };

        let prov = provenance(ctx.adapter);
        Some(MemeEvent {
            mint: accounts[accounts::CREATE_MINT].clone(),
            name: Some(name),
            symbol: Some(symbol),
            uri: Some(uri),
            bonding_curve: Some(accounts[accounts::CREATE_BONDING_CURVE].clone()),
            creator,
            user: prov.user,
            program_id: PUMPFUN_PROGRAM_ID.to_string(),
            amm: program_name(PUMPFUN_PROGRAM_ID).to_string(),
            slot: prov.slot,
            timestamp: prov.timestamp,
            signature: prov.signature,
            idx: classified.idx(),
            signers: prov.signers,
        })
    }
}
