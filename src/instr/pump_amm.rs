//! PumpSwap AMM decoder
//!
//! Unlike the bonding-curve program, PumpSwap payloads carry the traded
//! amounts directly, so swaps decode from the payload with the binary
//! cursor against a fixed account layout. Deposit, withdraw and pool
//! creation become liquidity events.

use crate::core::events::{DexInfo, PoolEvent, PoolEventType, TokenAmount, TokenInfo, TradeInfo};
use crate::cursor::cursor_pool;
use crate::instr::program_ids::{program_name, PUMP_AMM_PROGRAM_ID};
use crate::instr::utils::discriminator8;
use crate::instr::{provenance, ClassifiedInstruction, DecodeContext, DecodedEvents, ProtocolDecoder};
use crate::swap::trade_type_for;
use tracing::trace;

pub mod discriminators {
    pub const BUY: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
    pub const SELL: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];
    pub const CREATE_POOL: [u8; 8] = [233, 146, 209, 142, 207, 104, 64, 188];
    pub const DEPOSIT: [u8; 8] = [242, 35, 198, 137, 82, 225, 242, 182];
    pub const WITHDRAW: [u8; 8] = [183, 18, 70, 156, 148, 109, 161, 34];
}

/// Fixed account layout shared by every variant.
mod accounts {
    pub const POOL: usize = 0;
    pub const USER: usize = 1;
    pub const BASE_MINT: usize = 3;
    pub const QUOTE_MINT: usize = 4;
    pub const LP_MINT: usize = 5;
    pub const MIN: usize = 6;
}

pub struct PumpAmmDecoder;

impl ProtocolDecoder for PumpAmmDecoder {
    fn program_id(&self) -> &'static str {
        PUMP_AMM_PROGRAM_ID
    }

    fn dex_info(&self) -> DexInfo {
        let name = program_name(PUMP_AMM_PROGRAM_ID);
        DexInfo {
            program_id: PUMP_AMM_PROGRAM_ID.to_string(),
            amm: name.to_string(),
            route: name.to_string(),
        }
    }

    fn decode(&self, ctx: &DecodeContext, instructions: &[ClassifiedInstruction]) -> DecodedEvents {
        let mut events = DecodedEvents::default();
        for classified in instructions {
            if classified.instruction.accounts.len() < accounts::MIN {
                continue;
            }
            let Some(disc) = discriminator8(&classified.instruction.data) else {
                continue;
            };
            match disc {
                discriminators::BUY => {
                    if let Some(t) = self.decode_swap(ctx, classified, true) {
                        events.trades.push(t);
                    }
                }
                discriminators::SELL => {
                    if let Some(t) = self.decode_swap(ctx, classified, false) {
                        events.trades.push(t);
                    }
                }
                discriminators::CREATE_POOL => {
                    if let Some(e) = self.decode_create_pool(ctx, classified) {
                        events.liquidities.push(e);
                    }
                }
                discriminators::DEPOSIT => {
                    if let Some(e) = self.decode_liquidity(ctx, classified, PoolEventType::Add) {
                        events.liquidities.push(e);
                    }
                }
                discriminators::WITHDRAW => {
                    if let Some(e) = self.decode_liquidity(ctx, classified, PoolEventType::Remove) {
                        events.liquidities.push(e);
                    }
                }
                _ => trace!(idx = %classified.idx(), "unknown pump amm discriminator"),
            }
        }
        events
    }
}

impl PumpAmmDecoder {
    /// Buy: base amount out then max quote in. Sell: base amount in then min
    /// quote out. Both pairs of u64 follow the discriminator.
    fn decode_swap(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
        is_buy: bool,
    ) -> Option<TradeInfo> {
        let instruction = &classified.instruction;
        let mut cursor = cursor_pool().acquire(&instruction.data);
        cursor.skip(8);
        let base_amount = cursor.read_u64();
        let quote_amount = cursor.read_u64();
        if cursor.failed() {
            return None;
        }

        let base_mint = &instruction.accounts[accounts::BASE_MINT];
        let quote_mint = &instruction.accounts[accounts::QUOTE_MINT];
        let decimals_of = |mint: &str| ctx.adapter.decimals_of_mint(mint).unwrap_or(0);

        let (input, output) = if is_buy {
            (
                TokenInfo::new(quote_mint, quote_amount as u128, decimals_of(quote_mint)),
                TokenInfo::new(base_mint, base_amount as u128, decimals_of(base_mint)),
            )
        } else {
            (
                TokenInfo::new(base_mint, base_amount as u128, decimals_of(base_mint)),
                TokenInfo::new(quote_mint, quote_amount as u128, decimals_of(quote_mint)),
            )
        };

        let prov = provenance(ctx.adapter);
        let dex = self.dex_info();
        let mut trade = TradeInfo {
            user: instruction.accounts[accounts::USER].clone(),
            trade_type: trade_type_for(&input.mint, &output.mint),
            pools: vec![instruction.accounts[accounts::POOL].clone()],
            input_token: input,
            output_token: output,
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

    /// Deposit: lp amount then max base then max quote. Withdraw: lp amount
    /// then min base then min quote. Same u64 triple either way.
    fn decode_liquidity(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
        event_type: PoolEventType,
    ) -> Option<PoolEvent> {
        let instruction = &classified.instruction;
        let mut cursor = cursor_pool().acquire(&instruction.data);
        cursor.skip(8);
        let _lp_amount = cursor.read_u64();
        let base_amount = cursor.read_u64();
        let quote_amount = cursor.read_u64();
        if cursor.failed() {
            return None;
        }
        Some(self.pool_event(
            ctx,
            classified,
            event_type,
            base_amount,
            quote_amount,
        ))
    }

    /// Pool creation: u16 index then base and quote deposit amounts.
    fn decode_create_pool(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
    ) -> Option<PoolEvent> {
        let instruction = &classified.instruction;
        let mut cursor = cursor_pool().acquire(&instruction.data);
        cursor.skip(8);
        let _index = cursor.read_u16();
        let base_amount = cursor.read_u64();
        let quote_amount = cursor.read_u64();
        if cursor.failed() {
            return None;
        }
        Some(self.pool_event(
            ctx,
            classified,
            PoolEventType::Create,
            base_amount,
            quote_amount,
        ))
    }

    fn pool_event(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
        event_type: PoolEventType,
        base_amount: u64,
        quote_amount: u64,
    ) -> PoolEvent {
        let instruction = &classified.instruction;
        let base_mint = instruction.accounts[accounts::BASE_MINT].clone();
        let quote_mint = instruction.accounts[accounts::QUOTE_MINT].clone();
        let decimals_of = |mint: &str| ctx.adapter.decimals_of_mint(mint).unwrap_or(0);
        let prov = provenance(ctx.adapter);
        PoolEvent {
            event_type,
            user: instruction.accounts[accounts::USER].clone(),
            pool_id: instruction.accounts[accounts::POOL].clone(),
            pool_lp_mint: instruction.accounts.get(accounts::LP_MINT).cloned(),
            token0_amount: Some(TokenAmount::from_raw(
                base_amount as u128,
                decimals_of(&base_mint),
            )),
            token0_mint: Some(base_mint),
            token1_amount: Some(TokenAmount::from_raw(
                quote_amount as u128,
                decimals_of(&quote_mint),
            )),
            token1_mint: Some(quote_mint),
            program_id: PUMP_AMM_PROGRAM_ID.to_string(),
            amm: program_name(PUMP_AMM_PROGRAM_ID).to_string(),
            slot: prov.slot,
            timestamp: prov.timestamp,
            signature: prov.signature,
            idx: classified.idx(),
            signers: prov.signers,
        }
    }
}
