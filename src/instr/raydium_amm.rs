//! Raydium AMM V4 decoder
//!
//! Pre-Anchor program: a single opcode byte selects the variant. Swap
//! payloads carry only slippage bounds, so both swaps and liquidity amounts
//! come from the correlated transfer events rather than the payload.

use crate::core::events::{DexInfo, PoolEvent, PoolEventType, TradeInfo, TransferEvent};
use crate::instr::program_ids::{program_name, RAYDIUM_AMM_V4_PROGRAM_ID};
use crate::instr::{provenance, ClassifiedInstruction, DecodeContext, DecodedEvents, ProtocolDecoder};
use crate::swap;
use tracing::trace;

pub mod discriminators {
    pub const INITIALIZE2: u8 = 1;
    pub const DEPOSIT: u8 = 3;
    pub const WITHDRAW: u8 = 4;
    pub const SWAP_BASE_IN: u8 = 9;
    pub const SWAP_BASE_OUT: u8 = 11;
}

mod accounts {
    /// Swap, deposit and withdraw all carry the token program at 0 and the
    /// AMM pool account at 1.
    pub const POOL: usize = 1;
    pub const LP_MINT: usize = 5;
    pub const MIN_SWAP: usize = 15;
    pub const MIN_LIQUIDITY: usize = 10;

    /// initialize2 leads with four program/sysvar accounts.
    pub const INIT_POOL: usize = 4;
    pub const INIT_LP_MINT: usize = 7;
    pub const MIN_INIT: usize = 10;
}

pub struct RaydiumAmmDecoder;

impl ProtocolDecoder for RaydiumAmmDecoder {
    fn program_id(&self) -> &'static str {
        RAYDIUM_AMM_V4_PROGRAM_ID
    }

    fn dex_info(&self) -> DexInfo {
        let name = program_name(RAYDIUM_AMM_V4_PROGRAM_ID);
        DexInfo {
            program_id: RAYDIUM_AMM_V4_PROGRAM_ID.to_string(),
            amm: name.to_string(),
            route: name.to_string(),
        }
    }

    fn decode(&self, ctx: &DecodeContext, instructions: &[ClassifiedInstruction]) -> DecodedEvents {
        let mut events = DecodedEvents::default();
        for classified in instructions {
            let Some(&opcode) = classified.instruction.data.first() else {
                continue;
            };
            match opcode {
                discriminators::SWAP_BASE_IN | discriminators::SWAP_BASE_OUT => {
                    if let Some(t) = self.decode_swap(ctx, classified) {
                        events.trades.push(t);
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
                discriminators::INITIALIZE2 => {
                    if let Some(e) = self.decode_initialize(ctx, classified) {
                        events.liquidities.push(e);
                    }
                }
                _ => trace!(idx = %classified.idx(), opcode, "unknown raydium opcode"),
            }
        }
        events
    }
}

impl RaydiumAmmDecoder {
    fn decode_swap(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
    ) -> Option<TradeInfo> {
        let instruction = &classified.instruction;
        if instruction.accounts.len() < accounts::MIN_SWAP {
            return None;
        }
        let transfers = ctx
            .transfers
            .transfers_for(RAYDIUM_AMM_V4_PROGRAM_ID, classified.outer_index);
        let mut trade = swap::synthesize(
            ctx,
            &transfers,
            &self.dex_info(),
            &classified.idx(),
            false,
        )?;
        trade.pools = vec![instruction.accounts[accounts::POOL].clone()];
        Some(trade)
    }

    fn decode_liquidity(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
        event_type: PoolEventType,
    ) -> Option<PoolEvent> {
        let instruction = &classified.instruction;
        if instruction.accounts.len() < accounts::MIN_LIQUIDITY {
            return None;
        }
        self.pool_event(
            ctx,
            classified,
            event_type,
            instruction.accounts[accounts::POOL].clone(),
            instruction.accounts.get(accounts::LP_MINT).cloned(),
        )
    }

    fn decode_initialize(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
    ) -> Option<PoolEvent> {
        let instruction = &classified.instruction;
        if instruction.accounts.len() < accounts::MIN_INIT {
            return None;
        }
        self.pool_event(
            ctx,
            classified,
            PoolEventType::Create,
            instruction.accounts[accounts::INIT_POOL].clone(),
            instruction.accounts.get(accounts::INIT_LP_MINT).cloned(),
        )
    }

    /// Token sides come from the first two correlated transfers with
    /// distinct mints; a liquidity action that moved fewer than two mints
    /// still emits with the sides it has.
    fn pool_event(
        &self,
        ctx: &DecodeContext,
        classified: &ClassifiedInstruction,
        event_type: PoolEventType,
        pool_id: String,
        pool_lp_mint: Option<String>,
    ) -> Option<PoolEvent> {
        let transfers = ctx
            .transfers
            .transfers_for(RAYDIUM_AMM_V4_PROGRAM_ID, classified.outer_index);
        let (token0, token1) = distinct_mint_pair(&transfers);

        let prov = provenance(ctx.adapter);
        Some(PoolEvent {
            event_type,
            user: prov.user,
            pool_id,
            pool_lp_mint,
            token0_mint: token0.map(|t| t.mint.clone()),
            token0_amount: token0.map(|t| t.amount.clone()),
            token1_mint: token1.map(|t| t.mint.clone()),
            token1_amount: token1.map(|t| t.amount.clone()),
            program_id: RAYDIUM_AMM_V4_PROGRAM_ID.to_string(),
            amm: program_name(RAYDIUM_AMM_V4_PROGRAM_ID).to_string(),
            slot: prov.slot,
            timestamp: prov.timestamp,
            signature: prov.signature,
            idx: classified.idx(),
            signers: prov.signers,
        })
    }
}

fn distinct_mint_pair(transfers: &[TransferEvent]) -> (Option<&TransferEvent>, Option<&TransferEvent>) {
    let first = transfers.first();
    let second = first.and_then(|f| transfers.iter().find(|t| t.mint != f.mint));
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::{TokenAmount, TransferKind};

    fn transfer(mint: &str, amount: u64) -> TransferEvent {
        TransferEvent {
            kind: TransferKind::Transfer,
            program_id: "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".into(),
            source: "src".into(),
            destination: "dst".into(),
            destination_owner: None,
            authority: None,
            mint: mint.into(),
            amount: TokenAmount::from_raw(amount as u128, 6),
            source_pre_balance: None,
            source_post_balance: None,
            destination_pre_balance: None,
            destination_post_balance: None,
            idx: "0-0".into(),
            is_fee: false,
        }
    }

    #[test]
    fn mint_pair_skips_same_mint_repeats() {
        let transfers = vec![transfer("A", 1), transfer("A", 2), transfer("B", 3)];
        let (t0, t1) = distinct_mint_pair(&transfers);
        assert_eq!(t0.unwrap().mint, "A");
        assert_eq!(t1.unwrap().mint, "B");
    }

    #[test]
    fn mint_pair_with_single_mint() {
        let transfers = vec![transfer("A", 1), transfer("A", 2)];
        let (t0, t1) = distinct_mint_pair(&transfers);
        assert!(t0.is_some());
        assert!(t1.is_none());
    }
}
