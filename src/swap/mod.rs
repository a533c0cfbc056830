//! Swap synthesis and multi-hop aggregation
//!
//! Turns the raw transfers correlated to one instruction into a single
//! TradeInfo, and collapses multi-hop chains into one logical swap.
//!
//! The BUY/SELL label is a documented heuristic: input SOL means BUY, output
//! SOL means SELL, a recognized quote-currency input means BUY, anything
//! else SELL. Stable-to-stable and exotic-to-exotic swaps are misclassified
//! by this rule and deliberately left that way.
//!
//! Provenance attachment matches transfers by exact (mint, raw amount),
//! which can mis-attribute when two transfers share both; also a documented
//! limitation.

use crate::core::constants::*;
use crate::core::events::*;
use crate::instr::{provenance, DecodeContext, Provenance};
use crate::transfer::parse_idx;
use tracing::debug;

/// Synthesizes one trade from the transfers of a single swap instruction,
/// then attaches provenance and fee details from the wider transaction.
pub fn synthesize(
    ctx: &DecodeContext<'_, '_>,
    transfers: &[TransferEvent],
    dex: &DexInfo,
    idx: &str,
    skip_native: bool,
) -> Option<TradeInfo> {
    let prov = provenance(ctx.adapter);
    let mut trade = synthesize_core(transfers, dex, idx, &prov, skip_native)?;
    attach_transfer_info(&mut trade, ctx);
    attach_fee(&mut trade, ctx);
    Some(trade)
}

/// Pure synthesis over a transfer list. Deterministic and idempotent:
/// repeated runs over the same list produce identical trades.
pub(crate) fn synthesize_core(
    transfers: &[TransferEvent],
    dex: &DexInfo,
    idx: &str,
    prov: &Provenance,
    skip_native: bool,
) -> Option<TradeInfo> {
    // Dedup, optionally dropping native movements.
    let mut unique: Vec<&TransferEvent> = Vec::with_capacity(transfers.len());
    for transfer in transfers {
        if skip_native && transfer.mint == SOL_MINT {
            continue;
        }
        if !unique.contains(&transfer) {
            unique.push(transfer);
        }
    }

    // Distinct mints in encounter order; fewer than two means this was not
    // a swap.
    let mut mints: Vec<&str> = Vec::new();
    for transfer in &unique {
        if !mints.contains(&transfer.mint.as_str()) {
            mints.push(&transfer.mint);
        }
    }
    if mints.len() < 2 {
        debug!(idx, mints = mints.len(), "no trade: fewer than 2 distinct mints");
        return None;
    }

    let mut input_mint = mints[0].to_string();
    let mut output_mint = mints[mints.len() - 1].to_string();

    // A transfer whose source or authority is the signer is money leaving
    // the signer, i.e. the true input; routers move funds on the signer's
    // behalf. Swap the assignment when the output candidate looks like
    // that.
    let leaves_signer = |t: &TransferEvent| {
        let from_signer = prov.signers.iter().any(|s| *s == t.source)
            || t.authority
                .as_deref()
                .is_some_and(|a| prov.signers.iter().any(|s| s == a));
        let from_router = ROUTER_PROGRAMS.contains(t.source.as_str())
            || t.authority
                .as_deref()
                .is_some_and(|a| ROUTER_PROGRAMS.contains(a));
        from_signer || from_router
    };
    if unique
        .iter()
        .find(|t| t.mint == output_mint)
        .is_some_and(|t| leaves_signer(t))
    {
        std::mem::swap(&mut input_mint, &mut output_mint);
    }

    // Sum both sides, keeping fee transfers out of the totals (first one is
    // captured as the trade fee) and skipping the router-passthrough shape
    // that would double count: router authority delivering back to the
    // signer.
    let mut input_total: u128 = 0;
    let mut output_total: u128 = 0;
    let mut input_decimals = None;
    let mut output_decimals = None;
    let mut fee: Option<TokenInfo> = None;
    for transfer in &unique {
        if transfer.is_fee {
            fee.get_or_insert_with(|| token_info_of(transfer));
            continue;
        }
        let passthrough = transfer
            .authority
            .as_deref()
            .is_some_and(|a| ROUTER_PROGRAMS.contains(a))
            && prov.signers.iter().any(|s| {
                *s == transfer.destination
                    || transfer.destination_owner.as_deref() == Some(s.as_str())
            });
        if passthrough {
            continue;
        }
        let raw = transfer.amount.raw().unwrap_or(0);
        if transfer.mint == input_mint {
            input_total += raw;
            input_decimals.get_or_insert(transfer.amount.decimals);
        } else if transfer.mint == output_mint {
            output_total += raw;
            output_decimals.get_or_insert(transfer.amount.decimals);
        }
    }

    let trade_type = trade_type_for(&input_mint, &output_mint);
    Some(TradeInfo {
        user: prov.user.clone(),
        trade_type,
        pools: Vec::new(),
        input_token: TokenInfo::new(&input_mint, input_total, input_decimals.unwrap_or(0)),
        output_token: TokenInfo::new(&output_mint, output_total, output_decimals.unwrap_or(0)),
        fee,
        program_id: dex.program_id.clone(),
        amm: dex.amm.clone(),
        route: dex.route.clone(),
        slot: prov.slot,
        timestamp: prov.timestamp,
        signature: prov.signature.clone(),
        idx: idx.to_string(),
        signers: prov.signers.clone(),
    })
}

/// BUY/SELL heuristic; see module docs for its documented blind spots.
pub fn trade_type_for(input_mint: &str, output_mint: &str) -> TradeType {
    if input_mint == SOL_MINT {
        TradeType::Buy
    } else if output_mint == SOL_MINT {
        TradeType::Sell
    } else if QUOTE_MINTS.contains(input_mint) {
        TradeType::Buy
    } else {
        TradeType::Sell
    }
}

/// Copies authority/source/destination/balance fields onto both trade sides
/// from the transfer whose (mint, raw amount) exactly match. Without an
/// exact match, the signer's aggregate balance change stands in as the
/// before/after proxy.
pub fn attach_transfer_info(trade: &mut TradeInfo, ctx: &DecodeContext<'_, '_>) {
    let find = |mint: &str, raw: &str| -> Option<TransferEvent> {
        ctx.transfers
            .iter()
            .flat_map(|(_, events)| events.iter())
            .find(|e| e.mint == mint && e.amount.amount == raw)
            .cloned()
    };

    let signer = trade.user.clone();
    let matched_in = find(&trade.input_token.mint, &trade.input_token.amount_raw);
    fill_side(&mut trade.input_token, matched_in, ctx, &signer);
    let matched_out = find(&trade.output_token.mint, &trade.output_token.amount_raw);
    fill_side(&mut trade.output_token, matched_out, ctx, &signer);
}

fn fill_side(
    side: &mut TokenInfo,
    matched: Option<TransferEvent>,
    ctx: &DecodeContext<'_, '_>,
    signer: &str,
) {
    if let Some(event) = matched {
        side.authority = event.authority.clone();
        side.source = Some(event.source.clone());
        side.destination = Some(event.destination.clone());
        side.balance_change = balance_change_from(&event);
    } else if side.balance_change.is_none() {
        side.balance_change = signer_balance_proxy(ctx, signer, &side.mint);
    }
}

/// When no explicit fee transfer was captured, the residual between the
/// summed output and what the signer actually gained is reported as an
/// implicit fee, if positive.
pub fn attach_fee(trade: &mut TradeInfo, ctx: &DecodeContext<'_, '_>) {
    if trade.fee.is_some() {
        return;
    }
    let Some(output_raw) = trade.output_token.amount_raw.parse::<u128>().ok() else {
        return;
    };
    let Some(increase) = signer_balance_increase(ctx, &trade.user, &trade.output_token.mint)
    else {
        return;
    };
    if increase > 0 && (increase as u128) < output_raw {
        let implicit = output_raw - increase as u128;
        trade.fee = Some(TokenInfo::new(
            &trade.output_token.mint,
            implicit,
            trade.output_token.decimals,
        ));
    }
}

/// Collapses a multi-hop chain into one logical swap. Hops are ordered by
/// instruction position (outer then inner, ascending numerically); boundary
/// mints come from the first hop's input and the last hop's output; every
/// hop amount matching a boundary mint is summed so cyclic and overlapping
/// routes stay consistent. A single hop passes through unchanged.
pub fn collapse(hops: &[TradeInfo], dex: Option<&DexInfo>) -> Option<TradeInfo> {
    if hops.is_empty() {
        return None;
    }
    if hops.len() == 1 {
        return Some(hops[0].clone());
    }

    let mut ordered: Vec<&TradeInfo> = hops.iter().collect();
    ordered.sort_by_key(|h| parse_idx(&h.idx));

    let first = ordered[0];
    let last = ordered[ordered.len() - 1];
    let input_mint = first.input_token.mint.clone();
    let output_mint = last.output_token.mint.clone();

    let mut input_total: u128 = 0;
    let mut output_total: u128 = 0;
    for hop in &ordered {
        if hop.input_token.mint == input_mint {
            input_total += hop.input_token.amount_raw.parse::<u128>().unwrap_or(0);
        }
        if hop.output_token.mint == output_mint {
            output_total += hop.output_token.amount_raw.parse::<u128>().unwrap_or(0);
        }
    }

    let mut pools: Vec<String> = Vec::new();
    for hop in &ordered {
        for pool in &hop.pools {
            if !pools.contains(pool) {
                pools.push(pool.clone());
            }
        }
    }

    let mut merged = first.clone();
    merged.trade_type = trade_type_for(&input_mint, &output_mint);
    merged.input_token = TokenInfo {
        amount: ui_amount(input_total as i128, first.input_token.decimals),
        amount_raw: input_total.to_string(),
        ..first.input_token.clone()
    };
    merged.output_token = TokenInfo {
        amount: ui_amount(output_total as i128, last.output_token.decimals),
        amount_raw: output_total.to_string(),
        ..last.output_token.clone()
    };
    merged.pools = pools;
    merged.fee = ordered.iter().find_map(|h| h.fee.clone());
    if let Some(dex) = dex {
        merged.program_id = dex.program_id.clone();
        merged.amm = dex.amm.clone();
        merged.route = dex.route.clone();
    }
    Some(merged)
}

fn token_info_of(transfer: &TransferEvent) -> TokenInfo {
    TokenInfo {
        mint: transfer.mint.clone(),
        amount: transfer.amount.ui_amount.unwrap_or(0.0),
        amount_raw: transfer.amount.amount.clone(),
        decimals: transfer.amount.decimals,
        authority: transfer.authority.clone(),
        source: Some(transfer.source.clone()),
        destination: Some(transfer.destination.clone()),
        balance_change: None,
    }
}

fn balance_change_from(event: &TransferEvent) -> Option<BalanceChange> {
    let pre = event.source_pre_balance.as_ref()?.raw()?;
    let post = event.source_post_balance.as_ref()?.raw()?;
    BalanceChange::diff(pre, post, event.amount.decimals)
}

fn signer_balance_proxy(
    ctx: &DecodeContext<'_, '_>,
    signer: &str,
    mint: &str,
) -> Option<BalanceChange> {
    if mint == SOL_MINT {
        return ctx.adapter.sol_balance_changes(true).remove(signer);
    }
    ctx.adapter
        .token_balance_changes(true)
        .remove(signer)?
        .remove(mint)
}

fn signer_balance_increase(ctx: &DecodeContext<'_, '_>, signer: &str, mint: &str) -> Option<i128> {
    let change = signer_balance_proxy(ctx, signer, mint)?;
    change.change.amount.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::{TokenAmount, TransferKind};

    fn transfer(mint: &str, amount: u64, decimals: u8, idx: &str) -> TransferEvent {
        TransferEvent {
            kind: TransferKind::Transfer,
            program_id: "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".into(),
            source: format!("src-{mint}"),
            destination: format!("dst-{mint}"),
            destination_owner: None,
            authority: Some(format!("auth-{mint}")),
            mint: mint.into(),
            amount: TokenAmount::from_raw(amount as u128, decimals),
            source_pre_balance: None,
            source_post_balance: None,
            destination_pre_balance: None,
            destination_post_balance: None,
            idx: idx.into(),
            is_fee: false,
        }
    }

    fn prov() -> Provenance {
        Provenance {
            slot: 1,
            timestamp: 10,
            signature: "sig".into(),
            signers: vec!["wallet".into()],
            user: "wallet".into(),
        }
    }

    fn dex() -> DexInfo {
        DexInfo { program_id: "pgm".into(), amm: "TestAmm".into(), route: "TestAmm".into() }
    }

    #[test]
    fn one_distinct_mint_yields_no_trade() {
        let transfers = vec![transfer("MintA", 5, 6, "0-0"), transfer("MintA", 7, 6, "0-1")];
        assert!(synthesize_core(&transfers, &dex(), "0", &prov(), false).is_none());
    }

    #[test]
    fn two_distinct_mints_yield_disjoint_sides() {
        let transfers = vec![
            transfer(SOL_MINT, 1_000_000_000, 9, "0-0"),
            transfer("MintX", 2_000_000, 6, "0-1"),
        ];
        let trade = synthesize_core(&transfers, &dex(), "0", &prov(), false).unwrap();
        assert_ne!(trade.input_token.mint, trade.output_token.mint);
        assert_eq!(trade.input_token.mint, SOL_MINT);
        assert_eq!(trade.input_token.amount_raw, "1000000000");
        assert_eq!(trade.output_token.amount_raw, "2000000");
        assert_eq!(trade.trade_type, TradeType::Buy);
    }

    #[test]
    fn synthesis_is_idempotent() {
        let transfers = vec![
            transfer("MintX", 2_000_000, 6, "0-0"),
            transfer(SOL_MINT, 1_000_000_000, 9, "0-1"),
        ];
        let a = synthesize_core(&transfers, &dex(), "0", &prov(), false).unwrap();
        let b = synthesize_core(&transfers, &dex(), "0", &prov(), false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_transfers_count_once() {
        let t = transfer(SOL_MINT, 500, 9, "0-0");
        let transfers = vec![t.clone(), t, transfer("MintX", 9, 6, "0-1")];
        let trade = synthesize_core(&transfers, &dex(), "0", &prov(), false).unwrap();
        assert_eq!(trade.input_token.amount_raw, "500");
    }

    #[test]
    fn output_leaving_signer_swaps_assignment() {
        // First-seen mint is MintX, but the MintX transfer's source is the
        // signer's account, so MintX must be the true input.
        let mut leaving = transfer("MintX", 100, 6, "0-0");
        leaving.source = "wallet".into();
        let transfers = vec![transfer(SOL_MINT, 700, 9, "0-0"), leaving];
        // Output candidate (last mint = MintX) leaves the signer: swapped.
        let trade = synthesize_core(&transfers, &dex(), "0", &prov(), false).unwrap();
        assert_eq!(trade.input_token.mint, "MintX");
        assert_eq!(trade.output_token.mint, SOL_MINT);
        assert_eq!(trade.trade_type, TradeType::Sell);
    }

    #[test]
    fn output_sourced_from_router_swaps_assignment() {
        use crate::instr::program_ids::JUPITER_V6_PROGRAM_ID;
        // The MintX transfer is funded directly from a router program
        // account, so MintX is money moving on the signer's behalf, i.e.
        // the true input.
        let mut routed = transfer("MintX", 100, 6, "0-1");
        routed.source = JUPITER_V6_PROGRAM_ID.into();
        routed.authority = None;
        let transfers = vec![transfer(SOL_MINT, 700, 9, "0-0"), routed];
        let trade = synthesize_core(&transfers, &dex(), "0", &prov(), false).unwrap();
        assert_eq!(trade.input_token.mint, "MintX");
        assert_eq!(trade.output_token.mint, SOL_MINT);
    }

    #[test]
    fn fee_transfers_are_captured_not_summed() {
        let mut fee = transfer(SOL_MINT, 30, 9, "0-2");
        fee.is_fee = true;
        let transfers = vec![
            transfer(SOL_MINT, 1_000, 9, "0-0"),
            transfer("MintX", 42, 6, "0-1"),
            fee,
        ];
        let trade = synthesize_core(&transfers, &dex(), "0", &prov(), false).unwrap();
        assert_eq!(trade.input_token.amount_raw, "1000");
        assert_eq!(trade.fee.as_ref().unwrap().amount_raw, "30");
    }

    #[test]
    fn skip_native_requires_two_non_sol_mints() {
        let transfers = vec![
            transfer(SOL_MINT, 1_000, 9, "0-0"),
            transfer("MintX", 42, 6, "0-1"),
        ];
        assert!(synthesize_core(&transfers, &dex(), "0", &prov(), true).is_none());
    }

    fn hop(input: (&str, u64, u8), output: (&str, u64, u8), pool: &str, idx: &str) -> TradeInfo {
        TradeInfo {
            user: "wallet".into(),
            trade_type: trade_type_for(input.0, output.0),
            pools: vec![pool.into()],
            input_token: TokenInfo::new(input.0, input.1 as u128, input.2),
            output_token: TokenInfo::new(output.0, output.1 as u128, output.2),
            fee: None,
            program_id: "pgm".into(),
            amm: "TestAmm".into(),
            route: "TestAmm".into(),
            slot: 1,
            timestamp: 10,
            signature: "sig".into(),
            idx: idx.into(),
            signers: vec!["wallet".into()],
        }
    }

    #[test]
    fn collapse_two_hops_keeps_boundary_mints_and_pool_order() {
        let hops = vec![
            // Deliberately out of order; collapse sorts by position.
            hop(("MintX", 500, 6), (USDC_MINT, 90, 6), "pool-2", "3"),
            hop((SOL_MINT, 1_000, 9), ("MintX", 500, 6), "pool-1", "1"),
        ];
        let merged = collapse(&hops, None).unwrap();
        assert_eq!(merged.input_token.mint, SOL_MINT);
        assert_eq!(merged.output_token.mint, USDC_MINT);
        assert_eq!(merged.pools, vec!["pool-1".to_string(), "pool-2".to_string()]);
        assert_eq!(merged.input_token.amount_raw, "1000");
        assert_eq!(merged.output_token.amount_raw, "90");
        assert_eq!(merged.trade_type, TradeType::Buy);
        assert_eq!(merged.idx, "1");
    }

    #[test]
    fn collapse_single_hop_passes_through() {
        let only = hop((SOL_MINT, 10, 9), ("MintX", 20, 6), "pool", "0");
        assert_eq!(collapse(&[only.clone()], None).unwrap(), only);
    }

    #[test]
    fn collapse_does_not_mutate_originals() {
        let hops = vec![
            hop((SOL_MINT, 1_000, 9), ("MintX", 500, 6), "pool-1", "1"),
            hop(("MintX", 500, 6), (USDC_MINT, 90, 6), "pool-2", "3"),
        ];
        let snapshot = hops.clone();
        let _ = collapse(&hops, None);
        assert_eq!(hops, snapshot);
    }
}
