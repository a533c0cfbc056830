//! End-to-end pipeline tests over hand-built JSON transactions.

use serde_json::json;
use solana_dex_parser::adapter::ResolvedInstruction;
use solana_dex_parser::core::constants::{
    SOL_MINT, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID, USDC_MINT,
};
use solana_dex_parser::instr::program_ids::PUMPFUN_PROGRAM_ID;
use solana_dex_parser::instr::pumpfun::discriminators as pumpfun_disc;
use solana_dex_parser::transfer::TransferClassifier;
use solana_dex_parser::{
    ClassifiedInstruction, DexParser, ExtraActions, InstructionClassifier, TradeType,
    TransactionAdapter, TransactionInput, TransferKind,
};
use std::collections::HashMap;

struct FixedClassifier {
    map: HashMap<String, Vec<ClassifiedInstruction>>,
}

impl InstructionClassifier for FixedClassifier {
    fn program_ids(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    fn instructions_for(&self, program_id: &str) -> Vec<ClassifiedInstruction> {
        self.map.get(program_id).cloned().unwrap_or_default()
    }
}

fn no_instructions() -> FixedClassifier {
    FixedClassifier { map: HashMap::new() }
}

/// A legacy transaction whose outer instruction 0 belongs to program `P` and
/// wraps an spl-token transfer of 1 USDC (raw 1_000_000).
fn usdc_transfer_tx() -> TransactionInput {
    serde_json::from_value(json!({
        "slot": 5000,
        "blockTime": 1_700_000_100,
        "transaction": {
            "signatures": ["usdc-sig"],
            "message": {
                "accountKeys": [
                    { "pubkey": "payer", "signer": true, "writable": true },
                    { "pubkey": "src-token-acct", "signer": false, "writable": true },
                    { "pubkey": "dst-token-acct", "signer": false, "writable": true },
                ],
                "instructions": [
                    { "programId": "P", "accounts": ["src-token-acct", "dst-token-acct"] },
                ],
            },
        },
        "meta": {
            "preTokenBalances": [
                { "accountIndex": 1, "mint": USDC_MINT, "owner": "payer",
                  "uiTokenAmount": { "amount": "3000000", "decimals": 6 } },
                { "accountIndex": 2, "mint": USDC_MINT, "owner": "counterparty",
                  "uiTokenAmount": { "amount": "0", "decimals": 6 } },
            ],
            "postTokenBalances": [
                { "accountIndex": 1, "mint": USDC_MINT, "owner": "payer",
                  "uiTokenAmount": { "amount": "2000000", "decimals": 6 } },
                { "accountIndex": 2, "mint": USDC_MINT, "owner": "counterparty",
                  "uiTokenAmount": { "amount": "1000000", "decimals": 6 } },
            ],
            "innerInstructions": [
                { "index": 0, "instructions": [
                    { "programId": TOKEN_PROGRAM_ID, "program": "spl-token",
                      "parsed": { "type": "transfer", "info": {
                          "source": "src-token-acct",
                          "destination": "dst-token-acct",
                          "amount": "1000000",
                          "authority": "payer",
                      } } },
                ] },
            ],
        },
    }))
    .unwrap()
}

#[test]
fn wrapped_usdc_transfer_is_keyed_to_the_outer_program() {
    let input = usdc_transfer_tx();
    let adapter = TransactionAdapter::new(&input).unwrap();
    let map = TransferClassifier::new(&adapter).classify(ExtraActions::NONE);

    let events = map.get("P:0-0").expect("transfer keyed to outer program");
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind, TransferKind::Transfer);
    assert_eq!(event.mint, USDC_MINT);
    assert_eq!(event.amount.amount, "1000000");
    assert_eq!(event.amount.ui_amount, Some(1.0));
    assert_eq!(event.amount.decimals, 6);
    assert_eq!(event.source, "src-token-acct");
    assert_eq!(event.destination, "dst-token-acct");
    assert_eq!(event.authority.as_deref(), Some("payer"));
}

#[test]
fn pipeline_surfaces_transfers_without_any_dex_decoder_match() {
    let input = usdc_transfer_tx();
    let result = DexParser::default().parse(&input, &no_instructions());
    assert!(result.state);
    assert!(result.trades.is_empty());
    assert_eq!(result.transfers.len(), 1);
    assert_eq!(result.transfers[0].mint, USDC_MINT);
    assert_eq!(result.transfers[0].idx, "0-0");
}

#[test]
fn unwrapped_top_level_transfer_reaches_the_parse_output() {
    // The transfer is a plain outer instruction, not wrapped by any DEX
    // program, so it only ever lands in the top-level bucket.
    let input: TransactionInput = serde_json::from_value(json!({
        "slot": 6000,
        "blockTime": 1_700_000_150,
        "transaction": {
            "signatures": ["plain-sig"],
            "message": {
                "accountKeys": [
                    { "pubkey": "payer", "signer": true, "writable": true },
                    { "pubkey": "src-token-acct", "signer": false, "writable": true },
                    { "pubkey": "dst-token-acct", "signer": false, "writable": true },
                ],
                "instructions": [
                    { "programId": TOKEN_PROGRAM_ID, "program": "spl-token",
                      "parsed": { "type": "transfer", "info": {
                          "source": "src-token-acct",
                          "destination": "dst-token-acct",
                          "amount": "500000",
                          "authority": "payer",
                      } } },
                ],
            },
        },
        "meta": {
            "postTokenBalances": [
                { "accountIndex": 1, "mint": USDC_MINT, "owner": "payer",
                  "uiTokenAmount": { "amount": "500000", "decimals": 6 } },
                { "accountIndex": 2, "mint": USDC_MINT, "owner": "counterparty",
                  "uiTokenAmount": { "amount": "500000", "decimals": 6 } },
            ],
        },
    }))
    .unwrap();

    let adapter = TransactionAdapter::new(&input).unwrap();
    let map = TransferClassifier::new(&adapter).classify(ExtraActions::NONE);
    assert_eq!(map.top_level().len(), 1);

    let result = DexParser::default().parse(&input, &no_instructions());
    assert!(result.state);
    assert_eq!(result.transfers.len(), 1);
    assert_eq!(result.transfers[0].mint, USDC_MINT);
    assert_eq!(result.transfers[0].amount.amount, "500000");
    assert_eq!(result.transfers[0].idx, "0");
}

#[test]
fn versioned_account_table_appends_lookup_addresses() {
    let input: TransactionInput = serde_json::from_value(json!({
        "slot": 1,
        "transaction": {
            "signatures": ["sig"],
            "message": {
                "accountKeys": ["payer", "static-1"],
                "header": {
                    "numRequiredSignatures": 1,
                    "numReadonlySignedAccounts": 0,
                    "numReadonlyUnsignedAccounts": 1,
                },
                "instructions": [],
                "addressTableLookups": [
                    { "accountKey": "table", "writableIndexes": [0], "readonlyIndexes": [1] },
                ],
            },
        },
        "meta": {
            "loadedAddresses": { "writable": ["alt-w"], "readonly": ["alt-r"] },
        },
    }))
    .unwrap();
    let adapter = TransactionAdapter::new(&input).unwrap();

    assert!(adapter.is_versioned());
    assert_eq!(
        adapter.account_keys(),
        &["payer", "static-1", "alt-w", "alt-r"]
    );
    assert_eq!(adapter.fee_payer(), "payer");
    assert_eq!(adapter.signers(), vec!["payer".to_string()]);
}

#[test]
fn pumpfun_buy_decodes_end_to_end() {
    let mint = "MemeMint1111111111111111111111111111111111";
    let input: TransactionInput = serde_json::from_value(json!({
        "slot": 9000,
        "blockTime": 1_700_000_200,
        "transaction": {
            "signatures": ["buy-sig"],
            "message": {
                "accountKeys": [
                    { "pubkey": "payer", "signer": true, "writable": true },
                    { "pubkey": "curve-vault", "signer": false, "writable": true },
                    { "pubkey": "curve-token-acct", "signer": false, "writable": true },
                    { "pubkey": "user-token-acct", "signer": false, "writable": true },
                ],
                "instructions": [
                    { "programId": PUMPFUN_PROGRAM_ID, "accounts": [] },
                ],
            },
        },
        "meta": {
            "preBalances": [5_000_000_000u64, 100, 0, 0],
            "postBalances": [3_999_000_000u64, 1_000_000_100u64, 0, 0],
            "preTokenBalances": [
                { "accountIndex": 2, "mint": mint, "owner": "curve-auth",
                  "uiTokenAmount": { "amount": "100000000", "decimals": 6 } },
                { "accountIndex": 3, "mint": mint, "owner": "payer",
                  "uiTokenAmount": { "amount": "0", "decimals": 6 } },
            ],
            "postTokenBalances": [
                { "accountIndex": 2, "mint": mint, "owner": "curve-auth",
                  "uiTokenAmount": { "amount": "58000000", "decimals": 6 } },
                { "accountIndex": 3, "mint": mint, "owner": "payer",
                  "uiTokenAmount": { "amount": "42000000", "decimals": 6 } },
            ],
            "innerInstructions": [
                { "index": 0, "instructions": [
                    { "programId": SYSTEM_PROGRAM_ID, "program": "system",
                      "parsed": { "type": "transfer", "info": {
                          "source": "payer",
                          "destination": "curve-vault",
                          "lamports": 1_000_000_000u64,
                      } } },
                    { "programId": TOKEN_PROGRAM_ID, "program": "spl-token",
                      "parsed": { "type": "transfer", "info": {
                          "source": "curve-token-acct",
                          "destination": "user-token-acct",
                          "amount": "42000000",
                          "authority": "curve-auth",
                      } } },
                ] },
            ],
        },
    }))
    .unwrap();

    let buy = ClassifiedInstruction {
        instruction: ResolvedInstruction {
            program_id: PUMPFUN_PROGRAM_ID.to_string(),
            accounts: vec![
                "global".into(),
                "fee-recipient".into(),
                mint.to_string(),
                "curve-vault".into(),
                "curve-token-acct".into(),
                "user-token-acct".into(),
                "payer".into(),
            ],
            data: pumpfun_disc::BUY.to_vec(),
            parsed: None,
        },
        program_id: PUMPFUN_PROGRAM_ID.to_string(),
        outer_index: 0,
        inner_index: None,
    };
    let classifier = FixedClassifier {
        map: HashMap::from([(PUMPFUN_PROGRAM_ID.to_string(), vec![buy])]),
    };

    let result = DexParser::default().parse(&input, &classifier);
    assert!(result.state);
    assert_eq!(result.trades.len(), 1);

    let trade = &result.trades[0];
    assert_eq!(trade.trade_type, TradeType::Buy);
    assert_eq!(trade.input_token.mint, SOL_MINT);
    assert_eq!(trade.input_token.amount_raw, "1000000000");
    assert_eq!(trade.output_token.mint, mint);
    assert_eq!(trade.output_token.amount_raw, "42000000");
    assert_eq!(trade.output_token.decimals, 6);
    assert_eq!(trade.pools, vec!["curve-vault".to_string()]);
    assert_eq!(trade.user, "payer");
    assert_eq!(trade.slot, 9000);
    assert_eq!(trade.signature, "buy-sig");
    assert_eq!(trade.idx, "0");
    // Both sides carry the matched transfer's endpoints.
    assert_eq!(trade.input_token.source.as_deref(), Some("payer"));
    assert_eq!(trade.output_token.destination.as_deref(), Some("user-token-acct"));
}
