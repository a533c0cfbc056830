//! Transaction input model
//!
//! Serde view over the two on-chain transaction encodings as delivered by
//! JSON RPC: legacy (inline account keys with signer/writable flags, possibly
//! pre-parsed instructions) and versioned v0 (static key array, message
//! header, compiled instructions, address-table lookups).
//!
//! The two dynamic unions of the wire format are modeled as closed
//! two-variant tagged types, resolved once at adapter construction and never
//! re-probed at use sites: [`AccountKey`] (string-or-object) and
//! [`InstructionPayload`] (compiled-or-parsed).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    #[serde(default)]
    pub slot: u64,
    pub block_time: Option<i64>,
    pub transaction: TransactionEnvelope,
    pub meta: Option<TransactionMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEnvelope {
    #[serde(default)]
    pub signatures: Vec<String>,
    pub message: Option<Message>,
}

/// Union of the legacy and v0 message shapes. Versioned detection: header
/// present AND static-key list non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub account_keys: Vec<AccountKey>,
    pub header: Option<MessageHeader>,
    #[serde(default)]
    pub instructions: Vec<InstructionPayload>,
    #[serde(default)]
    pub address_table_lookups: Vec<AddressTableLookup>,
    pub recent_blockhash: Option<String>,
}

/// The string-or-object account-key encoding of the legacy union.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountKey {
    Parsed {
        pubkey: String,
        #[serde(default)]
        signer: bool,
        #[serde(default)]
        writable: bool,
    },
    Plain(String),
}

impl AccountKey {
    pub fn pubkey(&self) -> &str {
        match self {
            AccountKey::Parsed { pubkey, .. } => pubkey,
            AccountKey::Plain(pubkey) => pubkey,
        }
    }

    pub fn is_signer(&self) -> bool {
        matches!(self, AccountKey::Parsed { signer: true, .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    #[serde(default)]
    pub num_required_signatures: u8,
    #[serde(default)]
    pub num_readonly_signed_accounts: u8,
    #[serde(default)]
    pub num_readonly_unsigned_accounts: u8,
}

/// The compiled-or-parsed instruction payload union.
///
/// Compiled: index-addressed accounts plus base58 data. Parsed: named fields,
/// optionally carrying a structured `{type, info}` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstructionPayload {
    Compiled {
        #[serde(rename = "programIdIndex")]
        program_id_index: u16,
        #[serde(default)]
        accounts: Vec<u16>,
        #[serde(default)]
        data: String,
    },
    Parsed {
        #[serde(rename = "programId")]
        program_id: String,
        #[serde(default)]
        accounts: Vec<String>,
        #[serde(default)]
        data: Option<String>,
        #[serde(default)]
        parsed: Option<Value>,
        #[serde(default)]
        program: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddressTableLookup {
    pub account_key: String,
    #[serde(default)]
    pub writable_indexes: Vec<u16>,
    #[serde(default)]
    pub readonly_indexes: Vec<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Vec<TokenBalance>,
    #[serde(default)]
    pub post_token_balances: Vec<TokenBalance>,
    #[serde(default)]
    pub inner_instructions: Vec<InnerInstructionGroup>,
    #[serde(default)]
    pub log_messages: Vec<String>,
    pub compute_units_consumed: Option<u64>,
    #[serde(default)]
    pub loaded_addresses: LoadedAddresses,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: usize,
    pub mint: String,
    pub owner: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    #[serde(default)]
    pub amount: String,
    pub ui_amount: Option<f64>,
    #[serde(default)]
    pub decimals: u8,
}

/// One group of inner instructions, keyed by the outer instruction index.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InnerInstructionGroup {
    pub index: usize,
    #[serde(default)]
    pub instructions: Vec<InstructionPayload>,
}

/// Addresses already resolved from address lookup tables, in table order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadedAddresses {
    #[serde(default)]
    pub writable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_key_union_deserializes_both_shapes() {
        let keys: Vec<AccountKey> = serde_json::from_value(json!([
            "So11111111111111111111111111111111111111112",
            {"pubkey": "11111111111111111111111111111111", "signer": true, "writable": false}
        ]))
        .unwrap();
        assert_eq!(keys[0].pubkey(), "So11111111111111111111111111111111111111112");
        assert!(!keys[0].is_signer());
        assert!(keys[1].is_signer());
    }

    #[test]
    fn instruction_payload_union_deserializes_both_shapes() {
        let compiled: InstructionPayload = serde_json::from_value(json!({
            "programIdIndex": 3, "accounts": [0, 1, 2], "data": "3Bxs4h24hBtQy9rw"
        }))
        .unwrap();
        assert!(matches!(compiled, InstructionPayload::Compiled { .. }));

        let parsed: InstructionPayload = serde_json::from_value(json!({
            "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "accounts": [],
            "parsed": {"type": "transfer", "info": {"amount": "1"}},
            "program": "spl-token"
        }))
        .unwrap();
        assert!(matches!(parsed, InstructionPayload::Parsed { .. }));
    }

    #[test]
    fn missing_optional_fields_default() {
        let input: TransactionInput = serde_json::from_value(json!({
            "transaction": {"signatures": [], "message": {"accountKeys": [], "instructions": []}}
        }))
        .unwrap();
        assert_eq!(input.slot, 0);
        assert!(input.meta.is_none());
    }
}
