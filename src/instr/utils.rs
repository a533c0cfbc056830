//! Decoder utilities shared by every protocol decoder
//!
//! Discriminator slicing, payload deobfuscation and direction inference via
//! canonical associated-token-account derivation.

use crate::core::constants::{
    ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
use crate::core::events::TradeType;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Leading 8 bytes of instruction data, if present.
pub fn discriminator8(data: &[u8]) -> Option<[u8; 8]> {
    data.get(0..8)?.try_into().ok()
}

/// u64 little-endian at `offset`, if in bounds.
pub fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    data.get(offset..offset + 8)
        .map(|s| u64::from_le_bytes(s.try_into().unwrap()))
}

/// XOR payload deobfuscation. For each 8-byte block `i`, the mask is the
/// little-endian 16-bit encoding of `i` repeated to fill 8 bytes; every
/// payload byte is XORed with the secret key byte and the mask byte at its
/// position. Self-inverse: applying the transform twice reproduces the
/// original buffer.
pub fn deobfuscate(payload: &mut [u8], secret: &[u8; 8]) {
    for (block, chunk) in payload.chunks_mut(8).enumerate() {
        let mask = (block as u16).to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte ^= secret[i] ^ mask[i % 2];
        }
    }
}

/// Canonical associated-token-account addresses for (wallet, mint) under
/// the standard token program and token-2022, derived from the PDA seeds
/// `[wallet, token_program, mint]`. Unparseable addresses yield an empty
/// list.
pub fn associated_token_accounts(wallet: &str, mint: &str) -> Vec<String> {
    let (Ok(wallet), Ok(mint), Ok(ata_program)) = (
        Pubkey::from_str(wallet),
        Pubkey::from_str(mint),
        Pubkey::from_str(ASSOCIATED_TOKEN_PROGRAM_ID),
    ) else {
        return Vec::new();
    };
    [TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID]
        .iter()
        .filter_map(|program| Pubkey::from_str(program).ok())
        .map(|program| {
            Pubkey::find_program_address(
                &[wallet.as_ref(), program.as_ref(), mint.as_ref()],
                &ata_program,
            )
            .0
            .to_string()
        })
        .collect()
}

/// Direction inference when the payload carries no usable flag: the
/// wallet's canonical ATA for the traded mint appearing on the input side
/// means tokens are leaving the wallet (SELL); on the output side, arriving
/// (BUY); no match stays SWAP.
pub fn infer_direction(
    wallet: &str,
    mint: &str,
    input_account: &str,
    output_account: &str,
) -> TradeType {
    let atas = associated_token_accounts(wallet, mint);
    if atas.iter().any(|a| a == input_account) {
        TradeType::Sell
    } else if atas.iter().any(|a| a == output_account) {
        TradeType::Buy
    } else {
        TradeType::Swap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 8] = [0x5a, 0x19, 0xc3, 0x7e, 0x88, 0x24, 0xd1, 0x4f];

    #[test]
    fn deobfuscation_is_an_involution() {
        // Holds for any byte buffer, including lengths that are not a
        // multiple of the block size.
        for len in [0usize, 1, 7, 8, 9, 25, 64, 100] {
            let original: Vec<u8> = (0..len).map(|i| (i * 37 + 11) as u8).collect();
            let mut buf = original.clone();
            deobfuscate(&mut buf, &SECRET);
            if len > 0 {
                assert_ne!(buf, original);
            }
            deobfuscate(&mut buf, &SECRET);
            assert_eq!(buf, original);
        }
    }

    #[test]
    fn mask_varies_per_block() {
        let mut buf = vec![0u8; 16];
        deobfuscate(&mut buf, &SECRET);
        // Block 0 mask is zero, block 1 mask is 0x0001 LE, so the two
        // decoded blocks differ in their even-offset bytes.
        assert_eq!(buf[0] ^ buf[8], 1);
        assert_eq!(buf[1], buf[9]);
    }

    #[test]
    fn direction_inference_against_derived_atas() {
        let wallet = Pubkey::new_unique().to_string();
        let mint = Pubkey::new_unique().to_string();
        let atas = associated_token_accounts(&wallet, &mint);
        assert_eq!(atas.len(), 2);

        assert_eq!(infer_direction(&wallet, &mint, &atas[0], "other"), TradeType::Sell);
        assert_eq!(infer_direction(&wallet, &mint, "other", &atas[1]), TradeType::Buy);
        assert_eq!(infer_direction(&wallet, &mint, "a", "b"), TradeType::Swap);
    }

    #[test]
    fn malformed_addresses_yield_no_atas() {
        assert!(associated_token_accounts("not-base58!", "also-bad").is_empty());
    }

    #[test]
    fn ata_derivation_is_deterministic_and_program_scoped() {
        let wallet = Pubkey::new_unique().to_string();
        let mint = Pubkey::new_unique().to_string();
        let first = associated_token_accounts(&wallet, &mint);
        let second = associated_token_accounts(&wallet, &mint);
        assert_eq!(first, second);
        // The two token programs yield two different associated accounts.
        assert_ne!(first[0], first[1]);
        // Derived addresses are real 32-byte keys.
        for address in &first {
            assert!(Pubkey::from_str(address).is_ok());
        }
    }
}
