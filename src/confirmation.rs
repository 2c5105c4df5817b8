//! Key confirmation (C4): prove knowledge of a key without revealing it.
//!
//! A MAC over a fixed canonical string, compared constant-time — the
//! same pattern as the teacher's `aead_open`/`aead_seal` pair guarding
//! secret-dependent branches, applied to a cheap pre-check instead of
//! the full manifest decryption.

extern crate alloc;
use alloc::vec::Vec;

use hmac::{Hmac, Mac as HmacMacTrait};
use sha2::Sha256;
use sha3::Sha3_256;
use subtle::ConstantTimeEq;

use crate::error::{ObscurCoreError, Result};

/// Canonical challenge string MACed under the candidate key.
pub const CHALLENGE: &[u8] = b"obscurcore-v1-keyconfirm";

/// Which hash backs the confirmation MAC (mirrors `AuthConfig.function_name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationHash {
    Sha256,
    Sha3_256,
}

/// `generate(key, cfg) -> tag` (§4.3). `salt` is mixed in so the same key
/// produces different confirmation tags across independently configured
/// packages.
pub fn generate(key: &[u8], salt: &[u8], hash: ConfirmationHash) -> Result<Vec<u8>> {
    match hash {
        ConfirmationHash::Sha256 => mac_with::<Hmac<Sha256>>(key, salt),
        ConfirmationHash::Sha3_256 => mac_with::<Hmac<Sha3_256>>(key, salt),
    }
}

fn mac_with<M: HmacMacTrait>(key: &[u8], salt: &[u8]) -> Result<Vec<u8>> {
    let mut mac = M::new_from_slice(key)
        .map_err(|_| ObscurCoreError::ConfigurationInvalid("key confirmation key rejected".into()))?;
    mac.update(salt);
    mac.update(CHALLENGE);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// `verify(key, cfg, expected_tag) -> bool` (§4.3), constant-time over
/// the declared tag length regardless of where the first mismatch falls.
pub fn verify(key: &[u8], salt: &[u8], hash: ConfirmationHash, expected_tag: &[u8]) -> Result<bool> {
    let tag = generate(key, salt, hash)?;
    if tag.len() != expected_tag.len() {
        return Ok(false);
    }
    Ok(tag.ct_eq(expected_tag).into())
}
