//! MAC / authentication capability (§3 `AuthConfig`, §6 `Mac`).

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use aes::cipher::{BlockEncrypt, KeyInit as BlockKeyInit};
use aes::Aes256;
use hmac::{Hmac, Mac as HmacMacTrait};
use poly1305::universal_hash::{KeyInit as UhKeyInit, UniversalHash};
use poly1305::Poly1305;
use sha2::Sha256;
use sha3::Sha3_256;
use subtle::ConstantTimeEq;

use crate::error::{ObscurCoreError, Result};
use crate::registry::{self, AuthCapability};

/// `function_kind` from §3's `AuthConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Mac,
    Poly1305,
}

/// `(function_kind, function_name, key_size_bits?, nonce?, salt?, additional_data?)` (§3).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub kind: AuthKind,
    pub function_name: String,
    /// Poly1305's auxiliary nonce, AES-block-encrypted for single-key-use safety.
    pub nonce: Option<Vec<u8>>,
    pub salt: Vec<u8>,
    pub additional_data: Vec<u8>,
}

impl AuthConfig {
    pub fn capability(&self) -> Result<AuthCapability> {
        registry::auth_by_name(&self.function_name)
    }

    pub fn validate(&self, tag_len_bits: usize) -> Result<()> {
        let cap = self.capability()?;
        registry::check_mac_size(cap, tag_len_bits)?;
        if matches!(self.kind, AuthKind::Poly1305) && self.nonce.is_none() {
            return Err(ObscurCoreError::ConfigurationInvalid(
                "Poly1305 requires an auxiliary nonce".to_string(),
            ));
        }
        Ok(())
    }
}

/// Compute a MAC tag over `data` under `key`, per the named function.
pub fn compute(cfg: &AuthConfig, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    cfg.validate(cfg.capability()?.output_sizes_bits[0])?;
    let cap = cfg.capability()?;
    match cap.name {
        "HMAC-SHA256" => hmac_with::<Hmac<Sha256>>(key, data),
        "HMAC-SHA3-256" => hmac_with::<Hmac<Sha3_256>>(key, data),
        "Poly1305" => poly1305_tag(cfg, key, data),
        other => Err(ObscurCoreError::ConfigurationInvalid(unknown(other))),
    }
}

/// Recompute the tag and compare constant-time against `expected`.
pub fn verify(cfg: &AuthConfig, key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool> {
    let tag = compute(cfg, key, data)?;
    if tag.len() != expected.len() {
        return Ok(false);
    }
    Ok(tag.ct_eq(expected).into())
}

fn hmac_with<M: HmacMacTrait>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac =
        M::new_from_slice(key).map_err(|_| ObscurCoreError::ConfigurationInvalid("MAC key rejected".to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Poly1305 with a single-key-use nonce: the registry's auxiliary nonce
/// is AES-256-ECB-encrypted under `key`'s trailing 32 bytes to produce a
/// fresh one-time Poly1305 key per §3's "Poly1305 carries an auxiliary
/// block-cipher-encrypted nonce for single-key-use safety."
fn poly1305_tag(cfg: &AuthConfig, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let nonce = cfg
        .nonce
        .as_ref()
        .ok_or_else(|| ObscurCoreError::ConfigurationInvalid("Poly1305 requires a nonce".to_string()))?;
    if key.len() < 32 || nonce.len() != 16 {
        return Err(ObscurCoreError::ConfigurationInvalid(
            "Poly1305 key/nonce have the wrong length".to_string(),
        ));
    }

    let aes_key: [u8; 32] = key[..32]
        .try_into()
        .map_err(|_| ObscurCoreError::ConfigurationInvalid("Poly1305 aux key rejected".to_string()))?;
    let block_cipher = Aes256::new(&aes_key.into());
    let mut block: aes::Block = (*<&[u8; 16]>::try_from(nonce.as_slice()).unwrap()).into();
    block_cipher.encrypt_block(&mut block);

    let mut one_time_key = [0u8; 32];
    one_time_key[..16].copy_from_slice(&block);
    one_time_key[16..].copy_from_slice(&key[..16]);

    let mut poly = Poly1305::new_from_slice(&one_time_key)
        .map_err(|_| ObscurCoreError::ConfigurationInvalid("Poly1305 one-time key rejected".to_string()))?;
    poly.update_padded(data);
    Ok(poly.finalize().into_bytes().to_vec())
}

fn unknown(name: &str) -> String {
    let mut s = "registered but unhandled auth function: ".to_string();
    s.push_str(name);
    s
}
