//! Authenticated cipher stream (C5): Encrypt-then-MAC with a length
//! commitment, or native AEAD, over one plaintext buffer.
//!
//! Used twice: by the manifest envelope (C9) over the serialized manifest,
//! and once per payload item (C7) over that item's plaintext. Both callers
//! supply the same three ingredients — a `CipherConfig`, an `AuthConfig`,
//! and the descriptor bytes to bind as AAD — so this module has no notion
//! of "manifest" or "item," only "plaintext in, descriptor bound, tag out."

extern crate alloc;
use alloc::vec::Vec;

use crate::cipher::{self, CipherConfig};
use crate::error::{ObscurCoreError, Result};
use crate::mac::{self, AuthConfig};
use crate::registry::CipherKind;

/// `(cipher_key, mac_key)` for one cipher-stream invocation. For AEAD
/// kinds `mac_key` is unused (the AEAD tag folds in everything a
/// separate MAC would have covered) but kept so callers don't need to
/// special-case AEAD when carving working keys.
pub struct StreamKeys<'a> {
    pub cipher_key: &'a [u8],
    pub mac_key: &'a [u8],
}

/// Ciphertext plus whatever authenticates it: the AEAD's native tag, or
/// a separately computed MAC tag over ciphertext ∥ length ∥ descriptor AAD.
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Seal `plaintext` under `cipher_cfg`/`auth_cfg`, binding `descriptor_aad`
/// (the serialized descriptor with its own `authentication_tag` field
/// elided, per §4.4) into the authentication.
pub fn seal(
    cipher_cfg: &CipherConfig,
    auth_cfg: &AuthConfig,
    keys: StreamKeys<'_>,
    plaintext: &[u8],
    descriptor_aad: &[u8],
) -> Result<Sealed> {
    let cap = cipher_cfg.capability()?;
    match cap.kind {
        CipherKind::Aead => {
            let aad = commitment_aad(plaintext.len(), descriptor_aad);
            let mut ct_and_tag = cipher::process_encrypt(cipher_cfg, keys.cipher_key, plaintext, &aad)?;
            let tag_len = (cap.aead_mac_size_bits / 8).max(16);
            if ct_and_tag.len() < tag_len {
                return Err(ObscurCoreError::ConfigurationInvalid("AEAD output shorter than its own tag".into()));
            }
            let tag = ct_and_tag.split_off(ct_and_tag.len() - tag_len);
            Ok(Sealed { ciphertext: ct_and_tag, tag })
        }
        CipherKind::Block | CipherKind::Stream => {
            let ciphertext = cipher::process_encrypt(cipher_cfg, keys.cipher_key, plaintext, &[])?;
            let mac_input = mac_input(&ciphertext, descriptor_aad);
            let tag = mac::compute(auth_cfg, keys.mac_key, &mac_input)?;
            Ok(Sealed { ciphertext, tag })
        }
    }
}

/// Open a `Sealed` value, verifying before returning any plaintext (§4.4:
/// "mismatch fails ... before any plaintext is released downstream").
pub fn open(
    cipher_cfg: &CipherConfig,
    auth_cfg: &AuthConfig,
    keys: StreamKeys<'_>,
    ciphertext: &[u8],
    tag: &[u8],
    descriptor_aad: &[u8],
) -> Result<Vec<u8>> {
    let cap = cipher_cfg.capability()?;
    match cap.kind {
        CipherKind::Aead => {
            let mut ct_and_tag = Vec::with_capacity(ciphertext.len() + tag.len());
            ct_and_tag.extend_from_slice(ciphertext);
            ct_and_tag.extend_from_slice(tag);
            // length commitment is folded into native AAD; the plaintext
            // length is only known after a successful decrypt, so we bind
            // the declared ciphertext length instead (equivalent: AEAD
            // ciphertext length == plaintext length for the kinds we support).
            let aad = commitment_aad(ciphertext.len(), descriptor_aad);
            cipher::process_decrypt(cipher_cfg, keys.cipher_key, &ct_and_tag, &aad)
        }
        CipherKind::Block | CipherKind::Stream => {
            let mac_input = mac_input(ciphertext, descriptor_aad);
            if !mac::verify(auth_cfg, keys.mac_key, &mac_input, tag)? {
                return Err(ObscurCoreError::AuthenticationFailed);
            }
            cipher::process_decrypt(cipher_cfg, keys.cipher_key, ciphertext, &[])
        }
    }
}

/// Builds the MAC input for non-AEAD kinds: ciphertext ∥ LE32(len) ∥ AAD,
/// per §4.4 items 1–3.
fn mac_input(ciphertext: &[u8], descriptor_aad: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ciphertext.len() + 4 + descriptor_aad.len());
    buf.extend_from_slice(ciphertext);
    buf.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    buf.extend_from_slice(descriptor_aad);
    buf
}

/// For AEAD kinds, §4.4 folds the length commitment and descriptor AAD
/// directly into the native AAD input rather than a separate MAC.
fn commitment_aad(len: usize, descriptor_aad: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + descriptor_aad.len());
    buf.extend_from_slice(&(len as u32).to_le_bytes());
    buf.extend_from_slice(descriptor_aad);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BlockMode, Padding};

    fn aes_gcm_cfg() -> CipherConfig {
        CipherConfig {
            algorithm: "AES256-GCM".into(),
            key_size_bits: 256,
            mode: None,
            padding: None,
            iv: alloc::vec![7u8; 12],
            associated_data: Vec::new(),
        }
    }

    fn aes_ctr_cfg() -> CipherConfig {
        CipherConfig {
            algorithm: "AES256-CTR".into(),
            key_size_bits: 256,
            mode: Some(BlockMode::Ctr),
            padding: Some(Padding::None),
            iv: alloc::vec![9u8; 16],
            associated_data: Vec::new(),
        }
    }

    fn hmac_cfg() -> AuthConfig {
        AuthConfig {
            kind: mac::AuthKind::Mac,
            function_name: "HMAC-SHA256".into(),
            nonce: None,
            salt: Vec::new(),
            additional_data: Vec::new(),
        }
    }

    #[test]
    fn aead_roundtrip() {
        let cipher_cfg = aes_gcm_cfg();
        let auth_cfg = hmac_cfg(); // unused for AEAD
        let key = [5u8; 32];
        let keys = StreamKeys { cipher_key: &key, mac_key: &[] };
        let sealed = seal(&cipher_cfg, &auth_cfg, keys, b"hello aead", b"descriptor").unwrap();
        let keys2 = StreamKeys { cipher_key: &key, mac_key: &[] };
        let opened = open(&cipher_cfg, &auth_cfg, keys2, &sealed.ciphertext, &sealed.tag, b"descriptor").unwrap();
        assert_eq!(opened, b"hello aead");
    }

    #[test]
    fn aead_tamper_fails() {
        let cipher_cfg = aes_gcm_cfg();
        let auth_cfg = hmac_cfg();
        let key = [5u8; 32];
        let keys = StreamKeys { cipher_key: &key, mac_key: &[] };
        let mut sealed = seal(&cipher_cfg, &auth_cfg, keys, b"hello aead", b"descriptor").unwrap();
        sealed.ciphertext[0] ^= 1;
        let keys2 = StreamKeys { cipher_key: &key, mac_key: &[] };
        let err = open(&cipher_cfg, &auth_cfg, keys2, &sealed.ciphertext, &sealed.tag, b"descriptor").unwrap_err();
        assert_eq!(err, ObscurCoreError::AuthenticationFailed);
    }

    #[test]
    fn block_cipher_etm_roundtrip() {
        let cipher_cfg = aes_ctr_cfg();
        let auth_cfg = hmac_cfg();
        let cipher_key = [1u8; 32];
        let mac_key = [2u8; 32];
        let keys = StreamKeys { cipher_key: &cipher_key, mac_key: &mac_key };
        let sealed = seal(&cipher_cfg, &auth_cfg, keys, b"block cipher etm", b"aad").unwrap();
        let keys2 = StreamKeys { cipher_key: &cipher_key, mac_key: &mac_key };
        let opened = open(&cipher_cfg, &auth_cfg, keys2, &sealed.ciphertext, &sealed.tag, b"aad").unwrap();
        assert_eq!(opened, b"block cipher etm");
    }

    #[test]
    fn block_cipher_wrong_aad_fails() {
        let cipher_cfg = aes_ctr_cfg();
        let auth_cfg = hmac_cfg();
        let cipher_key = [1u8; 32];
        let mac_key = [2u8; 32];
        let keys = StreamKeys { cipher_key: &cipher_key, mac_key: &mac_key };
        let sealed = seal(&cipher_cfg, &auth_cfg, keys, b"data", b"aad-good").unwrap();
        let keys2 = StreamKeys { cipher_key: &cipher_key, mac_key: &mac_key };
        let err = open(&cipher_cfg, &auth_cfg, keys2, &sealed.ciphertext, &sealed.tag, b"aad-bad").unwrap_err();
        assert_eq!(err, ObscurCoreError::AuthenticationFailed);
    }
}
