//! Symmetric cipher capability (§3 `CipherConfig`, §6 `Cipher`).
//!
//! A tagged sum over Block/Stream/AEAD backends — "polymorphism via
//! capability records" per the design notes, not a trait object. Each
//! concrete backend is a real `RustCrypto` crate, the same way the
//! teacher's `aead.rs` wraps `aes-gcm` directly instead of hiding it
//! behind a generic `Cipher` trait object.

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use aes::Aes256;
use aes_gcm::{aead::Aead, aead::KeyInit as AeadKeyInit, aead::Payload, Aes256Gcm, Nonce as GcmNonce};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use chacha20poly1305::{ChaCha20Poly1305, Nonce as ChaChaNonce};
use eax::Eax;
use salsa20::Salsa20;

use crate::error::{ObscurCoreError, Result};
use crate::registry::{self, BlockMode, CipherCapability, CipherKind, Padding};

/// Direction a block/stream cipher is initialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Fully describes one symmetric cipher instantiation (§3).
#[derive(Debug, Clone)]
pub struct CipherConfig {
    pub algorithm: String,
    pub key_size_bits: usize,
    pub mode: Option<BlockMode>,
    pub padding: Option<Padding>,
    pub iv: Vec<u8>,
    pub associated_data: Vec<u8>,
}

impl CipherConfig {
    pub fn capability(&self) -> Result<CipherCapability> {
        registry::cipher_by_name(&self.algorithm)
    }

    /// Validate the invariants listed in §3's `CipherConfig` entry.
    pub fn validate(&self) -> Result<()> {
        let cap = self.capability()?;
        registry::check_key_size(cap, self.key_size_bits)?;

        match cap.kind {
            CipherKind::Block => {
                let mode = self
                    .mode
                    .ok_or_else(|| ObscurCoreError::ConfigurationInvalid("block cipher requires a mode".to_string()))?;
                let padding = self.padding.ok_or_else(|| {
                    ObscurCoreError::ConfigurationInvalid("block cipher requires a padding choice".to_string())
                })?;
                registry::check_mode_padding(mode, padding)?;
                if self.iv.len() * 8 != cap.block_size_bits {
                    return Err(ObscurCoreError::BlockSizeInvalid {
                        algorithm: cap.name.to_string(),
                        got_bits: self.iv.len() * 8,
                    });
                }
            }
            CipherKind::Stream => {
                if self.iv.len() != cap.nonce_size_bytes {
                    return Err(ObscurCoreError::ConfigurationInvalid(
                        "stream cipher IV length must equal registry nonce size".to_string(),
                    ));
                }
                if self.padding.is_some() {
                    return Err(ObscurCoreError::ConfigurationInvalid(
                        "stream ciphers carry no padding".to_string(),
                    ));
                }
            }
            CipherKind::Aead => {
                if self.iv.len() != cap.nonce_size_bytes {
                    return Err(ObscurCoreError::ConfigurationInvalid(
                        "AEAD IV length must equal registry nonce size".to_string(),
                    ));
                }
                if self.padding.is_some() {
                    return Err(ObscurCoreError::ConfigurationInvalid(
                        "AEAD configs carry no separate padding".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Reconstruct the `(mode, padding)` pair implied by an algorithm name,
/// for callers (manifest decode) that only have the algorithm name and
/// IV on the wire and must rebuild a validatable `CipherConfig`.
pub fn default_mode_padding(name: &str, kind: CipherKind) -> (Option<BlockMode>, Option<Padding>) {
    match kind {
        CipherKind::Stream | CipherKind::Aead => (None, None),
        CipherKind::Block => match name {
            "AES256-CBC" => (Some(BlockMode::Cbc), Some(Padding::Pkcs7)),
            _ => (Some(BlockMode::Ctr), Some(Padding::None)),
        },
    }
}

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CtrCipher = ctr::Ctr128BE<Aes256>;

/// Encrypt `plaintext` under `cfg`/`key`. For AEAD kinds, returns
/// ciphertext with the native tag appended; §4.4's MAC-as-AAD step is
/// layered on top by `cipher_stream`, not here.
pub fn process_encrypt(cfg: &CipherConfig, key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    cfg.validate()?;
    let cap = cfg.capability()?;

    match cap.name {
        "AES256-CBC" => {
            let iv: [u8; 16] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let enc = Aes256CbcEnc::new(&key.into(), &iv.into());
            Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
        }
        "AES256-CTR" => {
            let iv: [u8; 16] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let mut cipher = Aes256CtrCipher::new(&key.into(), &iv.into());
            let mut out = plaintext.to_vec();
            cipher.apply_keystream(&mut out);
            Ok(out)
        }
        "AES256-GCM" => {
            let nonce: [u8; 12] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| bad_key_err())?;
            cipher
                .encrypt(GcmNonce::from_slice(&nonce), Payload { msg: plaintext, aad })
                .map_err(|_| ObscurCoreError::ConfigurationInvalid("AEAD seal failed".to_string()))
        }
        "AES256-EAX" => eax_encrypt(key, &cfg.iv, plaintext, aad),
        "ChaCha20-Poly1305" => {
            let nonce: [u8; 12] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| bad_key_err())?;
            cipher
                .encrypt(ChaChaNonce::from_slice(&nonce), Payload { msg: plaintext, aad })
                .map_err(|_| ObscurCoreError::ConfigurationInvalid("AEAD seal failed".to_string()))
        }
        "Salsa20" => {
            let nonce: [u8; 8] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let mut cipher = Salsa20::new_from_slices(&key, &nonce).map_err(|_| bad_key_err())?;
            let mut out = plaintext.to_vec();
            cipher.apply_keystream(&mut out);
            Ok(out)
        }
        "Sosemanuk" => Err(ObscurCoreError::ConfigurationInvalid(
            "Sosemanuk has no bound capability in this build".to_string(),
        )),
        other => Err(ObscurCoreError::ConfigurationInvalid(format_unhandled(other))),
    }
}

/// Decrypt `ciphertext` under `cfg`/`key`. AEAD kinds expect the native
/// tag appended (as produced by `process_encrypt`) and verify it here.
pub fn process_decrypt(cfg: &CipherConfig, key: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    cfg.validate()?;
    let cap = cfg.capability()?;

    match cap.name {
        "AES256-CBC" => {
            let iv: [u8; 16] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let dec = Aes256CbcDec::new(&key.into(), &iv.into());
            dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| ObscurCoreError::AuthenticationFailed)
        }
        "AES256-CTR" => {
            let iv: [u8; 16] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let mut cipher = Aes256CtrCipher::new(&key.into(), &iv.into());
            let mut out = ciphertext.to_vec();
            cipher.apply_keystream(&mut out);
            Ok(out)
        }
        "AES256-GCM" => {
            let nonce: [u8; 12] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| bad_key_err())?;
            cipher
                .decrypt(GcmNonce::from_slice(&nonce), Payload { msg: ciphertext, aad })
                .map_err(|_| ObscurCoreError::AuthenticationFailed)
        }
        "AES256-EAX" => eax_decrypt(key, &cfg.iv, ciphertext, aad),
        "ChaCha20-Poly1305" => {
            let nonce: [u8; 12] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| bad_key_err())?;
            cipher
                .decrypt(ChaChaNonce::from_slice(&nonce), Payload { msg: ciphertext, aad })
                .map_err(|_| ObscurCoreError::AuthenticationFailed)
        }
        "Salsa20" => {
            let nonce: [u8; 8] = cfg.iv.as_slice().try_into().map_err(bad_iv)?;
            let key: [u8; 32] = key.try_into().map_err(bad_key)?;
            let mut cipher = Salsa20::new_from_slices(&key, &nonce).map_err(|_| bad_key_err())?;
            let mut out = ciphertext.to_vec();
            cipher.apply_keystream(&mut out);
            Ok(out)
        }
        "Sosemanuk" => Err(ObscurCoreError::ConfigurationInvalid(
            "Sosemanuk has no bound capability in this build".to_string(),
        )),
        other => Err(ObscurCoreError::ConfigurationInvalid(format_unhandled(other))),
    }
}

fn eax_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let key: [u8; 32] = key.try_into().map_err(bad_key)?;
    let cipher = Eax::<Aes256>::new_from_slice(&key).map_err(|_| bad_key_err())?;
    cipher
        .encrypt(iv.into(), Payload { msg: plaintext, aad })
        .map_err(|_| ObscurCoreError::ConfigurationInvalid("AEAD seal failed".to_string()))
}

fn eax_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let key: [u8; 32] = key.try_into().map_err(bad_key)?;
    let cipher = Eax::<Aes256>::new_from_slice(&key).map_err(|_| bad_key_err())?;
    cipher
        .decrypt(iv.into(), Payload { msg: ciphertext, aad })
        .map_err(|_| ObscurCoreError::AuthenticationFailed)
}

fn bad_iv<E>(_: E) -> ObscurCoreError {
    ObscurCoreError::ConfigurationInvalid("IV/nonce has the wrong length".to_string())
}

fn bad_key<E>(_: E) -> ObscurCoreError {
    ObscurCoreError::ConfigurationInvalid("key has the wrong length".to_string())
}

fn bad_key_err() -> ObscurCoreError {
    ObscurCoreError::ConfigurationInvalid("key rejected by cipher backend".to_string())
}

fn format_unhandled(name: &str) -> String {
    let mut s = "registered but unhandled cipher: ".to_string();
    s.push_str(name);
    s
}
