//! Primitive registry ("Athena"): the static capability table (C2).
//!
//! Every cipher/MAC/KDF the core can select is named by a short string
//! and validated against allowable key/block/MAC sizes here, in the same
//! spirit as the teacher's hard-coded size constants in `wire.rs` —
//! generalized from one fixed suite to a lookup table of named suites.

extern crate alloc;

use alloc::string::{String, ToString};

use crate::error::{ObscurCoreError, Result};

/// Cipher family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    Block,
    Stream,
    Aead,
}

/// Block cipher mode (only meaningful for `CipherKind::Block`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Cbc,
    Ctr,
    Ecb,
}

/// Block cipher padding (only meaningful for `CipherKind::Block`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    None,
    Pkcs7,
}

/// A registry entry describing one named cipher algorithm.
#[derive(Debug, Clone, Copy)]
pub struct CipherCapability {
    pub name: &'static str,
    pub kind: CipherKind,
    pub key_sizes_bits: &'static [usize],
    pub block_size_bits: usize,
    pub nonce_size_bytes: usize,
    pub aead_mac_size_bits: usize,
}

/// A registry entry describing one named MAC/auth function.
#[derive(Debug, Clone, Copy)]
pub struct AuthCapability {
    pub name: &'static str,
    pub output_sizes_bits: &'static [usize],
    pub key_size_bits: usize,
}

/// A registry entry describing one named KDF.
#[derive(Debug, Clone, Copy)]
pub struct KdfCapability {
    pub name: &'static str,
}

pub const AES256_CBC: CipherCapability = CipherCapability {
    name: "AES256-CBC",
    kind: CipherKind::Block,
    key_sizes_bits: &[256],
    block_size_bits: 128,
    nonce_size_bytes: 16,
    aead_mac_size_bits: 0,
};

pub const AES256_CTR: CipherCapability = CipherCapability {
    name: "AES256-CTR",
    kind: CipherKind::Block,
    key_sizes_bits: &[256],
    block_size_bits: 128,
    nonce_size_bytes: 16,
    aead_mac_size_bits: 0,
};

pub const AES256_GCM: CipherCapability = CipherCapability {
    name: "AES256-GCM",
    kind: CipherKind::Aead,
    key_sizes_bits: &[256],
    block_size_bits: 128,
    nonce_size_bytes: 12,
    aead_mac_size_bits: 128,
};

pub const AES256_EAX: CipherCapability = CipherCapability {
    name: "AES256-EAX",
    kind: CipherKind::Aead,
    key_sizes_bits: &[256],
    block_size_bits: 128,
    nonce_size_bytes: 16,
    aead_mac_size_bits: 128,
};

pub const CHACHA20_POLY1305: CipherCapability = CipherCapability {
    name: "ChaCha20-Poly1305",
    kind: CipherKind::Aead,
    key_sizes_bits: &[256],
    block_size_bits: 0,
    nonce_size_bytes: 12,
    aead_mac_size_bits: 128,
};

pub const SALSA20: CipherCapability = CipherCapability {
    name: "Salsa20",
    kind: CipherKind::Stream,
    key_sizes_bits: &[256],
    block_size_bits: 0,
    nonce_size_bytes: 8,
    aead_mac_size_bits: 0,
};

/// Named but currently unimplemented (no maintained capability crate).
/// Kept in the registry so wire bytes naming it round-trip through
/// `CipherConfig`, but `for_name` rejects it with `ConfigurationInvalid`
/// rather than silently substituting another cipher.
pub const SOSEMANUK: CipherCapability = CipherCapability {
    name: "Sosemanuk",
    kind: CipherKind::Stream,
    key_sizes_bits: &[256],
    block_size_bits: 0,
    nonce_size_bytes: 16,
    aead_mac_size_bits: 0,
};

pub const HMAC_SHA256: AuthCapability = AuthCapability {
    name: "HMAC-SHA256",
    output_sizes_bits: &[256],
    key_size_bits: 256,
};

pub const HMAC_SHA3_256: AuthCapability = AuthCapability {
    name: "HMAC-SHA3-256",
    output_sizes_bits: &[256],
    key_size_bits: 256,
};

pub const POLY1305: AuthCapability = AuthCapability {
    name: "Poly1305",
    output_sizes_bits: &[128],
    key_size_bits: 256,
};

pub const SCRYPT: KdfCapability = KdfCapability { name: "scrypt" };
pub const PBKDF2_HMAC_SHA256: KdfCapability = KdfCapability { name: "PBKDF2-HMAC-SHA256" };

const ALL_CIPHERS: &[CipherCapability] = &[
    AES256_CBC,
    AES256_CTR,
    AES256_GCM,
    AES256_EAX,
    CHACHA20_POLY1305,
    SALSA20,
    SOSEMANUK,
];

const ALL_AUTH: &[AuthCapability] = &[HMAC_SHA256, HMAC_SHA3_256, POLY1305];

const ALL_KDF: &[KdfCapability] = &[SCRYPT, PBKDF2_HMAC_SHA256];

/// Look up a cipher capability by registry name.
pub fn cipher_by_name(name: &str) -> Result<CipherCapability> {
    ALL_CIPHERS
        .iter()
        .copied()
        .find(|c| c.name == name)
        .ok_or_else(|| ObscurCoreError::ConfigurationInvalid(format_cipher(name)))
}

/// Look up an auth capability by registry name.
pub fn auth_by_name(name: &str) -> Result<AuthCapability> {
    ALL_AUTH
        .iter()
        .copied()
        .find(|a| a.name == name)
        .ok_or_else(|| ObscurCoreError::ConfigurationInvalid(format_auth(name)))
}

/// Look up a KDF capability by registry name.
pub fn kdf_by_name(name: &str) -> Result<KdfCapability> {
    ALL_KDF
        .iter()
        .copied()
        .find(|k| k.name == name)
        .ok_or_else(|| ObscurCoreError::ConfigurationInvalid(format_kdf(name)))
}

fn format_cipher(name: &str) -> String {
    let mut s = "unknown cipher: ".to_string();
    s.push_str(name);
    s
}

fn format_auth(name: &str) -> String {
    let mut s = "unknown auth function: ".to_string();
    s.push_str(name);
    s
}

fn format_kdf(name: &str) -> String {
    let mut s = "unknown kdf: ".to_string();
    s.push_str(name);
    s
}

/// Validate a key size against a cipher capability's allowable set.
pub fn check_key_size(cap: CipherCapability, bits: usize) -> Result<()> {
    if cap.key_sizes_bits.contains(&bits) {
        Ok(())
    } else {
        Err(ObscurCoreError::KeySizeInvalid {
            algorithm: cap.name.to_string(),
            got_bits: bits,
        })
    }
}

/// Validate a block size against a cipher capability's fixed block size.
pub fn check_block_size(cap: CipherCapability, bits: usize) -> Result<()> {
    if cap.block_size_bits == bits {
        Ok(())
    } else {
        Err(ObscurCoreError::BlockSizeInvalid {
            algorithm: cap.name.to_string(),
            got_bits: bits,
        })
    }
}

/// Validate a MAC output size against an auth capability's allowable set.
pub fn check_mac_size(cap: AuthCapability, bits: usize) -> Result<()> {
    if cap.output_sizes_bits.contains(&bits) {
        Ok(())
    } else {
        Err(ObscurCoreError::MacSizeInvalid {
            algorithm: cap.name.to_string(),
            got_bits: bits,
        })
    }
}

/// A mode requiring padding (CBC, ECB) forbids `Padding::None`.
pub fn check_mode_padding(mode: BlockMode, padding: Padding) -> Result<()> {
    match (mode, padding) {
        (BlockMode::Cbc, Padding::None) | (BlockMode::Ecb, Padding::None) => {
            Err(ObscurCoreError::ConfigurationInvalid(
                "CBC/ECB require padding".to_string(),
            ))
        }
        _ => Ok(()),
    }
}
