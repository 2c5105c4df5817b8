//! Key derivation (C3): stretch a pre-key into a working key pair.
//!
//! Grounded on the teacher's `kdf.rs` (HKDF wrapper returning a fixed-size
//! array, errors mapped to a single crate error type) but generalized from
//! one fixed HKDF call to the registry-selected scrypt/PBKDF2 functions
//! the spec requires, plus the cipher/mac key carve from §4.2.

extern crate alloc;
use alloc::vec::Vec;

use hmac::Hmac;
use pbkdf2::pbkdf2;
use scrypt::{scrypt, Params as ScryptParams};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{ObscurCoreError, Result};

/// scrypt cost parameters. `n` must be a power of two `>= 1024`.
#[derive(Debug, Clone, Copy)]
pub struct ScryptConfig {
    pub n: u64,
    pub r: u32,
    pub p: u32,
}

impl ScryptConfig {
    /// Manifest-key default for a low-entropy (user-typed) pre-key.
    pub const MANIFEST_LOW_ENTROPY: Self = Self { n: 1 << 16, r: 16, p: 2 };
    /// Manifest-key default for a high-entropy (UM1-derived) pre-key.
    pub const MANIFEST_HIGH_ENTROPY: Self = Self { n: 1 << 10, r: 8, p: 2 };
    /// Payload-item default for a low-entropy pre-key.
    pub const ITEM_LOW_ENTROPY: Self = Self { n: 1 << 14, r: 8, p: 1 };
    /// Payload-item default for a high-entropy pre-key.
    pub const ITEM_HIGH_ENTROPY: Self = Self { n: 1 << 10, r: 8, p: 1 };

    fn validate(self) -> Result<()> {
        if self.n < 1024 || !self.n.is_power_of_two() {
            return Err(ObscurCoreError::KdfParameterInvalid(
                "scrypt N must be a power of two >= 1024".into(),
            ));
        }
        if self.r == 0 || self.p == 0 {
            return Err(ObscurCoreError::KdfParameterInvalid(
                "scrypt r and p must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

/// PBKDF2-HMAC-SHA256 cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct Pbkdf2Config {
    pub iterations: u32,
}

impl Pbkdf2Config {
    fn validate(self) -> Result<()> {
        if self.iterations == 0 {
            return Err(ObscurCoreError::KdfParameterInvalid(
                "PBKDF2 iterations must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

/// The KDF a `KDFConfig` selects (§3).
#[derive(Debug, Clone, Copy)]
pub enum KdfParams {
    Scrypt(ScryptConfig),
    Pbkdf2(Pbkdf2Config),
}

/// Maximum output scrypt/PBKDF2 may be asked to produce in one call.
/// Generous enough for any realistic cipher+mac key pair; a request past
/// this is almost certainly a misconfigured `CipherConfig`/`AuthConfig`.
pub const MAX_KDF_OUTPUT_BYTES: usize = 4096;

/// `derive(pre_key, salt, out_len, params) -> out[out_len]` (§4.2).
pub fn derive(pre_key: &[u8], salt: &[u8], out_len: usize, params: KdfParams) -> Result<Vec<u8>> {
    if out_len > MAX_KDF_OUTPUT_BYTES {
        return Err(ObscurCoreError::KdfOutputTooLong {
            requested: out_len,
            max: MAX_KDF_OUTPUT_BYTES,
        });
    }

    let mut out = alloc::vec![0u8; out_len];

    match params {
        KdfParams::Scrypt(cfg) => {
            cfg.validate()?;
            let log_n = cfg.n.trailing_zeros() as u8;
            let scrypt_params = ScryptParams::new(log_n, cfg.r, cfg.p, out_len)
                .map_err(|_| ObscurCoreError::KdfParameterInvalid("scrypt parameters rejected".into()))?;
            scrypt(pre_key, salt, &scrypt_params, &mut out)
                .map_err(|_| ObscurCoreError::KdfParameterInvalid("scrypt derivation failed".into()))?;
        }
        KdfParams::Pbkdf2(cfg) => {
            cfg.validate()?;
            pbkdf2::<Hmac<Sha256>>(pre_key, salt, cfg.iterations, &mut out)
                .map_err(|_| ObscurCoreError::KdfParameterInvalid("PBKDF2 derivation failed".into()))?;
        }
    }

    Ok(out)
}

/// Wire-stable restatement of `KdfParams` (§3 `KDFConfig`) used by both
/// the manifest envelope (C9) and payload items (C7) to describe which
/// KDF produced a working key pair, without threading the `scrypt`/
/// `pbkdf2` crates' own parameter types onto the wire.
#[derive(Debug, Clone, Copy)]
pub enum WireKdfParams {
    Scrypt { n: u64, r: u32, p: u32 },
    Pbkdf2 { iterations: u32 },
}

impl From<WireKdfParams> for KdfParams {
    fn from(p: WireKdfParams) -> Self {
        match p {
            WireKdfParams::Scrypt { n, r, p } => KdfParams::Scrypt(ScryptConfig { n, r, p }),
            WireKdfParams::Pbkdf2 { iterations } => KdfParams::Pbkdf2(Pbkdf2Config { iterations }),
        }
    }
}

/// Working key pair carved from one KDF output (§3, §4.2).
pub struct WorkingKeyPair {
    pub cipher_key: Vec<u8>,
    pub mac_key: Vec<u8>,
}

impl Drop for WorkingKeyPair {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.mac_key.zeroize();
    }
}

/// Derive and carve `(cipher_key, mac_key)` from a pre-key in one step.
/// The pre-key is not consumed here (callers are responsible for zeroing
/// their own copy once all derivations using it are complete); the raw
/// concatenated KDF output is zeroized before returning.
pub fn derive_working_keys(
    pre_key: &[u8],
    salt: &[u8],
    cipher_key_len: usize,
    mac_key_len: usize,
    params: KdfParams,
) -> Result<WorkingKeyPair> {
    let mut combined = derive(pre_key, salt, cipher_key_len + mac_key_len, params)?;
    let cipher_key = combined[..cipher_key_len].to_vec();
    let mac_key = combined[cipher_key_len..cipher_key_len + mac_key_len].to_vec();
    combined.zeroize();
    Ok(WorkingKeyPair { cipher_key, mac_key })
}
