//! `[EXPANSION]` Caller-facing configuration (§3 `PackageConfig`).
//!
//! Mirrors the teacher's `Aad`/`Context` builder pattern in `sdk.rs`:
//! named constructors assemble a full, registry-valid set of
//! `CipherConfig`/`AuthConfig`/`KDFConfig` defaults plus a
//! `PayloadConfiguration` template, so callers rarely need to hand-build
//! registry entries themselves.

extern crate alloc;
use alloc::string::ToString;

use crate::cipher::CipherConfig;
use crate::kdf::{Pbkdf2Config, ScryptConfig};
use crate::mac::{AuthConfig, AuthKind};
use crate::multiplexer::LayoutScheme;
use crate::registry::{BlockMode, Padding};

/// Where C10 buffers the payload before the manifest's length is known
/// (§5 "Temporary storage").
#[derive(Debug, Clone)]
pub enum ScratchPolicy {
    InMemory,
    #[cfg(feature = "std")]
    TempFile(std::path::PathBuf),
}

impl Default for ScratchPolicy {
    fn default() -> Self {
        ScratchPolicy::InMemory
    }
}

/// Cipher/auth/KDF defaults plus layout scheme and scratch policy for one
/// package. `CipherConfig`/`AuthConfig` carry no IV/key yet — C10 fills
/// those in from the pre-key/CSPRNG at write time.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    pub cipher_algorithm: &'static str,
    pub cipher_mode: Option<BlockMode>,
    pub cipher_padding: Option<Padding>,
    pub auth_function: &'static str,
    pub scrypt_low_entropy: ScryptConfig,
    pub scrypt_high_entropy: ScryptConfig,
    pub layout: LayoutScheme,
    pub scratch: ScratchPolicy,
    pub use_key_confirmation: bool,
}

impl PackageConfig {
    /// AES-256-GCM + scrypt defaults, Simple layout: the common case.
    pub fn balanced() -> Self {
        Self {
            cipher_algorithm: "AES256-GCM",
            cipher_mode: None,
            cipher_padding: None,
            auth_function: "HMAC-SHA256",
            scrypt_low_entropy: ScryptConfig::MANIFEST_LOW_ENTROPY,
            scrypt_high_entropy: ScryptConfig::MANIFEST_HIGH_ENTROPY,
            layout: LayoutScheme::Simple,
            scratch: ScratchPolicy::InMemory,
            use_key_confirmation: true,
        }
    }

    /// Lower scrypt cost and a stream cipher, for tests and bulk
    /// transfer where the package is already on a trusted channel.
    pub fn fast() -> Self {
        Self {
            cipher_algorithm: "Salsa20",
            cipher_mode: None,
            cipher_padding: None,
            auth_function: "HMAC-SHA256",
            scrypt_low_entropy: ScryptConfig { n: 1 << 12, r: 8, p: 1 },
            scrypt_high_entropy: ScryptConfig { n: 1 << 10, r: 8, p: 1 },
            layout: LayoutScheme::Simple,
            scratch: ScratchPolicy::InMemory,
            use_key_confirmation: false,
        }
    }

    /// Highest scrypt cost and Fabric interleaving, for long-lived
    /// archives where boundary obfuscation matters more than CPU time.
    pub fn paranoid() -> Self {
        Self {
            cipher_algorithm: "AES256-GCM",
            cipher_mode: None,
            cipher_padding: None,
            auth_function: "HMAC-SHA3-256",
            scrypt_low_entropy: ScryptConfig { n: 1 << 18, r: 16, p: 2 },
            scrypt_high_entropy: ScryptConfig { n: 1 << 12, r: 8, p: 2 },
            layout: LayoutScheme::Fabric { stripe_min: 64, stripe_max: 4096 },
            scratch: ScratchPolicy::InMemory,
            use_key_confirmation: true,
        }
    }

    pub(crate) fn manifest_cipher_config(&self, iv: alloc::vec::Vec<u8>) -> CipherConfig {
        CipherConfig {
            algorithm: self.cipher_algorithm.to_string(),
            key_size_bits: 256,
            mode: self.cipher_mode,
            padding: self.cipher_padding,
            iv,
            associated_data: alloc::vec::Vec::new(),
        }
    }

    pub(crate) fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            kind: AuthKind::Mac,
            function_name: self.auth_function.to_string(),
            nonce: None,
            salt: alloc::vec::Vec::new(),
            additional_data: alloc::vec::Vec::new(),
        }
    }

    pub(crate) fn pbkdf2_fallback(&self) -> Pbkdf2Config {
        Pbkdf2Config { iterations: 210_000 }
    }
}
