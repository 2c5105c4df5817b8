//! Deterministic CSPRNG (C1): a Salsa20 keystream seeded once from OS entropy.
//!
//! The multiplexer (C8) and the writer/reader must derive byte-identical
//! decision sequences from the same `(key, nonce)` — this is the engine
//! that makes that true. Mirrors the teacher's approach of wrapping one
//! `RustCrypto` stream-cipher crate behind a tiny capability surface
//! (`aead.rs`'s `nonce()`/`aead_seal`/`aead_open` trio), generalized to an
//! open-ended keystream instead of a single AEAD call.

extern crate alloc;
use alloc::vec::Vec;

use cipher::{KeyIvInit, StreamCipher};
use salsa20::Salsa20;

use crate::error::{ObscurCoreError, Result};

pub const RNG_KEY_BYTES: usize = 32;
pub const RNG_NONCE_BYTES: usize = 8;

/// A deterministic byte stream, reproducible across platforms given the
/// same `(key, nonce)`. Not safe to share across threads (§5).
pub struct Csprng {
    cipher: Salsa20,
}

impl Csprng {
    /// Construct from an explicit key/nonce — used by both writer and
    /// reader so they derive the same multiplexer decisions.
    pub fn from_key_nonce(key: &[u8; RNG_KEY_BYTES], nonce: &[u8; RNG_NONCE_BYTES]) -> Result<Self> {
        let cipher = Salsa20::new_from_slices(key, nonce)
            .map_err(|_| ObscurCoreError::ConfigurationInvalid("invalid salsa20 key/nonce".into()))?;
        Ok(Self { cipher })
    }

    /// Construct a fresh instance keyed from the OS entropy source (C1).
    /// Returns the `(key, nonce)` alongside so the caller can persist it
    /// in the `PayloadConfiguration` for the reader to reconstruct.
    pub fn seeded() -> Result<(Self, [u8; RNG_KEY_BYTES], [u8; RNG_NONCE_BYTES])> {
        let mut key = [0u8; RNG_KEY_BYTES];
        let mut nonce = [0u8; RNG_NONCE_BYTES];
        getrandom::getrandom(&mut key)
            .map_err(|_| ObscurCoreError::ConfigurationInvalid("entropy source unavailable".into()))?;
        getrandom::getrandom(&mut nonce)
            .map_err(|_| ObscurCoreError::ConfigurationInvalid("entropy source unavailable".into()))?;
        let rng = Self::from_key_nonce(&key, &nonce)?;
        Ok((rng, key, nonce))
    }

    /// Fill `buf` with the next bytes of keystream.
    pub fn next_bytes(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = 0;
        }
        self.cipher.apply_keystream(buf);
    }

    /// Next 4 bytes of keystream, consumed little-endian.
    pub fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.next_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    /// Uniform integer in `[lo, hi]` inclusive, via rejection sampling
    /// over `next_u32` to avoid modulo bias.
    pub fn next_range_u32(&mut self, lo: u32, hi: u32) -> u32 {
        debug_assert!(lo <= hi);
        let span = u64::from(hi) - u64::from(lo) + 1;
        if span == 0 || span > u64::from(u32::MAX) {
            return lo;
        }
        let span = span as u32;
        let zone = u32::MAX - (u32::MAX % span);
        loop {
            let v = self.next_u32();
            if v < zone {
                return lo + (v % span);
            }
        }
    }

    /// Draw `len` fresh padding bytes (Frameshift inter-item fill).
    pub fn next_padding(&mut self, len: usize) -> Vec<u8> {
        let mut buf = alloc::vec![0u8; len];
        self.next_bytes(&mut buf);
        buf
    }
}
