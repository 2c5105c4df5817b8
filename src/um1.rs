//! UM1 key agreement (C6): one-pass Unified Model over a named curve.
//!
//! Two `EcDomain` capabilities ship, never interchangeable (§4.5,
//! `[EXPANSION]`): NIST P-256 via the `p256`/`elliptic-curve` crates and
//! X25519 via `x25519-dalek`, both already in the teacher's dependency
//! table for its own hybrid-KEM envelope.

extern crate alloc;
use alloc::vec::Vec;

use elliptic_curve::ecdh::diffie_hellman as p256_dh;
use elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey as P256Public, SecretKey as P256Secret};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret as X25519Secret};

use crate::error::{ObscurCoreError, Result};

/// Named curve a UM1 key pair lives on. Curve25519 is "a separate,
/// incompatible family" from NIST/Brainpool per §4.5 — there is no
/// conversion between the two variants below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcDomain {
    P256,
    X25519,
}

/// A generated key pair, tagged by domain so `initiate`/`respond` can
/// reject cross-domain calls with `CurveMismatch` instead of silently
/// producing garbage shared secrets.
pub enum KeyPair {
    P256 { secret: P256Secret, public: P256Public },
    X25519 { secret: X25519Secret, public: X25519Public },
}

impl KeyPair {
    pub fn domain(&self) -> EcDomain {
        match self {
            KeyPair::P256 { .. } => EcDomain::P256,
            KeyPair::X25519 { .. } => EcDomain::X25519,
        }
    }

    pub fn public_bytes(&self) -> Vec<u8> {
        match self {
            KeyPair::P256 { public, .. } => public.to_encoded_point(true).as_bytes().to_vec(),
            KeyPair::X25519 { public, .. } => public.as_bytes().to_vec(),
        }
    }
}

/// `generate_keypair(domain)` (§6 `EcDomain`/`EcAgreement`).
pub fn generate_keypair(domain: EcDomain) -> KeyPair {
    match domain {
        EcDomain::P256 => {
            let secret = P256Secret::random(&mut OsRng);
            let public = secret.public_key();
            KeyPair::P256 { secret, public }
        }
        EcDomain::X25519 => {
            let secret = X25519Secret::random_from_rng(OsRng);
            let public = X25519Public::from(&secret);
            KeyPair::X25519 { secret, public }
        }
    }
}

/// Raw ECDH over `priv_kp` and a wire-encoded peer public key. Both
/// inputs must belong to `domain`; a peer key that merely fails to parse
/// on that domain's encoding is treated the same as a cross-domain call —
/// it could not have come from this domain's key generator.
fn agree_raw(domain: EcDomain, priv_kp: &KeyPair, peer_pub_bytes: &[u8]) -> Result<Vec<u8>> {
    if priv_kp.domain() != domain {
        return Err(ObscurCoreError::CurveMismatch);
    }
    match priv_kp {
        KeyPair::P256 { secret, .. } => {
            let other = P256Public::from_sec1_bytes(peer_pub_bytes).map_err(|_| ObscurCoreError::CurveMismatch)?;
            let shared = p256_dh(secret.to_nonzero_scalar(), other.as_affine());
            Ok(shared.raw_secret_bytes().to_vec())
        }
        KeyPair::X25519 { secret, .. } => {
            let arr: [u8; 32] = peer_pub_bytes.try_into().map_err(|_| ObscurCoreError::CurveMismatch)?;
            let other = X25519Public::from(arr);
            Ok(secret.diffie_hellman(&other).as_bytes().to_vec())
        }
    }
}

/// `Initiate(receiver_pub, sender_priv) -> (ephemeral_pub, shared_secret)`
/// (§4.5). `sender_priv` and `receiver_pub` must be on the same curve.
pub fn initiate(sender_priv: &KeyPair, receiver_pub_bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let domain = sender_priv.domain();
    let ephemeral = generate_keypair(domain);

    let dh1 = agree_raw(domain, sender_priv, receiver_pub_bytes)?;
    let dh2 = agree_raw(domain, &ephemeral, receiver_pub_bytes)?;

    let mut hasher = Sha256::new();
    hasher.update(&dh1);
    hasher.update(&dh2);
    let shared_secret = hasher.finalize().to_vec();

    Ok((ephemeral.public_bytes(), shared_secret))
}

/// `Respond(sender_pub, receiver_priv, ephemeral_pub) -> shared_secret`
/// (§4.5), the mirror computation of `initiate`.
pub fn respond(receiver_priv: &KeyPair, sender_pub_bytes: &[u8], ephemeral_pub_bytes: &[u8]) -> Result<Vec<u8>> {
    let domain = receiver_priv.domain();

    let dh1 = agree_raw(domain, receiver_priv, sender_pub_bytes)?;
    let dh2 = agree_raw(domain, receiver_priv, ephemeral_pub_bytes)?;

    let mut hasher = Sha256::new();
    hasher.update(&dh1);
    hasher.update(&dh2);
    Ok(hasher.finalize().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn um1_x25519_agrees() {
        let sender = generate_keypair(EcDomain::X25519);
        let receiver = generate_keypair(EcDomain::X25519);

        let (ephemeral_pub, shared_initiate) = initiate(&sender, &receiver.public_bytes()).unwrap();
        let shared_respond = respond(&receiver, &sender.public_bytes(), &ephemeral_pub).unwrap();

        assert_eq!(shared_initiate, shared_respond);
        assert_eq!(shared_initiate.len(), 32);
    }

    #[test]
    fn um1_p256_agrees() {
        let sender = generate_keypair(EcDomain::P256);
        let receiver = generate_keypair(EcDomain::P256);

        let (ephemeral_pub, shared_initiate) = initiate(&sender, &receiver.public_bytes()).unwrap();
        let shared_respond = respond(&receiver, &sender.public_bytes(), &ephemeral_pub).unwrap();

        assert_eq!(shared_initiate, shared_respond);
    }

    #[test]
    fn um1_cross_curve_mismatch() {
        let sender = generate_keypair(EcDomain::X25519);
        let receiver_p256_pub = generate_keypair(EcDomain::P256).public_bytes();

        let err = initiate(&sender, &receiver_p256_pub).unwrap_err();
        assert_eq!(err, ObscurCoreError::CurveMismatch);
    }
}
