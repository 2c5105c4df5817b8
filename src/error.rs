//! Unified error taxonomy for the package pipeline.
//!
//! Mirrors the manual `Display` + `std::error::Error` style used by
//! `citadel-keystore`'s `KeystoreError` rather than a derive-macro crate:
//! every variant names the failing invariant, not the call site.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Every way the package pipeline can fail.
///
/// Cryptographic verification failures (`AuthenticationFailed`,
/// `KeyConfirmationFailed`) never carry the attempted plaintext or key
/// material — only enough context to diagnose at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObscurCoreError {
    /// Unknown algorithm, missing required field, or disallowed combination.
    ConfigurationInvalid(String),
    /// Key size not in the registry's allowable set for the named algorithm.
    KeySizeInvalid { algorithm: String, got_bits: usize },
    /// Block size not in the registry's allowable set for the named algorithm.
    BlockSizeInvalid { algorithm: String, got_bits: usize },
    /// MAC output size not in the registry's allowable set.
    MacSizeInvalid { algorithm: String, got_bits: usize },
    /// scrypt/PBKDF2 parameters are out of range (e.g. N not a power of two).
    KdfParameterInvalid(String),
    /// Requested KDF output is longer than the function can safely produce.
    KdfOutputTooLong { requested: usize, max: usize },
    /// A payload item has neither an explicit key nor a `KeyDerivation`.
    KeyMaterialMissing { item: String },
    /// A payload item has no stream source/sink bound at transfer time.
    StreamBindingAbsent { item: String },
    /// MAC or AEAD tag mismatch. Fatal; no plaintext is released.
    AuthenticationFailed,
    /// Key-confirmation MAC did not match the stored expected output.
    KeyConfirmationFailed,
    /// Declared item or manifest length was not reached while reading.
    PayloadTruncated,
    /// Magic mismatch, length field out of range, or unparsable descriptor.
    FormatMalformed(String),
    /// Second call to the one-shot `PackageWriter::write`.
    AlreadyWritten,
    /// UM1 called with sender/receiver keys on different curves.
    CurveMismatch,
    /// One or more item-layer errors collected before any I/O began (§4.6, §4.10).
    Aggregate(Vec<ObscurCoreError>),
}

impl fmt::Display for ObscurCoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationInvalid(msg) => write!(f, "configuration invalid: {}", msg),
            Self::KeySizeInvalid { algorithm, got_bits } => {
                write!(f, "key size invalid for {}: {} bits", algorithm, got_bits)
            }
            Self::BlockSizeInvalid { algorithm, got_bits } => {
                write!(f, "block size invalid for {}: {} bits", algorithm, got_bits)
            }
            Self::MacSizeInvalid { algorithm, got_bits } => {
                write!(f, "mac size invalid for {}: {} bits", algorithm, got_bits)
            }
            Self::KdfParameterInvalid(msg) => write!(f, "kdf parameter invalid: {}", msg),
            Self::KdfOutputTooLong { requested, max } => {
                write!(f, "kdf output too long: requested {} > max {}", requested, max)
            }
            Self::KeyMaterialMissing { item } => write!(f, "key material missing for item {}", item),
            Self::StreamBindingAbsent { item } => write!(f, "stream binding absent for item {}", item),
            Self::AuthenticationFailed => write!(f, "authentication failed"),
            Self::KeyConfirmationFailed => write!(f, "key confirmation failed"),
            Self::PayloadTruncated => write!(f, "payload truncated"),
            Self::FormatMalformed(msg) => write!(f, "format malformed: {}", msg),
            Self::AlreadyWritten => write!(f, "package already written"),
            Self::CurveMismatch => write!(f, "curve mismatch"),
            Self::Aggregate(errs) => {
                write!(f, "{} item error(s): ", errs.len())?;
                for (i, e) in errs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ObscurCoreError {}

pub type Result<T> = core::result::Result<T, ObscurCoreError>;
