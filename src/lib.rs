//! # ObscurCore
//!
//! Self-describing, authenticated, encrypted *packages*: one or more
//! arbitrary byte streams ("payload items") bundled behind a single
//! cryptographically protected manifest. Package bytes, together with
//! either a shared secret or a UM1 key pair, let a recipient recover and
//! verify every item.
//!
//! ## Quick start
//!
//! ```rust
//! use obscurcore::{PackageConfig, PackageReader, PackageWriter, PreKeySource, ReaderKeyInput};
//! use obscurcore::item::ItemType;
//!
//! let mut writer = PackageWriter::new(
//!     PackageConfig::fast(),
//!     PreKeySource::Symmetric(b"correct horse battery staple".to_vec()),
//! );
//! writer.add_item("greeting.txt", ItemType::Utf8, b"hello, package".to_vec());
//!
//! let mut out = Vec::new();
//! writer.write(&mut out).unwrap();
//!
//! let opened = PackageReader::read(
//!     &mut out.as_slice(),
//!     ReaderKeyInput::Symmetric(vec![b"correct horse battery staple".to_vec()]),
//! ).unwrap();
//! assert_eq!(opened[0].plaintext, b"hello, package");
//! ```
//!
//! ## Scope
//!
//! This crate is the package pipeline: the manifest crypto envelope
//! (symmetric-only and UM1-hybrid), the payload multiplexer (Simple /
//! Frameshift / Fabric layouts over a deterministic CSPRNG), and the
//! on-wire package format's parse/emit state machines. Concrete cipher,
//! MAC, hash, and KDF primitives are real `RustCrypto` crates, not
//! hand-rolled — see [`registry`] for the capability table.
//!
//! ## What's not provided
//!
//! Forward secrecy beyond UM1 (no session re-keying), zero-temporary-
//! storage streaming of unbounded payloads, steganographic
//! indistinguishability beyond padded-layout obfuscation, and recovery
//! from a corrupted manifest tag (detection only).

#![deny(unsafe_code)]

extern crate alloc;

pub mod cipher;
pub mod cipherstream;
pub mod confirmation;
pub mod config;
pub mod error;
pub mod item;
pub mod kdf;
pub mod mac;
pub mod manifest;
pub mod multiplexer;
pub mod package;
pub mod registry;
pub mod rng;
pub mod serial;
pub mod um1;

pub use config::{PackageConfig, ScratchPolicy};
pub use error::{ObscurCoreError, Result};
pub use item::ItemType;
pub use manifest::ManifestCryptoConfig;
pub use multiplexer::LayoutScheme;
pub use package::{OpenedItem, PackageReader, PackageWriter, PreKeySource, ReaderKeyInput};
pub use um1::EcDomain;

/// On-wire format version this build reads and writes (§3 `ManifestHeader`).
pub const FORMAT_VERSION: u32 = manifest::FORMAT_VERSION;
