//! Package writer/reader state machine (C10): orchestrates C1–C9 and
//! emits/parses the on-wire byte layout (§4.9, §6).

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use std::io::{Read, Write};
#[cfg(feature = "std")]
use std::io::Seek;

use zeroize::Zeroize;

use crate::cipherstream::{self, StreamKeys};
use crate::config::{PackageConfig, ScratchPolicy};
use crate::confirmation::{self, ConfirmationHash};
use crate::error::{ObscurCoreError, Result};
use crate::item::{ItemKeyMaterial, ItemType, PayloadItem, StreamBinding};
use crate::kdf::{self, KdfParams, ScryptConfig, WireKdfParams};
use crate::manifest::{self, KdfDescriptor, Manifest, ManifestCryptoConfig, ManifestHeader};
use crate::registry;
use crate::rng::Csprng;
use crate::um1::{self, EcDomain, KeyPair as Um1KeyPair};

/// Header and trailer magic (§6's wire diagram: `"OCPK"` both places).
pub const MAGIC: [u8; 4] = *b"OCPK";

/// Writer states (§4.9). `write` is permitted exactly once; a second
/// call fails with `AlreadyWritten` and touches the output stream not at
/// all (Scenario 3, §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    CryptoSet,
    Closed,
}

/// How the writer obtains the manifest pre-key (§3 `PreKey`, §4.5, §4.8).
pub enum PreKeySource<'k> {
    /// A user-typed ("low entropy") secret.
    Symmetric(Vec<u8>),
    /// UM1 key agreement: the sender's static key pair and the
    /// receiver's long-term public key bytes.
    Um1 { sender_priv: &'k Um1KeyPair, receiver_pub: Vec<u8> },
}

/// Builds one package. One `PackageWriter` maps to exactly one call to
/// `write` (§4.9's one-shot `Write()`).
pub struct PackageWriter<'a, 'k> {
    config: PackageConfig,
    pre_key_source: PreKeySource<'k>,
    items: Vec<PayloadItem<'a>>,
    state: WriterState,
}

impl<'a, 'k> PackageWriter<'a, 'k> {
    /// `Fresh -> CryptoSet` in one step: the pre-key source is required
    /// up front since every subsequent derivation depends on it.
    pub fn new(config: PackageConfig, pre_key_source: PreKeySource<'k>) -> Self {
        Self { config, pre_key_source, items: Vec::new(), state: WriterState::CryptoSet }
    }

    /// Stage one item whose working keys will be derived from the
    /// package pre-key at transfer time (the common case, §4.6).
    pub fn add_item(&mut self, path: impl Into<String>, item_type: ItemType, plaintext: Vec<u8>) {
        let cap = registry::cipher_by_name(self.config.cipher_algorithm)
            .expect("PackageConfig carries a registry-valid cipher algorithm");
        let mut salt = alloc::vec![0u8; cap.key_sizes_bits[0] / 8];
        let _ = getrandom::getrandom(&mut salt);
        let mut uuid = [0u8; 16];
        let _ = getrandom::getrandom(&mut uuid);
        // Each item needs its own IV/nonce, distinct from the manifest's
        // and from every other item's — reused with a derived key would
        // break the cipher's confidentiality guarantee.
        let mut item_iv = alloc::vec![0u8; registry_iv_len(cap)];
        let _ = getrandom::getrandom(&mut item_iv);

        let item = PayloadItem {
            uuid,
            item_type,
            path: path.into(),
            external_length: plaintext.len() as u64,
            internal_length: 0,
            format_name: None,
            format_data: Vec::new(),
            cipher: self.config.manifest_cipher_config(item_iv),
            authentication: self.config.auth_config(),
            authentication_tag: Vec::new(),
            key_material: ItemKeyMaterial::Derived(crate::item::ItemKeyDerivation {
                salt,
                params: scrypt_item_default(self.is_high_entropy()),
            }),
            binding: StreamBinding::Source(alloc::boxed::Box::new(move || Ok(plaintext))),
        };
        self.items.push(item);
    }

    fn is_high_entropy(&self) -> bool {
        matches!(self.pre_key_source, PreKeySource::Um1 { .. })
    }

    /// `Write()` (§4.9): `ItemsStaged -> PayloadBuffered -> ManifestEmitted
    /// -> TrailerWritten -> Closed`, or `AlreadyWritten` on a second call.
    pub fn write<W: Write>(mut self, out: &mut W) -> Result<()> {
        let span = tracing::info_span!("package_write", items = self.items.len());
        let _enter = span.enter();

        if self.state == WriterState::Closed {
            tracing::warn!("write called on an already-written PackageWriter");
            return Err(ObscurCoreError::AlreadyWritten);
        }
        if self.items.is_empty() {
            tracing::warn!("write called with no staged payload items");
            return Err(ObscurCoreError::ConfigurationInvalid("no payload items".into()));
        }

        let aggregate: Vec<ObscurCoreError> =
            self.items.iter().flat_map(|i| i.check_write_preconditions()).collect();
        if !aggregate.is_empty() {
            tracing::warn!(count = aggregate.len(), "item write preconditions failed");
            return Err(ObscurCoreError::Aggregate(aggregate));
        }

        let is_high_entropy = self.is_high_entropy();
        let (mut pre_key, ephemeral_public_key) = match &self.pre_key_source {
            PreKeySource::Symmetric(bytes) => (bytes.clone(), None),
            PreKeySource::Um1 { sender_priv, receiver_pub } => {
                let (ephemeral_pub, shared) = um1::initiate(sender_priv, receiver_pub)?;
                (shared, Some((sender_priv.domain(), ephemeral_pub)))
            }
        };

        let cipher_cap = registry::cipher_by_name(self.config.cipher_algorithm)?;
        let auth_cap = registry::auth_by_name(self.config.auth_function)?;
        let cipher_key_len = cipher_cap.key_sizes_bits[0] / 8;
        let mac_key_len = auth_cap.key_size_bits / 8;

        let mut manifest_salt = alloc::vec![0u8; cipher_key_len];
        getrandom::getrandom(&mut manifest_salt)
            .map_err(|_| ObscurCoreError::ConfigurationInvalid("entropy source unavailable".into()))?;

        let scrypt_cfg = if is_high_entropy { self.config.scrypt_high_entropy } else { self.config.scrypt_low_entropy };

        let key_confirmation = if self.config.use_key_confirmation {
            let mut confirm_salt = alloc::vec![0u8; 16];
            getrandom::getrandom(&mut confirm_salt)
                .map_err(|_| ObscurCoreError::ConfigurationInvalid("entropy source unavailable".into()))?;
            let hash = ConfirmationHash::Sha256;
            // §4.8: computed *before* derivation, from the pre-key directly.
            let output = confirmation::generate(&pre_key, &confirm_salt, hash)?;
            Some((confirm_salt, hash, output))
        } else {
            None
        };

        let mut iv = alloc::vec![0u8; registry_iv_len(cipher_cap)];
        getrandom::getrandom(&mut iv)
            .map_err(|_| ObscurCoreError::ConfigurationInvalid("entropy source unavailable".into()))?;

        let working = kdf::derive_working_keys(
            &pre_key,
            &manifest_salt,
            cipher_key_len,
            mac_key_len,
            KdfParams::Scrypt(scrypt_cfg),
        )?;

        let key_derivation = KdfDescriptor {
            salt: manifest_salt,
            params: WireKdfParams::Scrypt { n: scrypt_cfg.n, r: scrypt_cfg.r, p: scrypt_cfg.p },
        };
        let cipher_config = self.config.manifest_cipher_config(iv);
        let auth_config = self.config.auth_config();

        let mut crypto_config = match ephemeral_public_key {
            None => ManifestCryptoConfig::SymmetricOnly {
                cipher: cipher_config.clone(),
                authentication: auth_config.clone(),
                key_confirmation: key_confirmation.as_ref().map(|(s, h, _)| (s.clone(), *h)),
                key_confirmation_output: key_confirmation.as_ref().map(|(_, _, o)| o.clone()),
                key_derivation,
                authentication_tag: Vec::new(),
            },
            Some((ec_domain, ephemeral_pub)) => ManifestCryptoConfig::Um1Hybrid {
                cipher: cipher_config.clone(),
                authentication: auth_config.clone(),
                key_confirmation: key_confirmation.as_ref().map(|(s, h, _)| (s.clone(), *h)),
                key_confirmation_output: key_confirmation.as_ref().map(|(_, _, o)| o.clone()),
                key_derivation,
                authentication_tag: Vec::new(),
                ec_domain,
                ephemeral_public_key: ephemeral_pub,
            },
        };

        // Seal each item, recording internal_length/authentication_tag
        // back into the descriptor before the manifest is finalized (§4.6).
        let mut item_ciphertexts = Vec::with_capacity(self.items.len());
        for item in &mut self.items {
            let binding = core::mem::replace(&mut item.binding, StreamBinding::Unbound);
            let plaintext = match binding {
                StreamBinding::Source(f) => f()?,
                _ => return Err(ObscurCoreError::StreamBindingAbsent { item: item.path.clone() }),
            };

            let (item_cipher_key, item_mac_key) = resolve_item_keys_for_write(item, &pre_key)?;
            let sealed = cipherstream::seal(
                &item.cipher,
                &item.authentication,
                StreamKeys { cipher_key: &item_cipher_key, mac_key: &item_mac_key },
                &plaintext,
                &item.descriptor_aad(),
            )?;
            item.internal_length = sealed.ciphertext.len() as u64;
            item.authentication_tag = sealed.tag;
            item_ciphertexts.push(sealed.ciphertext);
        }
        tracing::debug!(count = item_ciphertexts.len(), "payload items sealed");

        let (mut csprng, prng_key, prng_nonce) = Csprng::seeded()?;
        let payload_config = manifest::PayloadConfiguration { scheme: self.config.layout, prng_key, prng_nonce };

        let items = core::mem::take(&mut self.items);
        let manifest = Manifest { items, payload_config };
        let manifest_bytes = manifest.encode();

        let descriptor_aad = crypto_config.encode(true);
        let sealed_manifest = manifest::seal_manifest(
            &cipher_config,
            &auth_config,
            &working.cipher_key,
            &working.mac_key,
            &manifest_bytes,
            &descriptor_aad,
        )?;
        crypto_config.set_authentication_tag(sealed_manifest.tag.clone());
        tracing::debug!("manifest sealed");

        let header = ManifestHeader { format_version: manifest::FORMAT_VERSION, crypto_config };
        let header_bytes = header.encode();

        let mut manifest_body = sealed_manifest.ciphertext;
        manifest_body.extend_from_slice(&sealed_manifest.tag);

        let mut obf_len = (manifest_body.len() as u32).to_le_bytes();
        for (b, k) in obf_len.iter_mut().zip(working.mac_key.iter()) {
            *b ^= k;
        }

        out.write_all(&MAGIC).map_err(io_err)?;
        out.write_all(&(header_bytes.len() as u32).to_le_bytes()).map_err(io_err)?;
        out.write_all(&header_bytes).map_err(io_err)?;
        out.write_all(&obf_len).map_err(io_err)?;
        out.write_all(&manifest_body).map_err(io_err)?;
        emit_payload(self.config.layout, &mut csprng, &item_ciphertexts, &self.config.scratch, out)?;
        out.write_all(&MAGIC).map_err(io_err)?;
        tracing::debug!("header and trailer written, package complete");

        pre_key.zeroize();
        self.state = WriterState::Closed;
        Ok(())
    }
}

/// Buffers the multiplexed payload through the configured scratch sink
/// before appending it to `out` (§5 "Temporary storage"): `InMemory`
/// writes straight through (the multiplexer already holds nothing but the
/// already-in-memory item ciphertexts), `TempFile` spills to a named
/// temporary file under the configured directory first, which keeps a
/// half-written package out of `out` until the whole payload has been
/// laid out successfully.
fn emit_payload<W: Write>(
    scheme: crate::multiplexer::LayoutScheme,
    csprng: &mut Csprng,
    items: &[Vec<u8>],
    scratch: &ScratchPolicy,
    out: &mut W,
) -> Result<()> {
    match scratch {
        ScratchPolicy::InMemory => crate::multiplexer::write_payload(scheme, csprng, items, out),
        #[cfg(feature = "std")]
        ScratchPolicy::TempFile(dir) => {
            let mut scratch_file = tempfile::NamedTempFile::new_in(dir)
                .map_err(|_| ObscurCoreError::ConfigurationInvalid("scratch temp file creation failed".into()))?;
            crate::multiplexer::write_payload(scheme, csprng, items, scratch_file.as_file_mut())?;
            scratch_file.as_file_mut().flush().map_err(io_err)?;
            scratch_file.as_file_mut().seek(std::io::SeekFrom::Start(0)).map_err(io_err)?;
            std::io::copy(scratch_file.as_file_mut(), out).map_err(io_err)?;
            Ok(())
        }
    }
}

fn scrypt_item_default(is_high_entropy: bool) -> WireKdfParams {
    let cfg: ScryptConfig = if is_high_entropy { ScryptConfig::ITEM_HIGH_ENTROPY } else { ScryptConfig::ITEM_LOW_ENTROPY };
    WireKdfParams::Scrypt { n: cfg.n, r: cfg.r, p: cfg.p }
}

fn registry_iv_len(cap: registry::CipherCapability) -> usize {
    match cap.kind {
        registry::CipherKind::Block => cap.block_size_bits / 8,
        registry::CipherKind::Stream | registry::CipherKind::Aead => cap.nonce_size_bytes,
    }
}

fn resolve_item_keys_for_write(item: &PayloadItem<'_>, pre_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    match &item.key_material {
        ItemKeyMaterial::Explicit { cipher_key, auth_key } => Ok((cipher_key.clone(), auth_key.clone())),
        ItemKeyMaterial::Derived(kd) => {
            let cipher_cap = registry::cipher_by_name(&item.cipher.algorithm)?;
            let auth_cap = registry::auth_by_name(&item.authentication.function_name)?;
            let working = kdf::derive_working_keys(
                pre_key,
                &kd.salt,
                cipher_cap.key_sizes_bits[0] / 8,
                auth_cap.key_size_bits / 8,
                kd.params.into(),
            )?;
            Ok((working.cipher_key.clone(), working.mac_key.clone()))
        }
    }
}

/// How the reader obtains the pre-key to open the manifest (§4.3, §4.5).
pub enum ReaderKeyInput<'k> {
    /// Candidate pre-keys to try; narrowed cheaply via key confirmation
    /// when the package carries one (§4.3, Scenario 6).
    Symmetric(Vec<Vec<u8>>),
    Um1 { receiver_priv: &'k Um1KeyPair, sender_pub: Vec<u8> },
}

/// One fully opened, verified item.
pub struct OpenedItem {
    pub path: String,
    pub item_type: ItemType,
    pub plaintext: Vec<u8>,
}

/// Reads and verifies one package (§4.9 reader states, compressed here
/// into straight-line code since there is nothing to suspend between —
/// the whole manifest must be available before any payload byte can be
/// trusted).
pub struct PackageReader;

impl PackageReader {
    pub fn read<R: Read>(input: &mut R, key_input: ReaderKeyInput<'_>) -> Result<Vec<OpenedItem>> {
        let span = tracing::info_span!("package_read");
        let _enter = span.enter();

        let mut magic = [0u8; 4];
        input.read_exact(&mut magic).map_err(|_| ObscurCoreError::FormatMalformed("truncated header magic".into()))?;
        if magic != MAGIC {
            tracing::warn!("header magic mismatch");
            return Err(ObscurCoreError::FormatMalformed("header magic mismatch".into()));
        }

        let header_len = read_u32(input)? as usize;
        let mut header_bytes = alloc::vec![0u8; header_len];
        input.read_exact(&mut header_bytes).map_err(|_| ObscurCoreError::FormatMalformed("truncated manifest header".into()))?;
        let (format_version, scheme_name, crypto_bytes) = ManifestHeader::decode(&header_bytes)?;
        if format_version != manifest::FORMAT_VERSION {
            return Err(ObscurCoreError::FormatMalformed("unsupported format_version".into()));
        }
        let mut crypto_config = manifest::decode_crypto_config(&scheme_name, &crypto_bytes)?;

        let pre_key = resolve_pre_key(&key_input, &crypto_config)?;
        tracing::debug!("pre-key resolved");

        let cipher_cap = registry::cipher_by_name(&crypto_config.cipher().algorithm)?;
        let auth_cap = registry::auth_by_name(&crypto_config.authentication().function_name)?;
        let cipher_key_len = cipher_cap.key_sizes_bits[0] / 8;
        let mac_key_len = auth_cap.key_size_bits / 8;

        let kd = crypto_config.key_derivation();
        let working = kdf::derive_working_keys(&pre_key, &kd.salt, cipher_key_len, mac_key_len, kd.params.into())?;

        let mut obf_len = [0u8; 4];
        input.read_exact(&mut obf_len).map_err(|_| ObscurCoreError::FormatMalformed("truncated manifest length".into()))?;
        for (b, k) in obf_len.iter_mut().zip(working.mac_key.iter()) {
            *b ^= k;
        }
        let body_len = u32::from_le_bytes(obf_len) as usize;

        let mut body = alloc::vec![0u8; body_len];
        input.read_exact(&mut body).map_err(|_| ObscurCoreError::FormatMalformed("truncated manifest body".into()))?;

        let tag_len = manifest_tag_len(cipher_cap, auth_cap);
        if body.len() < tag_len {
            return Err(ObscurCoreError::FormatMalformed("manifest body shorter than its own tag".into()));
        }
        let split = body.len() - tag_len;
        let (ciphertext, tag) = body.split_at(split);

        let descriptor_aad = crypto_config.encode(true);
        let manifest_bytes = manifest::open_manifest(
            crypto_config.cipher(),
            crypto_config.authentication(),
            &working.cipher_key,
            &working.mac_key,
            ciphertext,
            tag,
            &descriptor_aad,
        )?;
        tracing::debug!("manifest opened and authenticated");

        let manifest = Manifest::decode(&manifest_bytes)?;
        let mut csprng = Csprng::from_key_nonce(&manifest.payload_config.prng_key, &manifest.payload_config.prng_nonce)?;
        let item_lengths: Vec<u64> = manifest.items.iter().map(|i| i.internal_length).collect();
        let ciphertexts = crate::multiplexer::read_payload(manifest.payload_config.scheme, &mut csprng, &item_lengths, input)?;

        let mut trailer = [0u8; 4];
        input.read_exact(&mut trailer).map_err(|_| ObscurCoreError::FormatMalformed("truncated trailer".into()))?;
        if trailer != MAGIC {
            tracing::warn!("trailer magic mismatch");
            return Err(ObscurCoreError::FormatMalformed("trailer magic mismatch".into()));
        }

        let mut opened = Vec::with_capacity(manifest.items.len());
        for (item, ciphertext) in manifest.items.iter().zip(ciphertexts.iter()) {
            let (cipher_key, mac_key) = resolve_item_keys_for_write(item, &pre_key)?;
            let plaintext = cipherstream::open(
                &item.cipher,
                &item.authentication,
                StreamKeys { cipher_key: &cipher_key, mac_key: &mac_key },
                ciphertext,
                &item.authentication_tag,
                &item.descriptor_aad(),
            )?;
            if plaintext.len() as u64 != item.external_length {
                return Err(ObscurCoreError::PayloadTruncated);
            }
            opened.push(OpenedItem { path: item.path.clone(), item_type: item.item_type, plaintext });
        }

        let mut pre_key = pre_key;
        pre_key.zeroize();
        crypto_config.set_authentication_tag(Vec::new());
        tracing::debug!(count = opened.len(), "package opened");
        Ok(opened)
    }
}

fn manifest_tag_len(cipher_cap: registry::CipherCapability, auth_cap: registry::AuthCapability) -> usize {
    if cipher_cap.kind == registry::CipherKind::Aead {
        cipher_cap.aead_mac_size_bits / 8
    } else {
        auth_cap.output_sizes_bits[0] / 8
    }
}

/// Resolve the manifest pre-key per §4.3/§4.5, using key confirmation as
/// a cheap pre-check when available (Scenario 6: identify the right
/// candidate in at most a few MAC operations before any scrypt call).
fn resolve_pre_key(key_input: &ReaderKeyInput<'_>, crypto_config: &ManifestCryptoConfig) -> Result<Vec<u8>> {
    match (key_input, crypto_config) {
        (ReaderKeyInput::Symmetric(candidates), ManifestCryptoConfig::SymmetricOnly { .. }) => {
            if let (Some((salt, hash)), Some(expected)) =
                (crypto_config.key_confirmation(), crypto_config.key_confirmation_output())
            {
                for candidate in candidates {
                    if confirmation::verify(candidate, salt, *hash, expected)? {
                        return Ok(candidate.clone());
                    }
                }
                tracing::warn!("no candidate pre-key matched key confirmation");
                return Err(ObscurCoreError::KeyConfirmationFailed);
            }
            candidates
                .first()
                .cloned()
                .ok_or_else(|| ObscurCoreError::ConfigurationInvalid("no candidate pre-keys supplied".into()))
        }
        (ReaderKeyInput::Um1 { receiver_priv, sender_pub }, ManifestCryptoConfig::Um1Hybrid { ephemeral_public_key, .. }) => {
            if receiver_priv.domain() != um1_domain(crypto_config) {
                return Err(ObscurCoreError::CurveMismatch);
            }
            um1::respond(receiver_priv, sender_pub, ephemeral_public_key)
        }
        _ => Err(ObscurCoreError::ConfigurationInvalid(
            "reader key input does not match the package's crypto scheme".to_string(),
        )),
    }
}

fn um1_domain(crypto_config: &ManifestCryptoConfig) -> EcDomain {
    match crypto_config {
        ManifestCryptoConfig::Um1Hybrid { ec_domain, .. } => *ec_domain,
        _ => EcDomain::X25519,
    }
}

fn read_u32<R: Read>(input: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf).map_err(|_| ObscurCoreError::FormatMalformed("truncated length prefix".into()))?;
    Ok(u32::from_le_bytes(buf))
}

fn io_err(_: std::io::Error) -> ObscurCoreError {
    ObscurCoreError::FormatMalformed("package write failed".into())
}
