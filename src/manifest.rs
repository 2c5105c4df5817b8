//! Manifest envelope (C9) and its data model (§3 `Manifest`,
//! `PayloadConfiguration`, `ManifestCryptoConfig`, `ManifestHeader`).
//!
//! The manifest body (item descriptors + payload layout) is serialized
//! once, sealed with `cipherstream::seal` under keys derived from the
//! pre-key, and the resulting ciphertext is what the writer/reader (C10)
//! places between the header and the payload on the wire.

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::cipher::CipherConfig;
use crate::cipherstream::{self, StreamKeys};
use crate::confirmation::ConfirmationHash;
use crate::error::{ObscurCoreError, Result};
use crate::item::PayloadItem;
use crate::kdf::WireKdfParams;
use crate::mac::AuthConfig;
use crate::multiplexer::LayoutScheme;
use crate::rng::{RNG_KEY_BYTES, RNG_NONCE_BYTES};
use crate::serial::{TlvReader, TlvWriter};
use crate::um1::EcDomain;

pub const FORMAT_VERSION: u32 = 1;

/// `(function_name, salt, function_parameters)` (§3 `KDFConfig`) as it
/// appears inside a `ManifestCryptoConfig`.
#[derive(Debug, Clone)]
pub struct KdfDescriptor {
    pub salt: Vec<u8>,
    pub params: WireKdfParams,
}

/// `(scheme ∈ {Simple, Frameshift, Fabric}, scheme_params, prng_name,
/// prng_config)` (§3). `prng_config` is the CSPRNG's own `(key, nonce)` —
/// the writer generates it once via `Csprng::seeded` and both sides
/// reconstruct an identical stream from these bytes (§4.1, §4.7).
#[derive(Debug, Clone)]
pub struct PayloadConfiguration {
    pub scheme: LayoutScheme,
    pub prng_key: [u8; RNG_KEY_BYTES],
    pub prng_nonce: [u8; RNG_NONCE_BYTES],
}

impl PayloadConfiguration {
    fn encode(&self, w: &mut TlvWriter) {
        w.write_str(1, self.scheme.wire_name());
        match self.scheme {
            LayoutScheme::Simple => {}
            LayoutScheme::Frameshift { pad_min, pad_max } => {
                w.write_u32(2, pad_min);
                w.write_u32(3, pad_max);
            }
            LayoutScheme::Fabric { stripe_min, stripe_max } => {
                w.write_u32(2, stripe_min);
                w.write_u32(3, stripe_max);
            }
        }
        w.write_bytes(4, &self.prng_key);
        w.write_bytes(5, &self.prng_nonce);
        w.write_str(6, "Salsa20");
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(bytes);
        let mut scheme_name = String::new();
        let mut a = 0u32;
        let mut b = 0u32;
        let mut prng_key = [0u8; RNG_KEY_BYTES];
        let mut prng_nonce = [0u8; RNG_NONCE_BYTES];

        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => scheme_name = value.as_str()?.into(),
                2 => a = value.as_u32()?,
                3 => b = value.as_u32()?,
                4 => prng_key.copy_from_slice(value.as_bytes()?),
                5 => prng_nonce.copy_from_slice(value.as_bytes()?),
                _ => {}
            }
        }

        let scheme = match scheme_name.as_str() {
            "Simple" => LayoutScheme::Simple,
            "Frameshift" => LayoutScheme::Frameshift { pad_min: a, pad_max: b },
            "Fabric" => LayoutScheme::Fabric { stripe_min: a, stripe_max: b },
            other => return Err(ObscurCoreError::ConfigurationInvalid(unknown_scheme(other))),
        };
        scheme.validate()?;
        Ok(Self { scheme, prng_key, prng_nonce })
    }
}

fn unknown_scheme(name: &str) -> String {
    let mut s = String::from("unknown payload layout scheme: ");
    s.push_str(name);
    s
}

/// Crypto configuration stored in the `ManifestHeader`, tagged by path
/// (§3 `ManifestCryptoConfig`).
pub enum ManifestCryptoConfig {
    SymmetricOnly {
        cipher: CipherConfig,
        authentication: AuthConfig,
        key_confirmation: Option<(Vec<u8>, ConfirmationHash)>,
        key_confirmation_output: Option<Vec<u8>>,
        key_derivation: KdfDescriptor,
        authentication_tag: Vec<u8>,
    },
    Um1Hybrid {
        cipher: CipherConfig,
        authentication: AuthConfig,
        key_confirmation: Option<(Vec<u8>, ConfirmationHash)>,
        key_confirmation_output: Option<Vec<u8>>,
        key_derivation: KdfDescriptor,
        authentication_tag: Vec<u8>,
        ec_domain: EcDomain,
        ephemeral_public_key: Vec<u8>,
    },
}

impl ManifestCryptoConfig {
    pub fn cipher(&self) -> &CipherConfig {
        match self {
            ManifestCryptoConfig::SymmetricOnly { cipher, .. } => cipher,
            ManifestCryptoConfig::Um1Hybrid { cipher, .. } => cipher,
        }
    }

    pub fn authentication(&self) -> &AuthConfig {
        match self {
            ManifestCryptoConfig::SymmetricOnly { authentication, .. } => authentication,
            ManifestCryptoConfig::Um1Hybrid { authentication, .. } => authentication,
        }
    }

    pub fn key_derivation(&self) -> &KdfDescriptor {
        match self {
            ManifestCryptoConfig::SymmetricOnly { key_derivation, .. } => key_derivation,
            ManifestCryptoConfig::Um1Hybrid { key_derivation, .. } => key_derivation,
        }
    }

    pub fn authentication_tag(&self) -> &[u8] {
        match self {
            ManifestCryptoConfig::SymmetricOnly { authentication_tag, .. } => authentication_tag,
            ManifestCryptoConfig::Um1Hybrid { authentication_tag, .. } => authentication_tag,
        }
    }

    pub fn set_authentication_tag(&mut self, tag: Vec<u8>) {
        match self {
            ManifestCryptoConfig::SymmetricOnly { authentication_tag, .. } => *authentication_tag = tag,
            ManifestCryptoConfig::Um1Hybrid { authentication_tag, .. } => *authentication_tag = tag,
        }
    }

    pub fn key_confirmation(&self) -> Option<&(Vec<u8>, ConfirmationHash)> {
        match self {
            ManifestCryptoConfig::SymmetricOnly { key_confirmation, .. } => key_confirmation.as_ref(),
            ManifestCryptoConfig::Um1Hybrid { key_confirmation, .. } => key_confirmation.as_ref(),
        }
    }

    pub fn key_confirmation_output(&self) -> Option<&Vec<u8>> {
        match self {
            ManifestCryptoConfig::SymmetricOnly { key_confirmation_output, .. } => key_confirmation_output.as_ref(),
            ManifestCryptoConfig::Um1Hybrid { key_confirmation_output, .. } => key_confirmation_output.as_ref(),
        }
    }

    pub fn scheme_name(&self) -> &'static str {
        match self {
            ManifestCryptoConfig::SymmetricOnly { .. } => "SymmetricOnly",
            ManifestCryptoConfig::Um1Hybrid { .. } => "Um1Hybrid",
        }
    }

    /// Serialize, optionally eliding the fields that must not feed back
    /// into their own authentication (§4.4, §9 Open Question (b), frozen
    /// in DESIGN.md: both `authentication_tag` and
    /// `key_confirmation_output` are elided from the AAD clone).
    pub fn encode(&self, elide_authenticatable_fields: bool) -> Vec<u8> {
        let mut w = TlvWriter::new();
        w.write_str(1, self.scheme_name());
        w.write_str(2, &self.cipher().algorithm);
        w.write_bytes(3, &self.cipher().iv);
        w.write_str(4, &self.authentication().function_name);
        let kdf = self.key_derivation();
        w.write_bytes(5, &kdf.salt);
        match kdf.params {
            WireKdfParams::Scrypt { n, r, p } => {
                w.write_u64(6, n);
                w.write_u32(7, r);
                w.write_u32(8, p);
            }
            WireKdfParams::Pbkdf2 { iterations } => {
                w.write_u32(9, iterations);
            }
        }
        if let Some((salt, hash)) = self.key_confirmation() {
            w.write_bytes(10, salt);
            w.write_u32(11, match hash {
                ConfirmationHash::Sha256 => 0,
                ConfirmationHash::Sha3_256 => 1,
            });
        }
        if !elide_authenticatable_fields {
            if let Some(output) = self.key_confirmation_output() {
                w.write_bytes(12, output);
            }
            w.write_bytes(13, self.authentication_tag());
        }
        if let ManifestCryptoConfig::Um1Hybrid { ec_domain, ephemeral_public_key, .. } = self {
            w.write_u32(14, match ec_domain {
                EcDomain::P256 => 0,
                EcDomain::X25519 => 1,
            });
            w.write_bytes(15, ephemeral_public_key);
        }
        w.write_u32(16, match self.authentication().kind {
            crate::mac::AuthKind::Mac => 0,
            crate::mac::AuthKind::Poly1305 => 1,
        });
        if let Some(nonce) = &self.authentication().nonce {
            w.write_bytes(17, nonce);
        }
        w.into_bytes()
    }
}

/// `(format_version, scheme_name, serialized crypto-config bytes)` (§3).
pub struct ManifestHeader {
    pub format_version: u32,
    pub crypto_config: ManifestCryptoConfig,
}

impl ManifestHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = TlvWriter::new();
        w.write_u32(1, self.format_version);
        w.write_str(2, self.crypto_config.scheme_name());
        w.write_bytes(3, &self.crypto_config.encode(false));
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<(u32, String, Vec<u8>)> {
        let mut r = TlvReader::new(bytes);
        let mut format_version = 0u32;
        let mut scheme_name = String::new();
        let mut crypto_bytes = Vec::new();
        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => format_version = value.as_u32()?,
                2 => scheme_name = value.as_str()?.into(),
                3 => crypto_bytes = value.as_bytes()?.to_vec(),
                _ => {}
            }
        }
        Ok((format_version, scheme_name, crypto_bytes))
    }
}

/// Decode a `ManifestCryptoConfig` given its already-extracted
/// `scheme_name` discriminant and the algorithm/cipher registry lookups
/// a real decode needs (callers own `CipherConfig`/`AuthConfig`
/// reconstruction since those also validate against the registry).
pub fn decode_crypto_config(scheme_name: &str, bytes: &[u8]) -> Result<ManifestCryptoConfig> {
    let mut r = TlvReader::new(bytes);
    let mut algorithm = String::new();
    let mut iv = Vec::new();
    let mut auth_name = String::new();
    let mut kdf_salt = Vec::new();
    let mut scrypt_n = None;
    let mut scrypt_r = 0u32;
    let mut scrypt_p = 0u32;
    let mut pbkdf2_iters = None;
    let mut confirm_salt = None;
    let mut confirm_hash = ConfirmationHash::Sha256;
    let mut confirm_output = None;
    let mut auth_tag = Vec::new();
    let mut ec_domain = EcDomain::X25519;
    let mut ephemeral_pub = Vec::new();
    let mut auth_kind = crate::mac::AuthKind::Mac;
    let mut auth_nonce: Option<Vec<u8>> = None;

    while let Some((field, value)) = r.next_field()? {
        match field {
            2 => algorithm = value.as_str()?.into(),
            3 => iv = value.as_bytes()?.to_vec(),
            4 => auth_name = value.as_str()?.into(),
            5 => kdf_salt = value.as_bytes()?.to_vec(),
            6 => scrypt_n = Some(value.as_u64()?),
            7 => scrypt_r = value.as_u32()?,
            8 => scrypt_p = value.as_u32()?,
            9 => pbkdf2_iters = Some(value.as_u32()?),
            10 => confirm_salt = Some(value.as_bytes()?.to_vec()),
            11 => confirm_hash = if value.as_u32()? == 0 { ConfirmationHash::Sha256 } else { ConfirmationHash::Sha3_256 },
            12 => confirm_output = Some(value.as_bytes()?.to_vec()),
            13 => auth_tag = value.as_bytes()?.to_vec(),
            14 => ec_domain = if value.as_u32()? == 0 { EcDomain::P256 } else { EcDomain::X25519 },
            15 => ephemeral_pub = value.as_bytes()?.to_vec(),
            16 => {
                auth_kind = if value.as_u32()? == 0 {
                    crate::mac::AuthKind::Mac
                } else {
                    crate::mac::AuthKind::Poly1305
                }
            }
            17 => auth_nonce = Some(value.as_bytes()?.to_vec()),
            _ => {}
        }
    }

    let cap = crate::registry::cipher_by_name(&algorithm)?;
    let (mode, padding) = crate::cipher::default_mode_padding(&algorithm, cap.kind);
    let cipher = CipherConfig {
        algorithm,
        key_size_bits: cap.key_sizes_bits[0],
        mode,
        padding,
        iv,
        associated_data: Vec::new(),
    };
    let authentication = AuthConfig {
        kind: auth_kind,
        function_name: auth_name,
        nonce: auth_nonce,
        salt: Vec::new(),
        additional_data: Vec::new(),
    };
    let params = match (scrypt_n, pbkdf2_iters) {
        (Some(n), _) => WireKdfParams::Scrypt { n, r: scrypt_r, p: scrypt_p },
        (None, Some(iterations)) => WireKdfParams::Pbkdf2 { iterations },
        (None, None) => {
            return Err(ObscurCoreError::FormatMalformed("manifest crypto-config missing KDF parameters".into()))
        }
    };
    let key_derivation = KdfDescriptor { salt: kdf_salt, params };
    let key_confirmation = confirm_salt.map(|salt| (salt, confirm_hash));

    Ok(match scheme_name {
        "SymmetricOnly" => ManifestCryptoConfig::SymmetricOnly {
            cipher,
            authentication,
            key_confirmation,
            key_confirmation_output: confirm_output,
            key_derivation,
            authentication_tag: auth_tag,
        },
        "Um1Hybrid" => ManifestCryptoConfig::Um1Hybrid {
            cipher,
            authentication,
            key_confirmation,
            key_confirmation_output: confirm_output,
            key_derivation,
            authentication_tag: auth_tag,
            ec_domain,
            ephemeral_public_key: ephemeral_pub,
        },
        other => return Err(ObscurCoreError::FormatMalformed(unknown_crypto_scheme(other))),
    })
}

fn unknown_crypto_scheme(name: &str) -> String {
    let mut s = String::from("unknown ManifestCryptoConfig scheme: ");
    s.push_str(name);
    s
}

/// `(ordered list of PayloadItem, PayloadConfiguration)` (§3). Order is
/// semantically significant: the multiplexer selection sequence depends
/// on it.
pub struct Manifest<'a> {
    pub items: Vec<PayloadItem<'a>>,
    pub payload_config: PayloadConfiguration,
}

impl<'a> Manifest<'a> {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = TlvWriter::new();
        for item in &self.items {
            w.write_message(1, &item.encode());
        }
        let mut pc = TlvWriter::new();
        self.payload_config.encode(&mut pc);
        w.write_message(2, &pc.into_bytes());
        w.into_bytes()
    }

    /// Decode every item header plus the shared `PayloadConfiguration`.
    pub fn decode(bytes: &[u8]) -> Result<Manifest<'static>> {
        let mut r = TlvReader::new(bytes);
        let mut item_bytes = Vec::new();
        let mut payload_config = None;
        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => item_bytes.push(value.as_bytes()?.to_vec()),
                2 => payload_config = Some(PayloadConfiguration::decode(value.as_bytes()?)?),
                _ => {}
            }
        }
        let payload_config = payload_config
            .ok_or_else(|| ObscurCoreError::FormatMalformed("manifest missing PayloadConfiguration".to_string()))?;

        let mut items = Vec::with_capacity(item_bytes.len());
        for raw in &item_bytes {
            items.push(PayloadItem::decode(raw)?);
        }

        Ok(Manifest { items, payload_config })
    }
}

/// Seal the serialized manifest body under `(cipher_key, mac_key)`,
/// binding the crypto-config descriptor (tag elided) as AAD (§4.4, §4.8).
pub fn seal_manifest(
    cipher: &CipherConfig,
    auth: &AuthConfig,
    cipher_key: &[u8],
    mac_key: &[u8],
    manifest_bytes: &[u8],
    descriptor_aad: &[u8],
) -> Result<cipherstream::Sealed> {
    cipherstream::seal(cipher, auth, StreamKeys { cipher_key, mac_key }, manifest_bytes, descriptor_aad)
}

/// Open a sealed manifest body, verifying before returning the bytes.
pub fn open_manifest(
    cipher: &CipherConfig,
    auth: &AuthConfig,
    cipher_key: &[u8],
    mac_key: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    descriptor_aad: &[u8],
) -> Result<Vec<u8>> {
    cipherstream::open(cipher, auth, StreamKeys { cipher_key, mac_key }, ciphertext, tag, descriptor_aad)
}
