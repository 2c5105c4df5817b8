//! Payload item layer (C7): per-item encryption, authentication, and the
//! lazy stream bindings §9 calls for ("items hold a supplier function
//! rather than an open handle; opening is deferred until the transfer
//! step").

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::cipher::{self, CipherConfig};
use crate::kdf::WireKdfParams;
use crate::mac::{AuthConfig, AuthKind};
use crate::error::{ObscurCoreError, Result};
use crate::serial::{TlvReader, TlvWriter};

/// `type ∈ {Binary, Utf8, KeyAction}` (§3 `PayloadItem`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Binary,
    Utf8,
    KeyAction,
}

impl ItemType {
    fn wire_tag(self) -> u32 {
        match self {
            ItemType::Binary => 0,
            ItemType::Utf8 => 1,
            ItemType::KeyAction => 2,
        }
    }

    fn from_wire_tag(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(ItemType::Binary),
            1 => Ok(ItemType::Utf8),
            2 => Ok(ItemType::KeyAction),
            other => Err(ObscurCoreError::FormatMalformed(fmt_unknown_item_type(other))),
        }
    }
}

fn fmt_unknown_item_type(tag: u32) -> String {
    let mut s = String::from("unknown PayloadItem type tag: ");
    s.push((b'0' + (tag % 10) as u8) as char);
    s
}

/// Key-derivation descriptor attached to an item resolving its working
/// keys from the package pre-key at transfer time (§4.6).
#[derive(Debug, Clone)]
pub struct ItemKeyDerivation {
    pub salt: Vec<u8>,
    pub params: WireKdfParams,
}

/// Either explicit key bytes or a derivation descriptor resolved from the
/// package pre-key — §3's "never both, never neither" invariant. Both
/// variants live inside the already-encrypted manifest body, so storing
/// raw key bytes in the `Explicit` case costs nothing extra in
/// confidentiality.
#[derive(Clone)]
pub enum ItemKeyMaterial {
    Explicit { cipher_key: Vec<u8>, auth_key: Vec<u8> },
    Derived(ItemKeyDerivation),
}

/// A lazily bound plaintext source/sink (§9 "lazy stream bindings").
/// Boxed closures stand in for §6's `StreamSource`/`StreamSink`
/// capability interfaces — file I/O itself is out of scope (§1).
pub enum StreamBinding<'a> {
    Unbound,
    Source(alloc::boxed::Box<dyn FnOnce() -> Result<Vec<u8>> + 'a>),
    Sink(alloc::boxed::Box<dyn FnOnce(Vec<u8>) -> Result<()> + 'a>),
}

/// `PayloadItem` (§3): one entry in the manifest, independently
/// encrypted+authenticated by C5 (§4.6).
pub struct PayloadItem<'a> {
    pub uuid: [u8; 16],
    pub item_type: ItemType,
    pub path: String,
    pub external_length: u64,
    pub internal_length: u64,
    pub format_name: Option<String>,
    pub format_data: Vec<u8>,
    pub cipher: CipherConfig,
    pub authentication: AuthConfig,
    pub authentication_tag: Vec<u8>,
    pub key_material: ItemKeyMaterial,
    pub binding: StreamBinding<'a>,
}

impl<'a> PayloadItem<'a> {
    /// Aggregate-checkable precondition for write (§4.6, §4.10): an item
    /// with no key and no derivation is `KeyMaterialMissing`; an item
    /// with no stream source bound is `StreamBindingAbsent`.
    pub fn check_write_preconditions(&self) -> Vec<ObscurCoreError> {
        let mut errs = Vec::new();
        if let ItemKeyMaterial::Explicit { cipher_key, auth_key } = &self.key_material {
            if cipher_key.is_empty() && auth_key.is_empty() {
                errs.push(ObscurCoreError::KeyMaterialMissing { item: self.path.clone() });
            }
        }
        if matches!(self.binding, StreamBinding::Unbound) {
            errs.push(ObscurCoreError::StreamBindingAbsent { item: self.path.clone() });
        }
        errs
    }

    /// Descriptor bytes used as C5's AAD: every field below except
    /// `authentication_tag` and `internal_length` (§4.4, §9
    /// "authenticatable clone"). `internal_length` is reader-filled from
    /// the ciphertext it has not yet decrypted (§3) and is zero at seal
    /// time on the writer side, so it must be excluded here the same way
    /// `authentication_tag` is — including it would bind seal and open to
    /// two different AAD values and every item would fail to verify.
    /// Key material (fields 11-17) *is* part of this AAD: those bytes
    /// only ever appear inside the already-sealed manifest body, so
    /// including them costs nothing and keeps the AAD a faithful binding
    /// of "every other field this item carries."
    pub fn descriptor_aad(&self) -> Vec<u8> {
        self.encode_fields(false)
    }

    pub fn encode(&self) -> Vec<u8> {
        self.encode_fields(true)
    }

    fn encode_fields(&self, full: bool) -> Vec<u8> {
        let mut w = TlvWriter::new();
        w.write_bytes(1, &self.uuid);
        w.write_u32(2, self.item_type.wire_tag());
        w.write_str(3, &self.path);
        w.write_u64(4, self.external_length);
        if full {
            w.write_u64(5, self.internal_length);
        }
        if let Some(name) = &self.format_name {
            w.write_str(6, name);
        }
        w.write_bytes(7, &self.format_data);
        w.write_str(8, &self.cipher.algorithm);
        w.write_bytes(9, &self.cipher.iv);
        w.write_str(10, &self.authentication.function_name);
        match &self.key_material {
            ItemKeyMaterial::Explicit { cipher_key, auth_key } => {
                w.write_bytes(11, cipher_key);
                w.write_bytes(12, auth_key);
            }
            ItemKeyMaterial::Derived(kd) => {
                w.write_bytes(13, &kd.salt);
                match kd.params {
                    WireKdfParams::Scrypt { n, r, p } => {
                        w.write_u64(14, n);
                        w.write_u32(15, r);
                        w.write_u32(16, p);
                    }
                    WireKdfParams::Pbkdf2 { iterations } => {
                        w.write_u32(17, iterations);
                    }
                }
            }
        }
        w.write_u32(19, auth_kind_wire_tag(self.authentication.kind));
        if let Some(nonce) = &self.authentication.nonce {
            w.write_bytes(20, nonce);
        }
        if full {
            w.write_bytes(18, &self.authentication_tag);
        }
        w.into_bytes()
    }

    /// Decode a whole item (minus its lazy stream binding, supplied
    /// out-of-band by the reader — §3: "the reader fills `internal_length`
    /// and `authentication_tag` upon unpack").
    pub fn decode(bytes: &[u8]) -> Result<PayloadItem<'static>> {
        let mut r = TlvReader::new(bytes);
        let mut uuid = [0u8; 16];
        let mut item_type = ItemType::Binary;
        let mut path = String::new();
        let mut external_length = 0u64;
        let mut internal_length = 0u64;
        let mut format_name = None;
        let mut format_data = Vec::new();
        let mut algorithm = String::new();
        let mut iv = Vec::new();
        let mut auth_name = String::new();
        let mut authentication_tag = Vec::new();
        let mut explicit_cipher_key: Option<Vec<u8>> = None;
        let mut explicit_auth_key: Option<Vec<u8>> = None;
        let mut kdf_salt: Option<Vec<u8>> = None;
        let mut scrypt_n = None;
        let mut scrypt_r = 0u32;
        let mut scrypt_p = 0u32;
        let mut pbkdf2_iters = None;
        let mut auth_kind = AuthKind::Mac;
        let mut auth_nonce: Option<Vec<u8>> = None;

        while let Some((field, value)) = r.next_field()? {
            match field {
                1 => uuid.copy_from_slice(require_len(value.as_bytes()?, 16)?),
                2 => item_type = ItemType::from_wire_tag(value.as_u32()?)?,
                3 => path = value.as_str()?.into(),
                4 => external_length = value.as_u64()?,
                5 => internal_length = value.as_u64()?,
                6 => format_name = Some(value.as_str()?.into()),
                7 => format_data = value.as_bytes()?.to_vec(),
                8 => algorithm = value.as_str()?.into(),
                9 => iv = value.as_bytes()?.to_vec(),
                10 => auth_name = value.as_str()?.into(),
                11 => explicit_cipher_key = Some(value.as_bytes()?.to_vec()),
                12 => explicit_auth_key = Some(value.as_bytes()?.to_vec()),
                13 => kdf_salt = Some(value.as_bytes()?.to_vec()),
                14 => scrypt_n = Some(value.as_u64()?),
                15 => scrypt_r = value.as_u32()?,
                16 => scrypt_p = value.as_u32()?,
                17 => pbkdf2_iters = Some(value.as_u32()?),
                18 => authentication_tag = value.as_bytes()?.to_vec(),
                19 => auth_kind = auth_kind_from_wire_tag(value.as_u32()?)?,
                20 => auth_nonce = Some(value.as_bytes()?.to_vec()),
                _ => {}
            }
        }

        let cap = crate::registry::cipher_by_name(&algorithm)?;
        let (mode, padding) = cipher::default_mode_padding(&algorithm, cap.kind);
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

        let key_material = if let (Some(ck), Some(ak)) = (explicit_cipher_key, explicit_auth_key) {
            ItemKeyMaterial::Explicit { cipher_key: ck, auth_key: ak }
        } else {
            let salt = kdf_salt
                .ok_or_else(|| ObscurCoreError::FormatMalformed("item has neither explicit keys nor a KDF descriptor".into()))?;
            let params = match (scrypt_n, pbkdf2_iters) {
                (Some(n), _) => WireKdfParams::Scrypt { n, r: scrypt_r, p: scrypt_p },
                (None, Some(iterations)) => WireKdfParams::Pbkdf2 { iterations },
                (None, None) => return Err(ObscurCoreError::FormatMalformed("item KDF descriptor missing parameters".into())),
            };
            ItemKeyMaterial::Derived(ItemKeyDerivation { salt, params })
        };

        Ok(PayloadItem {
            uuid,
            item_type,
            path,
            external_length,
            internal_length,
            format_name,
            format_data,
            cipher,
            authentication,
            authentication_tag,
            key_material,
            binding: StreamBinding::Unbound,
        })
    }
}

fn auth_kind_wire_tag(kind: AuthKind) -> u32 {
    match kind {
        AuthKind::Mac => 0,
        AuthKind::Poly1305 => 1,
    }
}

fn auth_kind_from_wire_tag(tag: u32) -> Result<AuthKind> {
    match tag {
        0 => Ok(AuthKind::Mac),
        1 => Ok(AuthKind::Poly1305),
        other => {
            let mut s = String::from("unknown AuthKind tag: ");
            s.push((b'0' + (other % 10) as u8) as char);
            Err(ObscurCoreError::FormatMalformed(s))
        }
    }
}

fn require_len(bytes: &[u8], len: usize) -> Result<&[u8]> {
    if bytes.len() == len {
        Ok(bytes)
    } else {
        Err(ObscurCoreError::FormatMalformed("fixed-length field has the wrong size".into()))
    }
}

impl<'a> fmt::Debug for PayloadItem<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadItem")
            .field("uuid", &self.uuid)
            .field("item_type", &self.item_type)
            .field("path", &self.path)
            .field("external_length", &self.external_length)
            .field("internal_length", &self.internal_length)
            .finish_non_exhaustive()
    }
}
