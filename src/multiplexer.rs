//! Payload multiplexer (C8): interleaves item ciphertext into the package
//! payload stream under a layout scheme, sharing one CSPRNG with the
//! writer and reader so both sides derive byte-identical decisions.
//!
//! Each item is sealed in full by `cipherstream::seal` before this module
//! ever sees it (§5: the payload is first assembled in a scratch sink);
//! the multiplexer's only job is choosing *how the resulting ciphertext
//! bytes are ordered and padded* on the wire, per §4.7.

extern crate alloc;
use alloc::vec::Vec;
use std::io::{Read, Write};

use crate::error::{ObscurCoreError, Result};
use crate::rng::Csprng;

/// `scheme ∈ {Simple, Frameshift, Fabric}` plus `scheme_params` (§3
/// `PayloadConfiguration`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutScheme {
    Simple,
    Frameshift { pad_min: u32, pad_max: u32 },
    Fabric { stripe_min: u32, stripe_max: u32 },
}

impl LayoutScheme {
    pub fn wire_name(self) -> &'static str {
        match self {
            LayoutScheme::Simple => "Simple",
            // §4.7 [EXPANSION] / §9 Open Question (a): the Fabric name
            // must never be reported as "Frameshift".
            LayoutScheme::Frameshift { .. } => "Frameshift",
            LayoutScheme::Fabric { .. } => "Fabric",
        }
    }

    pub fn validate(self) -> Result<()> {
        match self {
            LayoutScheme::Simple => Ok(()),
            LayoutScheme::Frameshift { pad_min, pad_max } => {
                if pad_min > pad_max || pad_max > 0xFFFF {
                    return Err(ObscurCoreError::ConfigurationInvalid(
                        "Frameshift requires pad_min <= pad_max <= 65535".into(),
                    ));
                }
                Ok(())
            }
            LayoutScheme::Fabric { stripe_min, stripe_max } => {
                if stripe_min < 64 || stripe_min > stripe_max || stripe_max > 0x1_0000 {
                    return Err(ObscurCoreError::ConfigurationInvalid(
                        "Fabric requires 64 <= stripe_min <= stripe_max <= 65536".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

struct OpenItem {
    index: usize,
    remaining: u64,
}

/// Write `items` (already-sealed ciphertext, one `Vec<u8>` per manifest
/// item, in manifest order) into `out` under `scheme`, using `csprng` for
/// every padding length and Fabric item/stripe selection.
pub fn write_payload<W: Write>(
    scheme: LayoutScheme,
    csprng: &mut Csprng,
    items: &[Vec<u8>],
    out: &mut W,
) -> Result<()> {
    scheme.validate()?;
    match scheme {
        LayoutScheme::Simple => {
            for item in items {
                out.write_all(item).map_err(io_err)?;
            }
        }
        LayoutScheme::Frameshift { pad_min, pad_max } => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    emit_padding(csprng, pad_min, pad_max, out)?;
                }
                out.write_all(item).map_err(io_err)?;
            }
            // trailing pad (§4.7 "Completion"): always emitted so the
            // reader's unconditional consume matches byte-for-byte; with
            // pad_min = pad_max = 0 this degenerates to zero bytes.
            emit_padding(csprng, pad_min, pad_max, out)?;
        }
        LayoutScheme::Fabric { stripe_min, stripe_max } => {
            let mut open: Vec<OpenItem> = items
                .iter()
                .enumerate()
                .map(|(index, item)| OpenItem { index, remaining: item.len() as u64 })
                .filter(|o| o.remaining > 0)
                .collect();
            let mut cursors = alloc::vec![0usize; items.len()];

            while !open.is_empty() {
                let pick = csprng.next_range_u32(0, open.len() as u32 - 1) as usize;
                let stripe = csprng.next_range_u32(stripe_min, stripe_max) as u64;
                let take = stripe.min(open[pick].remaining) as usize;
                let idx = open[pick].index;
                let start = cursors[idx];
                out.write_all(&items[idx][start..start + take]).map_err(io_err)?;
                cursors[idx] += take;
                open[pick].remaining -= take as u64;
                if open[pick].remaining == 0 {
                    open.swap_remove(pick);
                }
            }
        }
    }
    Ok(())
}

/// Read the payload back given each item's declared ciphertext length
/// (`internal_length`, from the already-decrypted manifest) in manifest
/// order, reproducing the identical decision sequence `write_payload`
/// made. §4.7: "If any item's declared external_length is not reached on
/// read, fail with PayloadTruncated" — enforced via each item buffer's
/// exact length rather than an end-of-stream sentinel.
pub fn read_payload<R: Read>(
    scheme: LayoutScheme,
    csprng: &mut Csprng,
    item_lengths: &[u64],
    input: &mut R,
) -> Result<Vec<Vec<u8>>> {
    scheme.validate()?;
    let mut buffers: Vec<Vec<u8>> = item_lengths.iter().map(|&len| alloc::vec![0u8; len as usize]).collect();

    match scheme {
        LayoutScheme::Simple => {
            for buf in &mut buffers {
                input.read_exact(buf).map_err(|_| ObscurCoreError::PayloadTruncated)?;
            }
        }
        LayoutScheme::Frameshift { pad_min, pad_max } => {
            for (i, buf) in buffers.iter_mut().enumerate() {
                if i > 0 {
                    consume_padding(csprng, pad_min, pad_max, input)?;
                }
                input.read_exact(buf).map_err(|_| ObscurCoreError::PayloadTruncated)?;
            }
            consume_padding(csprng, pad_min, pad_max, input)?;
        }
        LayoutScheme::Fabric { stripe_min, stripe_max } => {
            let mut open: Vec<OpenItem> = item_lengths
                .iter()
                .enumerate()
                .map(|(index, &len)| OpenItem { index, remaining: len })
                .filter(|o| o.remaining > 0)
                .collect();
            let mut cursors = alloc::vec![0usize; item_lengths.len()];

            while !open.is_empty() {
                let pick = csprng.next_range_u32(0, open.len() as u32 - 1) as usize;
                let stripe = csprng.next_range_u32(stripe_min, stripe_max) as u64;
                let take = stripe.min(open[pick].remaining) as usize;
                let idx = open[pick].index;
                let start = cursors[idx];
                input
                    .read_exact(&mut buffers[idx][start..start + take])
                    .map_err(|_| ObscurCoreError::PayloadTruncated)?;
                cursors[idx] += take;
                open[pick].remaining -= take as u64;
                if open[pick].remaining == 0 {
                    open.swap_remove(pick);
                }
            }
        }
    }

    Ok(buffers)
}

fn emit_padding<W: Write>(csprng: &mut Csprng, pad_min: u32, pad_max: u32, out: &mut W) -> Result<()> {
    let len = csprng.next_range_u32(pad_min, pad_max) as usize;
    let pad = csprng.next_padding(len);
    out.write_all(&pad).map_err(io_err)
}

fn consume_padding<R: Read>(csprng: &mut Csprng, pad_min: u32, pad_max: u32, input: &mut R) -> Result<()> {
    let len = csprng.next_range_u32(pad_min, pad_max) as usize;
    let _ = csprng.next_padding(len); // keeps the CSPRNG stream aligned with the writer
    let mut discard = alloc::vec![0u8; len];
    input.read_exact(&mut discard).map_err(|_| ObscurCoreError::PayloadTruncated)
}

fn io_err(_: std::io::Error) -> ObscurCoreError {
    ObscurCoreError::FormatMalformed("payload write failed".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RNG_KEY_BYTES, RNG_NONCE_BYTES};

    fn fresh_csprng() -> Csprng {
        Csprng::from_key_nonce(&[7u8; RNG_KEY_BYTES], &[9u8; RNG_NONCE_BYTES]).unwrap()
    }

    #[test]
    fn simple_roundtrip() {
        let items = alloc::vec![alloc::vec![1u8, 2, 3], alloc::vec![4u8, 5]];
        let mut out = Vec::new();
        write_payload(LayoutScheme::Simple, &mut fresh_csprng(), &items, &mut out).unwrap();
        assert_eq!(out, alloc::vec![1, 2, 3, 4, 5]);

        let lens: Vec<u64> = items.iter().map(|i| i.len() as u64).collect();
        let mut cursor = std::io::Cursor::new(out);
        let back = read_payload(LayoutScheme::Simple, &mut fresh_csprng(), &lens, &mut cursor).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn frameshift_zero_pad_matches_simple() {
        let items = alloc::vec![alloc::vec![9u8; 10], alloc::vec![8u8; 5]];
        let scheme = LayoutScheme::Frameshift { pad_min: 0, pad_max: 0 };
        let mut out = Vec::new();
        write_payload(scheme, &mut fresh_csprng(), &items, &mut out).unwrap();
        assert_eq!(out, alloc::vec![9u8; 10].into_iter().chain(alloc::vec![8u8; 5]).collect::<Vec<_>>());
    }

    #[test]
    fn frameshift_determinism() {
        let items = alloc::vec![alloc::vec![1u8; 20], alloc::vec![2u8; 30]];
        let scheme = LayoutScheme::Frameshift { pad_min: 4, pad_max: 16 };
        let mut out1 = Vec::new();
        write_payload(scheme, &mut fresh_csprng(), &items, &mut out1).unwrap();
        let mut out2 = Vec::new();
        write_payload(scheme, &mut fresh_csprng(), &items, &mut out2).unwrap();
        assert_eq!(out1, out2);

        let lens: Vec<u64> = items.iter().map(|i| i.len() as u64).collect();
        let mut cursor = std::io::Cursor::new(out1);
        let back = read_payload(scheme, &mut fresh_csprng(), &lens, &mut cursor).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn fabric_single_item_behaves_like_simple() {
        let items = alloc::vec![alloc::vec![3u8; 500]];
        let scheme = LayoutScheme::Fabric { stripe_min: 64, stripe_max: 256 };
        let mut out = Vec::new();
        write_payload(scheme, &mut fresh_csprng(), &items, &mut out).unwrap();
        assert_eq!(out, items[0]);
    }

    #[test]
    fn fabric_interleaving_roundtrip() {
        let items = alloc::vec![alloc::vec![1u8; 1000], alloc::vec![2u8; 2000], alloc::vec![3u8; 500]];
        let scheme = LayoutScheme::Fabric { stripe_min: 64, stripe_max: 256 };
        let mut out = Vec::new();
        write_payload(scheme, &mut fresh_csprng(), &items, &mut out).unwrap();

        let lens: Vec<u64> = items.iter().map(|i| i.len() as u64).collect();
        let mut cursor = std::io::Cursor::new(out);
        let back = read_payload(scheme, &mut fresh_csprng(), &lens, &mut cursor).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn truncated_payload_fails() {
        let items = alloc::vec![alloc::vec![1u8; 100]];
        let mut out = Vec::new();
        write_payload(LayoutScheme::Simple, &mut fresh_csprng(), &items, &mut out).unwrap();
        out.truncate(50);
        let mut cursor = std::io::Cursor::new(out);
        let err = read_payload(LayoutScheme::Simple, &mut fresh_csprng(), &[100], &mut cursor).unwrap_err();
        assert_eq!(err, ObscurCoreError::PayloadTruncated);
    }
}
