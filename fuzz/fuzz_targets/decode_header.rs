#![no_main]

use libfuzzer_sys::fuzz_target;

// The manifest header decoder is the first thing run against attacker
// bytes, before any key material is even resolved — it must reject
// malformed input without panicking.
fuzz_target!(|data: &[u8]| {
    if let Ok((_version, scheme_name, crypto_bytes)) = obscurcore::manifest::ManifestHeader::decode(data) {
        let _ = obscurcore::manifest::decode_crypto_config(&scheme_name, &crypto_bytes);
    }
});
