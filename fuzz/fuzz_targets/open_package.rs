#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

use obscurcore::{PackageReader, ReaderKeyInput};

static CANDIDATES: Lazy<Vec<Vec<u8>>> = Lazy::new(|| vec![b"fuzz-passphrase".to_vec()]);

// Full reader pipeline against arbitrary bytes: magic/header parsing,
// pre-key resolution, manifest decryption, and payload demultiplexing
// must all reject malformed packages without panicking.
fuzz_target!(|data: &[u8]| {
    let _ = PackageReader::read(&mut &data[..], ReaderKeyInput::Symmetric(CANDIDATES.clone()));
});
