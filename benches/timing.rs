use std::hint::black_box;
use std::time::Instant;

use obscurcore::item::ItemType;
use obscurcore::{PackageConfig, PackageReader, PackageWriter, PreKeySource, ReaderKeyInput};

fn time_it<F: FnMut()>(label: &str, iters: usize, mut f: F) {
    // warmup
    for _ in 0..(iters / 10).max(10) {
        f();
    }

    let start = Instant::now();
    for _ in 0..iters {
        f();
    }
    let elapsed = start.elapsed();

    let per_iter = elapsed / (iters as u32);
    println!("{:<16} total={:?}  per_iter={:?}", label, elapsed, per_iter);
}

fn pack(pass: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let mut writer = PackageWriter::new(PackageConfig::fast(), PreKeySource::Symmetric(pass.to_vec()));
    writer.add_item("payload.bin", ItemType::Binary, plaintext.to_vec());
    let mut out = Vec::new();
    writer.write(&mut out).unwrap();
    out
}

fn main() {
    let pass_good = b"correct horse battery staple";
    let pass_bad = b"wrong passphrase entirely";
    let plaintext = vec![0x42u8; 64 * 1024];

    let good = pack(pass_good, &plaintext);

    let mut tampered = good.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;

    let mut truncated = good.clone();
    truncated.truncate(good.len() / 2);

    let iters = 500;

    time_it("pack", iters, || {
        let out = pack(black_box(pass_good), black_box(&plaintext));
        black_box(out);
    });

    time_it("unpack_valid", iters, || {
        let opened = PackageReader::read(
            &mut black_box(good.as_slice()),
            ReaderKeyInput::Symmetric(vec![pass_good.to_vec()]),
        )
        .unwrap();
        black_box(opened);
    });

    time_it("unpack_wrong_key", iters, || {
        let r = PackageReader::read(
            &mut black_box(good.as_slice()),
            ReaderKeyInput::Symmetric(vec![pass_bad.to_vec()]),
        );
        black_box(r.err());
    });

    time_it("unpack_tampered", iters, || {
        let r = PackageReader::read(
            &mut black_box(tampered.as_slice()),
            ReaderKeyInput::Symmetric(vec![pass_good.to_vec()]),
        );
        black_box(r.err());
    });

    time_it("unpack_truncated", iters, || {
        let r = PackageReader::read(
            &mut black_box(truncated.as_slice()),
            ReaderKeyInput::Symmetric(vec![pass_good.to_vec()]),
        );
        black_box(r.err());
    });

    println!("\nDone.");
}
