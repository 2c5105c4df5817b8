//! Benchmarks comparing the three payload layout schemes (Simple,
//! Frameshift, Fabric) at multiple item counts, since the interleaving
//! cost of Fabric and the padding cost of Frameshift are the main
//! reasons a caller would pick one over Simple.
//!
//! Run with: `cargo bench --bench multiplexer`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use obscurcore::item::ItemType;
use obscurcore::{PackageConfig, PackageReader, PackageWriter, PreKeySource, ReaderKeyInput};

const ITEM_SIZES: &[usize] = &[1024, 16 * 1024, 256 * 1024];

fn config_for(layout: obscurcore::LayoutScheme) -> PackageConfig {
    let mut cfg = PackageConfig::fast();
    cfg.layout = layout;
    cfg
}

fn pack_items(cfg: PackageConfig, items: &[Vec<u8>]) -> Vec<u8> {
    let mut writer = PackageWriter::new(cfg, PreKeySource::Symmetric(b"bench-passphrase".to_vec()));
    for (i, item) in items.iter().enumerate() {
        writer.add_item(format!("item-{i}"), ItemType::Binary, item.clone());
    }
    let mut out = Vec::new();
    writer.write(&mut out).unwrap();
    out
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiplexer_write");

    for &size in ITEM_SIZES {
        let items: Vec<Vec<u8>> = (0..4).map(|_| vec![0x5au8; size]).collect();
        let total = (items.len() * size) as u64;
        group.throughput(Throughput::Bytes(total));

        group.bench_with_input(BenchmarkId::new("simple", size), &items, |b, items| {
            b.iter(|| pack_items(config_for(obscurcore::LayoutScheme::Simple), items));
        });

        group.bench_with_input(BenchmarkId::new("frameshift", size), &items, |b, items| {
            b.iter(|| {
                pack_items(
                    config_for(obscurcore::LayoutScheme::Frameshift { pad_min: 0, pad_max: 256 }),
                    items,
                )
            });
        });

        group.bench_with_input(BenchmarkId::new("fabric", size), &items, |b, items| {
            b.iter(|| {
                pack_items(
                    config_for(obscurcore::LayoutScheme::Fabric { stripe_min: 64, stripe_max: 4096 }),
                    items,
                )
            });
        });
    }

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiplexer_read");

    for &size in ITEM_SIZES {
        let items: Vec<Vec<u8>> = (0..4).map(|_| vec![0x5au8; size]).collect();
        let total = (items.len() * size) as u64;
        group.throughput(Throughput::Bytes(total));

        let simple = pack_items(config_for(obscurcore::LayoutScheme::Simple), &items);
        let frameshift = pack_items(
            config_for(obscurcore::LayoutScheme::Frameshift { pad_min: 0, pad_max: 256 }),
            &items,
        );
        let fabric = pack_items(
            config_for(obscurcore::LayoutScheme::Fabric { stripe_min: 64, stripe_max: 4096 }),
            &items,
        );

        group.bench_with_input(BenchmarkId::new("simple", size), &simple, |b, bytes| {
            b.iter(|| {
                PackageReader::read(&mut bytes.as_slice(), ReaderKeyInput::Symmetric(vec![b"bench-passphrase".to_vec()]))
                    .unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new("frameshift", size), &frameshift, |b, bytes| {
            b.iter(|| {
                PackageReader::read(&mut bytes.as_slice(), ReaderKeyInput::Symmetric(vec![b"bench-passphrase".to_vec()]))
                    .unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new("fabric", size), &fabric, |b, bytes| {
            b.iter(|| {
                PackageReader::read(&mut bytes.as_slice(), ReaderKeyInput::Symmetric(vec![b"bench-passphrase".to_vec()]))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write, bench_read);
criterion_main!(benches);
