//! Benchmarks for the tmx pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tmx::{encode_payload, DataEncoding, PixelBuffer, TilemapBuilder, TilesetBuilder};

/// A map of `cols` x `rows` 16x16 tiles cycling through `variety` patterns.
fn map_image(cols: u32, rows: u32, variety: u32) -> PixelBuffer {
    let mut image = PixelBuffer::blank(cols * 16, rows * 16);
    for y in 0..rows {
        for x in 0..cols {
            let n = ((x * 7 + y * 13) % variety) as u8;
            let tile = [n, n.wrapping_mul(3), 255 - n, 255].repeat(16 * 16);
            image.blit(&tile, 16, 16, x * 16, y * 16);
        }
    }
    image
}

// -- Tileset benchmarks --

fn bench_tileset(c: &mut Criterion) {
    let mut group = c.benchmark_group("tileset");

    let small = map_image(16, 16, 8);
    let large = map_image(128, 128, 64);

    group.bench_function("append_16x16", |b| {
        b.iter(|| {
            let mut tileset = TilesetBuilder::new(16, 16);
            tileset.append(black_box(&small));
            tileset
        })
    });

    group.bench_function("append_128x128", |b| {
        b.iter(|| {
            let mut tileset = TilesetBuilder::new(16, 16);
            tileset.append(black_box(&large));
            tileset
        })
    });

    let mut tileset = TilesetBuilder::new(16, 16);
    tileset.append(&large);
    group.bench_function("render_atlas_64", |b| {
        b.iter(|| tileset.render_atlas().unwrap())
    });

    group.finish();
}

// -- Tilemap benchmarks --

fn bench_tilemap(c: &mut Criterion) {
    let mut group = c.benchmark_group("tilemap");

    let image = map_image(128, 128, 64);
    let mut tileset = TilesetBuilder::new(16, 16);
    tileset.append(&image);

    group.bench_function("resolve_128x128", |b| {
        b.iter(|| {
            let mut tilemap = TilemapBuilder::new(&tileset, black_box(&image));
            tilemap.resolve().unwrap().ids().len()
        })
    });

    group.finish();
}

// -- Encoding benchmarks --

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");

    let image = map_image(128, 128, 32);
    let mut tileset = TilesetBuilder::new(16, 16);
    tileset.append(&image);
    let grid = tileset.take_scanned_grid().unwrap();

    for encoding in DataEncoding::ALL {
        group.bench_function(encoding.name(), |b| {
            b.iter(|| encode_payload(black_box(&grid), encoding).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tileset, bench_tilemap, bench_encoding);
criterion_main!(benches);
