use rand::Rng;

use bidr::float::{self, Precision};
use bidr::{decode, fbidr, Descriptor, Flatten};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

// An image record with `lines` lines of 512 pixels, built the same way as an F-BIDR
// image data record.
fn image_record(lines: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let pixels = 512;
    let mut body = Vec::new();
    body.extend(2u16.to_le_bytes());
    body.extend(4u16.to_le_bytes());
    body.extend(376u16.to_le_bytes());
    body.extend([65, 4]);
    body.extend(u16::try_from(lines).unwrap().to_le_bytes());
    body.extend(u16::try_from(pixels + 4).unwrap().to_le_bytes());
    for _ in 0..lines {
        body.extend(0u16.to_le_bytes());
        body.extend(u16::try_from(pixels).unwrap().to_le_bytes());
        body.extend((0..pixels).map(|_| rng.gen::<u8>()));
    }
    let mut buf = b"NJPL1I00015C".to_vec();
    buf.extend(format!("{:08}", body.len()).as_bytes());
    buf.extend(body);
    buf
}

fn bench_float(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let buf: Vec<u8> = (0..8 * 1024).map(|_| rng.gen()).collect();

    let mut group = c.benchmark_group("float");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("double", |b| {
        b.iter(|| {
            let sum: f64 = buf
                .chunks_exact(8)
                .map(|raw| float::decode(raw, Precision::Double).unwrap().0)
                .sum();
            sum
        });
    });
    group.finish();
}

fn bench_image_record(c: &mut Criterion) {
    let buf = image_record(5000);
    let desc = fbidr::image_record();

    let mut group = c.benchmark_group("image_record");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.sample_size(20);
    group.bench_function("decode", |b| {
        b.iter(|| {
            let (tree, rest) = decode(&buf, &desc).unwrap();
            assert!(rest.is_empty());
            tree.len()
        });
    });
    group.bench_function("flatten", |b| {
        let (tree, _) = decode(&buf, &desc).unwrap();
        b.iter(|| tree.flatten());
    });
    group.finish();
}

fn bench_sequence(c: &mut Criterion) {
    let desc = Descriptor::repeat(&Descriptor::unsigned(4), 16 * 1024);
    let buf = vec![0x5a; 4 * 16 * 1024];

    let mut group = c.benchmark_group("sequence");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("u32", |b| {
        b.iter(|| decode(&buf, &desc).unwrap().0.len());
    });
    group.finish();
}

criterion_group!(benches, bench_float, bench_image_record, bench_sequence);
criterion_main!(benches);
