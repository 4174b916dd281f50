use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rfmesh::mesh::{Reassembly, ReassemblyStore};
use rfmesh::protocol::{Header, MessageType, decode_header, encode_frame, fragment_plan};

const FRAME: usize = 32;
const PER_FRAME: usize = FRAME - rfmesh::HEADER_SIZE;

fn frames(payload: &[u8]) -> Vec<bytes::Bytes> {
    fragment_plan(payload.len(), FRAME)
        .unwrap()
        .into_iter()
        .map(|f| {
            let header = Header::new(MessageType::USER, 42, 7, f.split_part, f.split_more);
            encode_frame(&header, &payload[f.range()])
        })
        .collect()
}

fn bench_fragment(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragment");

    for size in [16usize, 256, PER_FRAME * 128] {
        let payload = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| black_box(frames(payload)));
        });
    }

    group.finish();
}

fn bench_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("header");

    let header = Header::new(MessageType::USER, 0xBEEF, 200, 17, true);
    group.bench_function("encode", |b| {
        b.iter(|| black_box(black_box(&header).to_bytes()));
    });

    let bytes = header.to_bytes();
    group.bench_function("decode", |b| {
        b.iter(|| black_box(decode_header(black_box(&bytes)).unwrap()));
    });

    group.finish();
}

fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");

    for size in [16usize, 256, PER_FRAME * 128] {
        let wire = frames(&vec![0x5Au8; size]);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &wire, |b, wire| {
            b.iter(|| {
                let mut store = ReassemblyStore::new(PER_FRAME, PER_FRAME * 128);
                for frame in wire {
                    let header = decode_header(frame).unwrap();
                    if let Reassembly::Complete(done) =
                        store.accept_fragment(&header, &frame[rfmesh::HEADER_SIZE..])
                    {
                        black_box(done);
                    }
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fragment, bench_header, bench_reassemble);
criterion_main!(benches);
