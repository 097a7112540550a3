//! Criterion benchmarks for the sechat record codec, frame splitter and the
//! default sealed-box provider.
//!
//! Run with:
//! ```bash
//! cargo bench --package sechat-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sechat_core::protocol::records::{
    DirectMessageRecord, GroupListRecord, GroupMessageRecord, NoticeRecord,
};
use sechat_core::{
    decode_record, encode_record, CryptoProvider, FrameSplitter, Record, SealedBoxCrypto,
};

// ── Record fixtures ───────────────────────────────────────────────────────────

fn make_direct_message() -> Record {
    Record::Message(DirectMessageRecord {
        to: "bob".to_string(),
        from: "alice".to_string(),
        message: "ab".repeat(96),
    })
}

fn make_group_message() -> Record {
    Record::GroupMessage(GroupMessageRecord {
        group: "team".to_string(),
        from: "alice".to_string(),
        to: Some("bob".to_string()),
        message: "cd".repeat(96),
    })
}

fn make_group_list() -> Record {
    Record::GroupList(GroupListRecord {
        id: 42,
        message: (0..32).map(|i| format!("member{i}")).collect(),
    })
}

fn fixtures() -> Vec<(&'static str, Record)> {
    vec![
        ("Handshake", Record::own_key("ef".repeat(32))),
        ("PubKeyLookup", Record::pubkey_lookup("bob")),
        ("GroupListRequest", Record::group_list_request("team", 7, "alice")),
        ("Message", make_direct_message()),
        ("GroupMessage", make_group_message()),
        ("GroupList(32)", make_group_list()),
        (
            "Error",
            Record::Error(NoticeRecord {
                message: "no such user".to_string(),
            }),
        ),
        ("Shutdown", Record::Shutdown),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_record");
    for (name, record) in fixtures() {
        group.bench_with_input(BenchmarkId::new("record", name), &record, |b, record| {
            b.iter(|| encode_record(black_box(record)).expect("encode must succeed"))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_record");
    for (name, record) in fixtures() {
        let bytes = encode_record(&record).expect("encode must succeed for benchmark setup");
        group.bench_with_input(BenchmarkId::new("record", name), &bytes, |b, bytes| {
            b.iter(|| decode_record(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Splits a 64-record stream delivered in 512-byte chunks, the way a busy
/// socket read loop would see it.
fn bench_frame_splitter(c: &mut Criterion) {
    let mut stream = Vec::new();
    for _ in 0..16 {
        for (_, record) in fixtures().iter().take(4) {
            stream.extend(encode_record(record).expect("encode must succeed"));
        }
    }

    c.bench_function("frame_splitter/64_records_512b_chunks", |b| {
        b.iter(|| {
            let mut splitter = FrameSplitter::new();
            let mut count = 0;
            for chunk in black_box(&stream).chunks(512) {
                count += splitter.push(chunk).records.len();
            }
            count
        })
    });
}

fn bench_sealed_box(c: &mut Criterion) {
    let crypto = SealedBoxCrypto::new();
    let bob = crypto.generate_key_pair().expect("keygen");
    let body = "hello from the benchmark".as_bytes();
    let ciphertext = crypto.encrypt(bob.public(), body).expect("encrypt");

    let mut group = c.benchmark_group("sealed_box");
    group.bench_function("encrypt", |b| {
        b.iter(|| crypto.encrypt(black_box(bob.public()), black_box(body)).unwrap())
    });
    group.bench_function("decrypt", |b| {
        b.iter(|| crypto.decrypt(black_box(&bob), black_box(&ciphertext)).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_frame_splitter,
    bench_sealed_box
);
criterion_main!(benches);
