use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use softrock_protocol::{Reply, codec::Request, si570::Registers};

fn parse_requests(c: &mut Criterion) {
    c.bench_function("parse set freq", |b| {
        b.iter(|| {
            Request::from_datagram(black_box(b"set freq 14.074000"))
                .and_then(|request| request.to_command())
        })
    });
    c.bench_function("parse get alias", |b| {
        b.iter(|| {
            Request::from_datagram(black_box(b"get frequency"))
                .and_then(|request| request.to_command())
        })
    });
}

fn encode_replies(c: &mut Criterion) {
    c.bench_function("write frequency reply", |b| {
        let mut out = Vec::with_capacity(32);
        b.iter(|| {
            out.clear();
            Reply::value(format!("{:.6}", black_box(14.074)))
                .write_to(&mut out)
                .unwrap();
        })
    });
}

fn compute_registers(c: &mut Criterion) {
    c.bench_function("si570 registers", |b| {
        b.iter(|| Registers::for_frequency(black_box(56.296), black_box(114.285)))
    });
}

criterion_group!(benches, parse_requests, encode_replies, compute_registers);
criterion_main!(benches);
