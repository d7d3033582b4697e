// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use criterion::BatchSize;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use ioam_bench::BODY_LENS;
use ioam_bench::bench_node;
use ioam_bench::bench_pkts;
use ioam_bench::frame_of;
use ioam_export::engine::VECTOR_SIZE;
use ioam_export::engine::copy::copy_cache_lines;
use ioam_test_utils::DEFAULT_EXPORT_SIZE;
use ioam_test_utils::ValidCfg;
use std::hint::black_box;

pub fn line_copy(c: &mut Criterion) {
    let src = vec![0xA5u8; 1500];
    let mut dst = vec![0u8; DEFAULT_EXPORT_SIZE];
    let mut c = c.benchmark_group("copy");

    for n in [63usize, 150, 192, 1500] {
        c.throughput(Throughput::Bytes(n.min(DEFAULT_EXPORT_SIZE) as u64));
        c.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, n| {
            b.iter(|| {
                copy_cache_lines(
                    black_box(&mut dst),
                    black_box(&src),
                    *n,
                    DEFAULT_EXPORT_SIZE,
                )
            })
        });
    }
}

pub fn node_frame(c: &mut Criterion) {
    let node = bench_node();
    let cfg = ValidCfg::default();
    let mut c = c.benchmark_group("ip6-export");
    c.throughput(Throughput::Elements(VECTOR_SIZE as u64));

    for body_len in BODY_LENS {
        let pkts = bench_pkts(VECTOR_SIZE, *body_len);
        c.bench_with_input(
            BenchmarkId::new("frame", body_len),
            &pkts,
            |b, pkts| {
                b.iter_batched(
                    || frame_of(pkts),
                    |frame| node.process(&cfg, black_box(frame)),
                    BatchSize::LargeInput,
                )
            },
        );
    }
}

criterion_group!(export, line_copy, node_frame);
criterion_main!(export);
