//! Read/write engine throughput on internal units.
//!
//! Measures format parsing, formatted and list-directed output, and the
//! matching input paths without touching the filesystem.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use fortio_core::{Device, FormatProgram, ReadEngine, StandardCodec, StatementOptions, WriteEngine};

const ITEMS: [usize; 3] = [8, 64, 512];

fn bench_parse(c: &mut Criterion) {
    c.bench_function("format_parse", |b| {
        b.iter(|| {
            black_box(FormatProgram::parse(black_box("(1X,'row',I6,3(F10.3,1X),2E14.6,T70,A8,'!')")))
        });
    });
}

fn bench_write(c: &mut Criterion) {
    let program = FormatProgram::parse("(4(I8,F12.4))").expect("valid format");
    let mut group = c.benchmark_group("write");
    for n in ITEMS {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("formatted", n), &n, |b, &n| {
            b.iter(|| {
                let mut dev = Device::internal(Vec::<String>::new());
                let mut cursor = program.cursor();
                let mut eng =
                    WriteEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
                for i in 0..n {
                    if i % 2 == 0 {
                        let _ = eng.write_integer(i as i32);
                    } else {
                        let _ = eng.write_double(i as f64 * 1.25);
                    }
                }
                black_box(eng.end_record())
            });
        });
        group.bench_with_input(BenchmarkId::new("list_directed", n), &n, |b, &n| {
            b.iter(|| {
                let mut dev = Device::internal(Vec::<String>::new());
                let mut eng = WriteEngine::new(&mut dev, None, &StandardCodec, StatementOptions::default());
                for i in 0..n {
                    let _ = eng.write_double(i as f64 / 3.0);
                }
                black_box(eng.end_record())
            });
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let program = FormatProgram::parse("(8I6)").expect("valid format");
    let mut group = c.benchmark_group("read");
    for n in ITEMS {
        let fixed: Vec<String> = (0..n.div_ceil(8))
            .map(|r| (0..8).map(|i| format!("{:6}", r * 8 + i)).collect())
            .collect();
        let free: Vec<String> = vec![format!("{}*17 ", n / 2), "1.5, ".repeat(n - n / 2)];

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("formatted", n), &n, |b, &n| {
            b.iter(|| {
                let mut dev = Device::internal(&fixed);
                let mut cursor = program.cursor();
                let mut eng =
                    ReadEngine::new(&mut dev, Some(&mut cursor), &StandardCodec, StatementOptions::default());
                for _ in 0..n {
                    let _ = black_box(eng.read_integer());
                }
                eng.end_record();
            });
        });
        group.bench_with_input(BenchmarkId::new("list_directed", n), &n, |b, &n| {
            b.iter(|| {
                let mut dev = Device::internal(&free);
                let mut eng = ReadEngine::new(&mut dev, None, &StandardCodec, StatementOptions::default());
                for _ in 0..n / 2 {
                    let _ = black_box(eng.read_integer());
                }
                for _ in n / 2..n {
                    let _ = black_box(eng.read_double());
                }
                eng.end_record();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_write, bench_read);
criterion_main!(benches);
