//! File-backed unit benchmarks: record append, rewind-and-read, and
//! direct-access random writes through the runtime.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fortio_core::{Completion, Handlers, OpenParams, Runtime, RuntimeConfig};

fn runtime(dir: &std::path::Path) -> Runtime {
    Runtime::new(RuntimeConfig {
        scratch_dir: dir.to_path_buf(),
        ..RuntimeConfig::default()
    })
}

fn bench_sequential(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let rt = runtime(dir.path());
    let params = OpenParams::new().file(dir.path().join("seq.dat")).status("replace");
    rt.open(10, &params, Handlers::NONE).expect("open");
    let opts = rt.statement(Handlers::IOSTAT);

    c.bench_function("sequential_write_100_then_read", |b| {
        b.iter(|| {
            let _ = rt.rewind(10, Handlers::NONE);
            for i in 0..100 {
                let _ = rt.write(10, None, opts, |w| w.write_integer(i));
            }
            let _ = rt.rewind(10, Handlers::NONE);
            let mut sum = 0;
            for _ in 0..100 {
                let value = rt
                    .read(10, None, opts, |r| r.read_integer())
                    .ok()
                    .and_then(Completion::done)
                    .and_then(Result::ok)
                    .and_then(Completion::done);
                sum += value.map_or(0, |t| t.value);
            }
            black_box(sum)
        });
    });
}

fn bench_direct(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let rt = runtime(dir.path());
    let params = OpenParams::new()
        .file(dir.path().join("direct.bin"))
        .status("replace")
        .access("direct")
        .recl(16);
    rt.open(20, &params, Handlers::NONE).expect("open");

    c.bench_function("direct_scattered_write_64", |b| {
        b.iter(|| {
            for i in 0..64usize {
                let rec = (i * 37) % 64 + 1;
                let opts = rt.statement(Handlers::IOSTAT).with_record(rec);
                let _ = rt.write(20, None, opts, |w| w.write_double(rec as f64));
            }
        });
    });
}

criterion_group!(benches, bench_sequential, bench_direct);
criterion_main!(benches);
