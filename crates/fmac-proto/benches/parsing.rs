//! Benchmarks for control command parsing and TOTP generation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fmac_proto::{ControlCommand, TotpGenerator};

/// Full rule insertion
const ADD_RULE: &str = "add /data/data/com.example.app 10123 1 open";

/// Authorization query
const CHECK: &str = "check /data/data/com.example.app/files/db 10123 unlink";

/// Allowlist update
const ALLOW: &str = "allow 1000,1001,1002,2000,10123,10124,10125";

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Command Parsing");

    for (name, line) in [("add", ADD_RULE), ("check", CHECK), ("allow", ALLOW)] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let cmd: ControlCommand = black_box(line).parse().unwrap();
                black_box(cmd)
            })
        });
    }

    group.finish();
}

fn benchmark_totp(c: &mut Criterion) {
    let totp = TotpGenerator::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");

    c.bench_function("totp_generate", |b| {
        b.iter(|| black_box(totp.generate(black_box(1_234_567_890))))
    });
}

criterion_group!(benches, benchmark_parsing, benchmark_totp);
criterion_main!(benches);
