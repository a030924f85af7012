//! Benchmarks for tool registry projection and lookup.

use askflow::tools::{BuiltIns, ToolSet};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn registry_benchmark(c: &mut Criterion) {
    let builtins = BuiltIns::default();

    c.bench_function("project_builtins", |b| {
        b.iter(|| black_box(builtins.as_function_definitions().count()));
    });

    c.bench_function("build_tool_set", |b| {
        b.iter(|| black_box(builtins.tool_set()));
    });

    let set: ToolSet = match builtins.tool_set() {
        Ok(set) => set,
        Err(err) => panic!("built-in names collide: {err}"),
    };
    c.bench_function("lookup_tool", |b| {
        b.iter(|| black_box(set.get(black_box("__executeCommand")).is_some()));
    });

    c.bench_function("tool_specs", |b| {
        b.iter(|| black_box(set.specs()));
    });
}

criterion_group!(benches, registry_benchmark);
criterion_main!(benches);
