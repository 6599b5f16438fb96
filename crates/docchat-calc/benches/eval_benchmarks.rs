//! Benchmarks for the calculator evaluator.
//!
//! Covers the expressions a chat message typically carries, plus a flat sum
//! near the operator limit, parentheses near the depth limit and
//! integers wider than 64 bits.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use docchat_calc::{evaluate, MAX_DEPTH, MAX_OPERATORS};

/// Build a flat sum of `terms` alternating int and float operands.
fn long_sum(terms: usize) -> String {
    (0..terms)
        .map(|i| {
            if i % 2 == 0 {
                i.to_string()
            } else {
                format!("{}.5", i)
            }
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

fn bench_typical_expressions(c: &mut Criterion) {
    let mut group = c.benchmark_group("typical");
    group.measurement_time(Duration::from_secs(5));

    for expr in ["12 * (3 + 4)", "2 ** 10", "-5 + 3", "7 % 2", "(1.5 + 2.25) / 3"] {
        group.bench_function(expr, |b| {
            b.iter(|| evaluate(black_box(expr)).expect("evaluate failed"));
        });
    }

    group.finish();
}

fn bench_large_inputs(c: &mut Criterion) {
    let mut group = c.benchmark_group("large");
    group.measurement_time(Duration::from_secs(5));

    let sum = long_sum(MAX_OPERATORS);
    group.bench_function("flat_sum", |b| {
        b.iter(|| evaluate(black_box(&sum)).expect("evaluate failed"));
    });

    let levels = MAX_DEPTH - 1;
    let nested = format!("{}1{}", "(".repeat(levels), ")".repeat(levels));
    group.bench_function("nested_parentheses", |b| {
        b.iter(|| evaluate(black_box(&nested)).expect("evaluate failed"));
    });

    group.bench_function("big_integer_power", |b| {
        b.iter(|| evaluate(black_box("7 ** 2000 % 1000003")).expect("evaluate failed"));
    });

    group.finish();
}

fn bench_rejections(c: &mut Criterion) {
    let mut group = c.benchmark_group("rejections");

    group.bench_function("function_call", |b| {
        b.iter(|| evaluate(black_box("__import__('os').system('ls')")).unwrap_err());
    });
    group.bench_function("syntax_error", |b| {
        b.iter(|| evaluate(black_box("1 + * 2")).unwrap_err());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_typical_expressions,
    bench_large_inputs,
    bench_rejections
);
criterion_main!(benches);
