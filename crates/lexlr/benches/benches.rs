use criterion::{criterion_group, criterion_main, Criterion};
use lexlr::{first_sets::FirstSets, grammar::Grammar, lr1::ParseTable, syntax::lexer::Lexer};
use std::{env, path::PathBuf};

criterion_main!(benches);
criterion_group!(benches, bench_tables, bench_lexer);

fn bench_tables(c: &mut Criterion) {
    bench_table_gen(c, "arithmetic");
    bench_table_gen(c, "g1");
    bench_table_gen(c, "g2");
    bench_table_gen(c, "json");
}

fn bench_table_gen(c: &mut Criterion, grammar_name: &str) {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    let grammar =
        Grammar::from_file(project_root.join(format!("tests/{}.lll", grammar_name))).unwrap();

    let mut group = c.benchmark_group(grammar_name);
    group.bench_function("FirstSets", |b| {
        b.iter(|| FirstSets::new(&grammar));
    });
    group.bench_function("Canonical", |b| {
        b.iter(|| ParseTable::generate(&grammar));
    });
    group.finish();
}

fn bench_lexer(c: &mut Criterion) {
    let source = include_str!("../tests/json.lll");

    let mut group = c.benchmark_group("lexer");
    group.bench_function("subset_construction", |b| {
        b.iter(Lexer::new);
    });
    let lexer = Lexer::new().unwrap();
    group.bench_function("tokenize", |b| {
        b.iter(|| lexer.tokenize(source));
    });
    group.finish();
}
