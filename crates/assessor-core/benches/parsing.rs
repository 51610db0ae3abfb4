use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use assessor_core::catalog::{parse_catalog_str, validate_catalog};

fn make_catalog(n: usize) -> String {
    let mut s = String::from(
        "[catalog]\nid = \"bench\"\nname = \"Bench Catalog\"\n",
    );
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[questions]]
id = "q{i}"
category = "Category {cat}"
difficulty = "intermediate"
prompt = "Describe technique number {i} and when you would use it."
expected_keyword_phrases = ["technique {i} purpose", "when to use it", "common pitfalls"]
"#,
            cat = i % 4
        ));
    }
    s
}

fn bench_parse_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_catalog");
    let source = PathBuf::from("bench.toml");

    for n in [5usize, 50, 500] {
        let content = make_catalog(n);
        group.bench_function(format!("{n}_questions"), |b| {
            b.iter(|| parse_catalog_str(black_box(&content), &source))
        });
    }

    group.finish();
}

fn bench_validate_catalog(c: &mut Criterion) {
    let catalog = parse_catalog_str(&make_catalog(500), &PathBuf::from("bench.toml"))
        .expect("bench catalog parses");

    c.bench_function("validate_500_questions", |b| {
        b.iter(|| validate_catalog(black_box(&catalog)))
    });
}

criterion_group!(benches, bench_parse_catalog, bench_validate_catalog);
criterion_main!(benches);
