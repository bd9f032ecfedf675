use criterion::{criterion_group, criterion_main, Criterion};
use engine::eval::{intersect, union};
use engine::{Document, InvertedIndex, Posting, StandardAnalyzer};

fn corpus() -> Vec<Document> {
    let words = ["library", "catalog", "retrieval", "index", "citation", "journal", "science", "survey"];
    (1..=500u32)
        .map(|id| {
            let content: Vec<&str> = (0..40).map(|i| words[(id as usize * 7 + i * 3) % words.len()]).collect();
            Document { id, content: content.join(" "), ..Default::default() }
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let docs = corpus();
    c.bench_function("build_index_500_docs", |b| b.iter(|| InvertedIndex::build(&docs, &StandardAnalyzer)));
}

fn bench_merge(c: &mut Criterion) {
    let a: Vec<Posting> = (0..10_000).step_by(2).map(|doc_id| Posting { doc_id, frequency: 1 }).collect();
    let b: Vec<Posting> = (0..10_000).step_by(3).map(|doc_id| Posting { doc_id, frequency: 1 }).collect();
    c.bench_function("intersect_postings", |bench| bench.iter(|| intersect(&a, &b)));
    c.bench_function("union_postings", |bench| bench.iter(|| union(&a, &b)));
}

criterion_group!(benches, bench_build, bench_merge);
criterion_main!(benches);
