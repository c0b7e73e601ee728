use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use docreg_core::{Container, Document, DocumentSpec, SectionNode};
use docreg_testkit::SAMPLE_MARKUP;

/// A balanced tree of `fanout^depth` leaves.
fn tree(depth: u32, fanout: usize) -> SectionNode {
    if depth == 0 {
        return SectionNode::leaf("lorem ipsum dolor sit amet");
    }
    let children = (0..fanout).map(|_| tree(depth - 1, fanout)).collect();
    SectionNode::Container(Container::section(children).expect("fanout is non-zero"))
}

fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_digest");
    for depth in [1u32, 3, 5] {
        let document = Document::new(vec![tree(depth, 4)]).expect("tree is shallow");
        group.bench_with_input(BenchmarkId::from_parameter(depth), &document, |b, doc| {
            b.iter(|| black_box(doc).digest())
        });
    }
    group.finish();
}

fn bench_markup(c: &mut Criterion) {
    let document = Document::new(vec![tree(4, 4)]).expect("tree is shallow");
    let markup = document.to_markup();

    c.bench_function("parse_sample", |b| {
        b.iter(|| Document::from_markup(black_box(SAMPLE_MARKUP)))
    });
    c.bench_function("parse_256_leaves", |b| {
        b.iter(|| Document::from_markup(black_box(&markup)))
    });
}

fn bench_spec(c: &mut Criterion) {
    let spec = DocumentSpec::builder()
        .description("registered deed")
        .expire_at(1_900_000_000)
        .build()
        .expect("valid spec");
    let encoded = spec.serialize();

    c.bench_function("spec_serialize", |b| b.iter(|| black_box(&spec).serialize()));
    c.bench_function("spec_decode", |b| {
        b.iter(|| DocumentSpec::from_serialized_data(0, black_box(&encoded)))
    });
}

criterion_group!(benches, bench_digest, bench_markup, bench_spec);
criterion_main!(benches);
