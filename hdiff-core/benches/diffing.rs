//! Benchmark for diff engine performance.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hdiff_core::differ::{diff_models, DiffOptions};
use hdiff_core::parser::{parse_source, ParserOptions};
use hdiff_core::types::{DeclarationModel, FieldDecl, FunctionDecl, RecordDecl, RecordKind};

fn synthetic_model(functions: usize, records: usize, shift: usize) -> DeclarationModel {
    let functions = (shift..functions + shift)
        .map(|i| FunctionDecl::new(format!("libvlc_fn_{}", i), "include/vlc/libvlc.h"))
        .collect();

    let records = (0..records)
        .map(|i| {
            let mut union = RecordDecl::new("", RecordKind::Union);
            union.fields = (shift..8 + shift)
                .map(|m| FieldDecl::primitive(&format!("member_{}", m), "int"))
                .collect();
            RecordDecl::new(format!("libvlc_record_{}_t", i), RecordKind::Struct)
                .with_size(16 + (i % 3) as u64 * shift as u64)
                .with_field(FieldDecl::primitive("type", "int"))
                .with_field(FieldDecl::nested("u", union))
        })
        .collect();

    DeclarationModel::new(functions, records)
}

fn bench_diff_identical(c: &mut Criterion) {
    let model = synthetic_model(2000, 300, 0);
    let options = DiffOptions::default();

    c.bench_function("diff_identical_models", |b| {
        b.iter(|| diff_models(black_box(&model), black_box(&model), &options))
    });
}

fn bench_diff_shifted(c: &mut Criterion) {
    let old = synthetic_model(2000, 300, 0);
    let new = synthetic_model(2000, 300, 4);
    let options = DiffOptions::default();

    c.bench_function("diff_shifted_models", |b| {
        b.iter(|| diff_models(black_box(&old), black_box(&new), &options))
    });
}

fn bench_parse_header(c: &mut Criterion) {
    let source: String = (0..200)
        .map(|i| {
            format!(
                "/** Function {i} */\nLIBVLC_API int libvlc_fn_{i}(libvlc_instance_t *p, int x);\n\
                 typedef struct libvlc_rec_{i}_t {{ int a; void *b; char name[16]; }} libvlc_rec_{i}_t;\n"
            )
        })
        .collect();
    let options = ParserOptions::default();

    c.bench_function("parse_header_200_decls", |b| {
        b.iter(|| parse_source(black_box(&source), "include/vlc/libvlc.h", &options))
    });
}

criterion_group!(benches, bench_diff_identical, bench_diff_shifted, bench_parse_header);
criterion_main!(benches);
