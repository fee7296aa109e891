use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use structcraft::{builder::LayoutBuilder, model::Model, typemap::TypeMap};

const TYPES: [&str; 4] = ["uint8", "int16_be", "uint32_le", "float64"];

fn gen_model(types: &TypeMap, field_count: usize) -> Arc<Model> {
    let mut b = LayoutBuilder::begin_struct(types);

    for i in 0..field_count {
        let name = format!("f{}", i);
        b.add_field(TYPES[i % TYPES.len()], &[name.as_str()], &[])
            .unwrap();
    }

    b.to_model().unwrap()
}

fn bench_layout_build(c: &mut Criterion) {
    let types = TypeMap::with_primitives().unwrap();

    for &field_count in &[1usize, 10, 50, 100] {
        c.bench_function(&format!("build_{}_fields", field_count), |b| {
            b.iter(|| gen_model(&types, field_count))
        });
    }
}

fn bench_view_access(c: &mut Criterion) {
    let types = TypeMap::with_primitives().unwrap();

    for &field_count in &[10usize, 100] {
        let accessor = gen_model(&types, field_count).create_accessor();
        let names: Vec<String> = (0..field_count).map(|i| format!("f{}", i)).collect();

        // Deterministic but non-trivial pattern
        let mut buf: Vec<u8> = (0..accessor.model().bytesize())
            .map(|i| (i * 31 % 256) as u8)
            .collect();

        c.bench_function(&format!("read_{}_fields", field_count), |b| {
            let view = accessor.bind(&mut buf, 0);
            b.iter(|| {
                for name in &names {
                    let _ = view.get(name).unwrap();
                }
            })
        });

        c.bench_function(&format!("write_{}_fields", field_count), |b| {
            let mut view = accessor.bind(&mut buf, 0);
            b.iter(|| {
                for (i, name) in names.iter().enumerate() {
                    view.set(name, i as u8).unwrap();
                }
            })
        });
    }
}

criterion_group!(benches, bench_layout_build, bench_view_access);
criterion_main!(benches);
