// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Cost of one call through each machine.

use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, Criterion};
use duet::prelude::*;

fn add_module() -> Result<Arc<Module>> {
    let mut builder = Module::builder();
    let add = builder.add_function(
        FuncType::new([ValueType::I32, ValueType::I32], [ValueType::I32]),
        FunctionBody::new(vec![
            Instruction::LocalGet(0),
            Instruction::LocalGet(1),
            Instruction::I32Binary(IntBinaryOp::Add),
            Instruction::End,
        ]),
    );
    builder.export_function("add", add);
    builder.build()
}

fn instances() -> Result<(Arc<Instance>, Arc<Instance>)> {
    let module = add_module()?;
    let compiled = CompiledModule::builder(Arc::clone(&module))
        .function(0, |a: i32, b: i32, _: &ExecutionContext| -> Result<i32> {
            Ok(a.wrapping_add(b))
        })?
        .build()?;
    let aot = duet::instantiate_compiled(&compiled, Imports::new())?;
    let interpreter = duet::instantiate_interpreted(module, Imports::new())?;
    Ok((aot, interpreter))
}

fn benchmark_call(c: &mut Criterion) {
    let (aot, interpreter) = instances().expect("benchmark module instantiates");
    let mut group = c.benchmark_group("call_add");

    for (label, instance) in [("aot", &aot), ("interpreter", &interpreter)] {
        let export = instance.export("add").expect("add is exported");
        group.bench_function(format!("{label}/boxed"), |b| {
            let args = [Value::I32(2), Value::I32(3)];
            b.iter(|| black_box(export.call(black_box(&args))))
        });
        group.bench_function(format!("{label}/native"), |b| {
            b.iter(|| black_box(export.call_native::<(i32, i32), i32>(black_box((2, 3)))))
        });
    }
    group.finish();
}

fn benchmark_registry_lookup(c: &mut Criterion) {
    let module = add_module().expect("benchmark module builds");
    let compiled = CompiledModule::builder(module)
        .function(0, |a: i32, b: i32, _: &ExecutionContext| -> Result<i32> {
            Ok(a.wrapping_add(b))
        })
        .and_then(|builder| builder.build())
        .expect("benchmark module compiles");

    c.bench_function("registry_get", |b| {
        b.iter(|| black_box(compiled.registry().get(black_box(0)).is_ok()))
    });
}

criterion_group!(benches, benchmark_call, benchmark_registry_lookup);
criterion_main!(benches);
