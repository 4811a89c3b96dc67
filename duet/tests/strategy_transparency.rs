// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! One module, two machines: every export must return the same results and
//! raise the same traps whether it runs compiled or interpreted.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use duet::{codes, prelude::*, FloatBits64};
use proptest::prelude::*;

const DOUBLE: u32 = 0;
const ADD: u32 = 1;
const NOOP: u32 = 2;
const LOAD: u32 = 3;
const DIV: u32 = 4;
const DISPATCH: u32 = 5;
const MIXED: u32 = 6;
const PAIR: u32 = 7;
const FACT: u32 = 8;
const VIA_HOST: u32 = 9;
const TAIL: u32 = 10;

const CALLS: u32 = 0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn binop() -> FuncType {
    FuncType::new([ValueType::I32, ValueType::I32], [ValueType::I32])
}

fn first_i32(values: &[Value]) -> Result<i32> {
    values
        .first()
        .and_then(Value::as_i32)
        .ok_or(Error::trap_result_mismatch())
}

fn first_i64(values: &[Value]) -> Result<i64> {
    values
        .first()
        .and_then(Value::as_i64)
        .ok_or(Error::trap_result_mismatch())
}

fn suite_module() -> Result<Arc<Module>> {
    use duet::prelude::Instruction as I;

    let mut b = Module::builder();
    let double = b.import_function("env", "double", FuncType::new([ValueType::I32], [ValueType::I32]))?;
    b.memory(MemoryType::new(1, None))
        .table(TableType::funcref(3, None));
    let calls = b.global(GlobalType::new(ValueType::I32, true), Value::I32(0));

    let add = b.add_function(
        binop(),
        FunctionBody::new(vec![
            I::LocalGet(0),
            I::LocalGet(1),
            I::I32Binary(IntBinaryOp::Add),
            I::End,
        ]),
    );
    let noop = b.add_function(FuncType::default(), FunctionBody::new(vec![I::End]));
    let load = b.add_function(
        FuncType::new([ValueType::I32], [ValueType::I32]),
        FunctionBody::new(vec![
            I::LocalGet(0),
            I::Load(LoadOp::I32Load, MemArg::default()),
            I::End,
        ]),
    );
    let div = b.add_function(
        binop(),
        FunctionBody::new(vec![
            I::LocalGet(0),
            I::LocalGet(1),
            I::I32Binary(IntBinaryOp::DivS),
            I::End,
        ]),
    );
    let binop_index = b.add_type(binop());
    let dispatch = b.add_function(
        FuncType::new([ValueType::I32, ValueType::I32, ValueType::I32], [ValueType::I32]),
        FunctionBody::with_locals(vec![ValueType::I32], vec![
            I::LocalGet(0),
            I::LocalGet(1),
            I::LocalGet(2),
            I::CallIndirect(binop_index),
            I::LocalSet(3),
            I::I32Const(0),
            I::LocalGet(3),
            I::Store(StoreOp::I32Store, MemArg::default()),
            I::GlobalGet(calls),
            I::I32Const(1),
            I::I32Binary(IntBinaryOp::Add),
            I::GlobalSet(calls),
            I::LocalGet(3),
            I::End,
        ]),
    );
    let mixed = b.add_function(
        FuncType::new([ValueType::I64, ValueType::F64], [ValueType::F64]),
        FunctionBody::new(vec![
            I::LocalGet(0),
            I::Convert(ConversionOp::F64ConvertI64S),
            I::LocalGet(1),
            I::F64Binary(FloatBinaryOp::Mul),
            I::End,
        ]),
    );
    let pair = b.add_function(
        FuncType::new([], [ValueType::I64, ValueType::F32]),
        FunctionBody::new(vec![I::I64Const(7), I::f32_const(1.5), I::End]),
    );
    let fact = b.add_function(
        FuncType::new([ValueType::I64], [ValueType::I64]),
        FunctionBody::new(vec![
            I::LocalGet(0),
            I::I64Eqz,
            I::If(BlockType::Value(ValueType::I64)),
            I::I64Const(1),
            I::Else,
            I::LocalGet(0),
            I::LocalGet(0),
            I::I64Const(1),
            I::I64Binary(IntBinaryOp::Sub),
            I::Call(FACT),
            I::I64Binary(IntBinaryOp::Mul),
            I::End,
            I::End,
        ]),
    );
    let via_host = b.add_function(
        FuncType::new([ValueType::I32], [ValueType::I32]),
        FunctionBody::new(vec![I::LocalGet(0), I::Call(double), I::End]),
    );
    let tail = b.add_function(
        binop(),
        FunctionBody::new(vec![I::LocalGet(1), I::LocalGet(0), I::ReturnCall(add), I::End]),
    );

    b.elements(0, vec![add, noop])
        .export_function("add", add)
        .export_function("noop", noop)
        .export_function("load", load)
        .export_function("div", div)
        .export_function("dispatch", dispatch)
        .export_function("mixed", mixed)
        .export_function("pair", pair)
        .export_function("fact", fact)
        .export_function("via_host", via_host)
        .export_function("tail", tail)
        .export_global("calls", calls)
        .export_memory("memory");
    b.build()
}

/// Native entry points standing in for generated code
fn compile(module: &Arc<Module>) -> Result<Arc<CompiledModule>> {
    compile_only(module, &[ADD, NOOP, LOAD, DIV, DISPATCH, MIXED, PAIR, FACT, VIA_HOST, TAIL])
}

/// Compile only `natives`; every other defined function is interpreted
fn compile_only(module: &Arc<Module>, natives: &[u32]) -> Result<Arc<CompiledModule>> {
    let expected = binop();
    let mut builder = CompiledModule::builder(Arc::clone(module));
    if natives.contains(&ADD) {
        builder = builder.function(ADD, |a: i32, b: i32, _: &ExecutionContext| -> Result<i32> {
            Ok(a.wrapping_add(b))
        })?;
    }
    if natives.contains(&NOOP) {
        builder = builder.function(NOOP, |_: &ExecutionContext| -> Result<()> { Ok(()) })?;
    }
    if natives.contains(&LOAD) {
        builder = builder.function(LOAD, |addr: i32, ctx: &ExecutionContext| -> Result<i32> {
            ctx.memory()?.read_i32(u64::from(addr as u32))
        })?;
    }
    if natives.contains(&DIV) {
        builder = builder.function(DIV, |a: i32, b: i32, _: &ExecutionContext| -> Result<i32> {
            if b == 0 {
                return Err(Error::trap_integer_divide_by_zero());
            }
            a.checked_div(b).ok_or(Error::trap_integer_overflow())
        })?;
    }
    if natives.contains(&DISPATCH) {
        builder = builder.function(
            DISPATCH,
            move |a: i32, b: i32, element: i32, ctx: &ExecutionContext| -> Result<i32> {
                let results =
                    ctx.call_indirect(&expected, element as u32, &[Value::I32(a), Value::I32(b)])?;
                let result = first_i32(&results)?;
                ctx.memory()?.write_i32(0, result)?;
                let calls = ctx.global(CALLS)?.as_i32().unwrap_or_default();
                ctx.set_global(CALLS, Value::I32(calls.wrapping_add(1)))?;
                Ok(result)
            },
        )?;
    }
    if natives.contains(&MIXED) {
        builder = builder.function(MIXED, |x: i64, y: f64, _: &ExecutionContext| -> Result<f64> {
            Ok(x as f64 * y)
        })?;
    }
    if natives.contains(&PAIR) {
        builder = builder.function(PAIR, |_: &ExecutionContext| -> Result<(i64, f32)> { Ok((7, 1.5)) })?;
    }
    if natives.contains(&FACT) {
        builder = builder.function(FACT, |n: i64, ctx: &ExecutionContext| -> Result<i64> {
            if n == 0 {
                return Ok(1);
            }
            let inner = first_i64(&ctx.call(FACT, &[Value::I64(n.wrapping_sub(1))])?)?;
            Ok(n.wrapping_mul(inner))
        })?;
    }
    if natives.contains(&VIA_HOST) {
        builder = builder.function(VIA_HOST, |x: i32, ctx: &ExecutionContext| -> Result<i32> {
            first_i32(&ctx.call(DOUBLE, &[Value::I32(x)])?)
        })?;
    }
    if natives.contains(&TAIL) {
        builder = builder.function(TAIL, |a: i32, b: i32, ctx: &ExecutionContext| -> Result<i32> {
            first_i32(&ctx.call(ADD, &[Value::I32(b), Value::I32(a)])?)
        })?;
    }
    builder.build()
}

fn imports(host_calls: Arc<AtomicU32>) -> Result<Imports> {
    Ok(Imports::new().with_function(HostFunction::wrap(
        "env",
        "double",
        move |x: i32, _: &ExecutionContext| -> Result<i32> {
            host_calls.fetch_add(1, Ordering::SeqCst);
            Ok(x.wrapping_mul(2))
        },
    )?))
}

struct Pair {
    aot:              Arc<Instance>,
    interpreter:      Arc<Instance>,
    aot_host:         Arc<AtomicU32>,
    interpreter_host: Arc<AtomicU32>,
}

impl Pair {
    fn new() -> Result<Self> {
        let module = suite_module()?;
        let compiled = compile(&module)?;
        let aot_host = Arc::new(AtomicU32::new(0));
        let interpreter_host = Arc::new(AtomicU32::new(0));
        Ok(Self {
            aot: duet::instantiate_compiled(&compiled, imports(Arc::clone(&aot_host))?)?,
            interpreter: duet::instantiate_interpreted(
                module,
                imports(Arc::clone(&interpreter_host))?,
            )?,
            aot_host,
            interpreter_host,
        })
    }

    /// Call `name` on both machines and require identical outcomes
    fn call(&self, name: &str, args: &[Value]) -> Result<Vec<Value>> {
        let compiled = self.aot.export(name)?.call(args);
        let interpreted = self.interpreter.export(name)?.call(args);
        assert_eq!(compiled, interpreted, "{name}({args:?}) diverged");
        compiled
    }

    fn memories(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        Ok((
            self.aot.exported_memory("memory")?.snapshot()?,
            self.interpreter.exported_memory("memory")?.snapshot()?,
        ))
    }

    fn globals(&self) -> Result<(Value, Value)> {
        Ok((
            self.aot.exported_global("calls")?.get()?,
            self.interpreter.exported_global("calls")?.get()?,
        ))
    }
}

#[test]
fn machines_report_their_strategy() -> Result<()> {
    let pair = Pair::new()?;
    assert_eq!(pair.aot.strategy(), ExecutionStrategy::Aot);
    assert_eq!(pair.interpreter.strategy(), ExecutionStrategy::Interpreter);
    Ok(())
}

#[test]
fn add_two_and_three() -> Result<()> {
    init_tracing();
    let pair = Pair::new()?;
    assert_eq!(pair.call("add", &[Value::I32(2), Value::I32(3)])?, vec![Value::I32(5)]);
    Ok(())
}

#[test]
fn unit_function_returns_no_values() -> Result<()> {
    let pair = Pair::new()?;
    assert_eq!(pair.call("noop", &[])?, Vec::<Value>::new());
    Ok(())
}

#[test]
fn results_match_declared_arity_and_kinds() -> Result<()> {
    let pair = Pair::new()?;
    for (name, args) in [
        ("add", vec![Value::I32(1), Value::I32(1)]),
        ("noop", vec![]),
        ("mixed", vec![Value::I64(3), Value::f64(0.5)]),
        ("pair", vec![]),
        ("fact", vec![Value::I64(5)]),
    ] {
        let results = pair.call(name, &args)?;
        let declared = pair.aot.export(name)?.ty().results().to_vec();
        let kinds: Vec<ValueType> = results.iter().map(Value::value_type).collect();
        assert_eq!(kinds, declared, "{name}");
    }
    assert_eq!(pair.call("pair", &[])?, vec![Value::I64(7), Value::f32(1.5)]);
    assert_eq!(pair.call("fact", &[Value::I64(10)])?, vec![Value::I64(3_628_800)]);
    Ok(())
}

#[test]
fn out_of_bounds_load_traps_on_both() -> Result<()> {
    init_tracing();
    let pair = Pair::new()?;
    for addr in [65536, 65533, -1] {
        let err = pair.call("load", &[Value::I32(addr)]).unwrap_err();
        assert_eq!(err, Error::trap_out_of_bounds_memory());
        assert!(err.is_trap());
    }
    assert_eq!(pair.call("load", &[Value::I32(65532)])?, vec![Value::I32(0)]);
    Ok(())
}

#[test]
fn arithmetic_traps_match() -> Result<()> {
    let pair = Pair::new()?;
    assert_eq!(
        pair.call("div", &[Value::I32(1), Value::I32(0)]).unwrap_err(),
        Error::trap_integer_divide_by_zero()
    );
    assert_eq!(
        pair.call("div", &[Value::I32(i32::MIN), Value::I32(-1)]).unwrap_err(),
        Error::trap_integer_overflow()
    );
    assert_eq!(pair.call("div", &[Value::I32(-7), Value::I32(2)])?, vec![Value::I32(-3)]);
    Ok(())
}

#[test]
fn failed_indirect_calls_leave_state_unchanged() -> Result<()> {
    init_tracing();
    let pair = Pair::new()?;
    assert_eq!(
        pair.call("dispatch", &[Value::I32(20), Value::I32(22), Value::I32(0)])?,
        vec![Value::I32(42)]
    );
    let memories = pair.memories()?;
    let globals = pair.globals()?;
    assert_eq!(globals, (Value::I32(1), Value::I32(1)));

    for (element, trap) in [
        (1, Error::trap_indirect_call_type_mismatch()),
        (2, Error::trap_uninitialized_element()),
        (3, Error::trap_undefined_element()),
        (-1, Error::trap_undefined_element()),
    ] {
        let err = pair
            .call("dispatch", &[Value::I32(1), Value::I32(2), Value::I32(element)])
            .unwrap_err();
        assert_eq!(err, trap);
        assert_eq!(pair.memories()?, memories);
        assert_eq!(pair.globals()?, globals);
    }
    Ok(())
}

#[test]
fn imports_and_tail_calls_match() -> Result<()> {
    let pair = Pair::new()?;
    assert_eq!(pair.call("via_host", &[Value::I32(21)])?, vec![Value::I32(42)]);
    assert_eq!(pair.aot_host.load(Ordering::SeqCst), 1);
    assert_eq!(pair.interpreter_host.load(Ordering::SeqCst), 1);
    assert_eq!(pair.call("tail", &[Value::I32(3), Value::I32(4)])?, vec![Value::I32(7)]);
    Ok(())
}

#[test]
fn argument_mismatches_trap_on_both() -> Result<()> {
    let pair = Pair::new()?;
    for args in [vec![Value::I32(1)], vec![Value::I64(1), Value::I64(2)], vec![]] {
        assert_eq!(pair.call("add", &args).unwrap_err(), Error::trap_argument_mismatch());
    }
    Ok(())
}

#[test]
fn calls_are_deterministic() -> Result<()> {
    let pair = Pair::new()?;
    let args = [Value::I64(-9), Value::f64(1.25)];
    let first = pair.call("mixed", &args)?;
    assert_eq!(pair.call("mixed", &args)?, first);
    Ok(())
}

#[test]
fn one_registry_serves_instances_on_many_threads() -> Result<()> {
    let module = suite_module()?;
    let compiled = compile(&module)?;
    let instances = (0..4)
        .map(|_| duet::instantiate_compiled(&compiled, imports(Arc::new(AtomicU32::new(0)))?))
        .collect::<Result<Vec<_>>>()?;

    std::thread::scope(|scope| -> Result<()> {
        let workers: Vec<_> = instances
            .iter()
            .enumerate()
            .map(|(n, instance)| {
                scope.spawn(move || -> Result<()> {
                    let add = instance.export("add")?;
                    for i in 0..100 {
                        let sum: i32 = add.call_native((i, n as i32))?;
                        assert_eq!(sum, i + n as i32);
                    }
                    Ok(())
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker panicked")?;
        }
        Ok(())
    })
}

#[test]
fn depth_limit_applies_to_both_machines() -> Result<()> {
    let module = suite_module()?;
    let compiled = compile(&module)?;
    let config = EngineConfig::new().with_max_call_depth(16);
    let aot = Instance::builder(Arc::clone(&module))
        .with_machine(compiled.machine())
        .with_imports(imports(Arc::new(AtomicU32::new(0)))?)
        .with_config(config)
        .build()?;
    let interpreter = Instance::builder(module)
        .with_imports(imports(Arc::new(AtomicU32::new(0)))?)
        .with_config(config)
        .build()?;
    for instance in [aot, interpreter] {
        let fact = instance.export("fact")?;
        assert_eq!(fact.call_native::<(i64,), i64>((10,))?, 3_628_800);
        let err = fact.call_native::<(i64,), i64>((40,)).unwrap_err();
        assert_eq!(err.code, codes::TRAP_CALL_STACK_EXHAUSTED);
    }
    Ok(())
}

#[test]
fn partly_compiled_modules_match_both_machines() -> Result<()> {
    init_tracing();
    let pair = Pair::new()?;
    let module = Arc::clone(pair.interpreter.module());
    let cases = [
        ("add", vec![Value::I32(2), Value::I32(3)]),
        ("noop", vec![]),
        ("load", vec![Value::I32(65536)]),
        ("div", vec![Value::I32(1), Value::I32(0)]),
        ("dispatch", vec![Value::I32(20), Value::I32(22), Value::I32(0)]),
        ("dispatch", vec![Value::I32(1), Value::I32(2), Value::I32(1)]),
        ("dispatch", vec![Value::I32(1), Value::I32(2), Value::I32(2)]),
        ("mixed", vec![Value::I64(3), Value::f64(0.5)]),
        ("pair", vec![]),
        ("fact", vec![Value::I64(10)]),
        ("via_host", vec![Value::I32(21)]),
        ("tail", vec![Value::I32(3), Value::I32(4)]),
    ];
    // native add under interpreted dispatch and tail; native dispatch and
    // tail over interpreted add; the rest split across the two machines
    for natives in [&[ADD][..], &[TAIL, DISPATCH, FACT], &[VIA_HOST, DIV, NOOP, LOAD, MIXED, PAIR]] {
        let compiled = compile_only(&module, natives)?;
        assert!(natives.iter().all(|idx| !compiled.is_interpreted(*idx)));
        assert!(compiled.is_interpreted(if natives.contains(&ADD) { TAIL } else { ADD }));

        let mixed = duet::instantiate_compiled(&compiled, imports(Arc::new(AtomicU32::new(0)))?)?;
        assert_eq!(mixed.strategy(), ExecutionStrategy::Aot);
        for (name, args) in &cases {
            assert_eq!(
                mixed.export(name)?.call(args),
                pair.call(name, args),
                "{name}({args:?}) with natives {natives:?}"
            );
        }
    }
    Ok(())
}

#[test]
fn functions_without_entry_point_or_body_fail_compilation() -> Result<()> {
    let mut b = Module::builder();
    let declared = b.declare_function(binop());
    let module = b.build()?;
    let err = CompiledModule::builder(Arc::clone(&module)).build().unwrap_err();
    assert_eq!(err, Error::unregistered_function());
    assert!(err.is_initialization_error());
    let compiled = CompiledModule::builder(module)
        .function(declared, |a: i32, b: i32, _: &ExecutionContext| -> Result<i32> {
            Ok(a.wrapping_sub(b))
        })?
        .build()?;
    assert!(!compiled.is_interpreted(declared));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn integer_results_agree(a in any::<i32>(), b in any::<i32>()) {
        let pair = Pair::new().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let args = [Value::I32(a), Value::I32(b)];
        let add = pair.call("add", &args);
        prop_assert_eq!(add, Ok(vec![Value::I32(a.wrapping_add(b))]));
        // outcome equality, trap or not, is checked inside `call`
        let _ = pair.call("div", &args);
    }

    #[test]
    fn loads_agree(addr in any::<i32>()) {
        let pair = Pair::new().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let _ = pair.call("load", &[Value::I32(addr)]);
    }

    #[test]
    fn float_results_agree_bitwise(x in any::<i64>(), y_bits in any::<u64>()) {
        let pair = Pair::new().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let y = Value::F64(FloatBits64::from_bits(y_bits));
        let results = pair.call("mixed", &[Value::I64(x), y]);
        prop_assert!(results.is_ok());
    }
}
