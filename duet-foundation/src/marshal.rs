// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Boxing and unboxing between [`Value`] and native Rust types.
//!
//! [`NativeType`] covers single operands. [`NativeParams`] and
//! [`NativeResults`] lift it to parameter and result lists so that typed
//! entry points can describe their own signature at compile time.

use alloc::{vec, vec::Vec};

use crate::{
    float_repr::{FloatBits32, FloatBits64},
    types::ValueType,
    values::Value,
};

/// A native Rust type with a fixed WebAssembly operand kind.
pub trait NativeType: Copy + Send + Sync + 'static {
    /// The operand kind this type boxes to
    const VALUE_TYPE: ValueType;

    /// Unbox, returning `None` if the tag does not match
    fn from_value(value: &Value) -> Option<Self>;

    /// Box into a tagged value
    fn into_value(self) -> Value;
}

/// A nullable function reference in native form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FuncRef(pub Option<u32>);

/// A nullable external reference in native form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ExternRef(pub Option<u32>);

impl NativeType for i32 {
    const VALUE_TYPE: ValueType = ValueType::I32;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i32()
    }

    fn into_value(self) -> Value {
        Value::I32(self)
    }
}

impl NativeType for u32 {
    const VALUE_TYPE: ValueType = ValueType::I32;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i32().map(|v| v as u32)
    }

    fn into_value(self) -> Value {
        Value::I32(self as i32)
    }
}

impl NativeType for i64 {
    const VALUE_TYPE: ValueType = ValueType::I64;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn into_value(self) -> Value {
        Value::I64(self)
    }
}

impl NativeType for u64 {
    const VALUE_TYPE: ValueType = ValueType::I64;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().map(|v| v as u64)
    }

    fn into_value(self) -> Value {
        Value::I64(self as i64)
    }
}

impl NativeType for f32 {
    const VALUE_TYPE: ValueType = ValueType::F32;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f32()
    }

    fn into_value(self) -> Value {
        Value::F32(FloatBits32::from_float(self))
    }
}

impl NativeType for f64 {
    const VALUE_TYPE: ValueType = ValueType::F64;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn into_value(self) -> Value {
        Value::F64(FloatBits64::from_float(self))
    }
}

impl NativeType for FuncRef {
    const VALUE_TYPE: ValueType = ValueType::FuncRef;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_func_ref().map(FuncRef)
    }

    fn into_value(self) -> Value {
        Value::FuncRef(self.0)
    }
}

impl NativeType for ExternRef {
    const VALUE_TYPE: ValueType = ValueType::ExternRef;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_extern_ref().map(ExternRef)
    }

    fn into_value(self) -> Value {
        Value::ExternRef(self.0)
    }
}

/// A native parameter list: a tuple of zero to eight [`NativeType`]s.
pub trait NativeParams: Sized {
    /// Parameter kinds in order
    fn param_types() -> Vec<ValueType>;

    /// Box every parameter in order
    fn into_values(self) -> Vec<Value>;
}

/// A native result list: `()`, a single [`NativeType`], or a tuple of two to
/// four of them.
pub trait NativeResults: Sized {
    /// Result kinds in order
    fn result_types() -> Vec<ValueType>;

    /// Box every result in order
    fn into_values(self) -> Vec<Value>;

    /// Unbox a result list, `None` on arity or tag mismatch
    fn from_values(values: &[Value]) -> Option<Self>;
}

macro_rules! impl_native_params {
    ($($t:ident $v:ident)*) => {
        impl<$($t: NativeType),*> NativeParams for ($($t,)*) {
            fn param_types() -> Vec<ValueType> {
                vec![$($t::VALUE_TYPE),*]
            }

            #[allow(clippy::unused_unit)]
            fn into_values(self) -> Vec<Value> {
                let ($($v,)*) = self;
                vec![$($v.into_value()),*]
            }
        }
    };
}

impl_native_params!();
impl_native_params!(A1 a1);
impl_native_params!(A1 a1 A2 a2);
impl_native_params!(A1 a1 A2 a2 A3 a3);
impl_native_params!(A1 a1 A2 a2 A3 a3 A4 a4);
impl_native_params!(A1 a1 A2 a2 A3 a3 A4 a4 A5 a5);
impl_native_params!(A1 a1 A2 a2 A3 a3 A4 a4 A5 a5 A6 a6);
impl_native_params!(A1 a1 A2 a2 A3 a3 A4 a4 A5 a5 A6 a6 A7 a7);
impl_native_params!(A1 a1 A2 a2 A3 a3 A4 a4 A5 a5 A6 a6 A7 a7 A8 a8);

impl NativeResults for () {
    fn result_types() -> Vec<ValueType> {
        Vec::new()
    }

    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }

    fn from_values(values: &[Value]) -> Option<Self> {
        values.is_empty().then_some(())
    }
}

macro_rules! impl_scalar_results {
    ($($t:ty)*) => {$(
        impl NativeResults for $t {
            fn result_types() -> Vec<ValueType> {
                vec![<$t as NativeType>::VALUE_TYPE]
            }

            fn into_values(self) -> Vec<Value> {
                vec![self.into_value()]
            }

            fn from_values(values: &[Value]) -> Option<Self> {
                match values {
                    [single] => <$t as NativeType>::from_value(single),
                    _ => None,
                }
            }
        }
    )*};
}

impl_scalar_results!(i32 u32 i64 u64 f32 f64 FuncRef ExternRef);

macro_rules! impl_tuple_results {
    ($($t:ident $v:ident)*) => {
        impl<$($t: NativeType),*> NativeResults for ($($t,)*) {
            fn result_types() -> Vec<ValueType> {
                vec![$($t::VALUE_TYPE),*]
            }

            fn into_values(self) -> Vec<Value> {
                let ($($v,)*) = self;
                vec![$($v.into_value()),*]
            }

            fn from_values(values: &[Value]) -> Option<Self> {
                match values {
                    [$($v),*] => Some(($($t::from_value($v)?,)*)),
                    _ => None,
                }
            }
        }
    };
}

impl_tuple_results!(R1 r1 R2 r2);
impl_tuple_results!(R1 r1 R2 r2 R3 r3);
impl_tuple_results!(R1 r1 R2 r2 R3 r3 R4 r4);
