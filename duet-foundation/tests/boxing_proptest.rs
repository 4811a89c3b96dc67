// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Property tests for boxing and the raw slot encoding

use duet_foundation::{ExternRef, FloatBits32, FloatBits64, FuncRef, NativeType, Value, ValueType};
use proptest::prelude::*;

fn round_trip<T: NativeType + PartialEq + core::fmt::Debug>(native: T) {
    let boxed = native.into_value();
    assert_eq!(boxed.value_type(), T::VALUE_TYPE);
    assert_eq!(T::from_value(&boxed), Some(native));
}

proptest! {
    #[test]
    fn integers_round_trip(a in any::<i32>(), b in any::<i64>(), c in any::<u32>(), d in any::<u64>()) {
        round_trip(a);
        round_trip(b);
        round_trip(c);
        round_trip(d);
    }

    #[test]
    fn floats_round_trip_by_bits(bits32 in any::<u32>(), bits64 in any::<u64>()) {
        let f = f32::from_bits(bits32);
        let g = f64::from_bits(bits64);
        let unboxed32 = f32::from_value(&f.into_value()).map(f32::to_bits);
        let unboxed64 = f64::from_value(&g.into_value()).map(f64::to_bits);
        prop_assert_eq!(unboxed32, Some(bits32));
        prop_assert_eq!(unboxed64, Some(bits64));
    }

    #[test]
    fn references_round_trip(idx in proptest::option::of(0u32..u32::MAX)) {
        round_trip(FuncRef(idx));
        round_trip(ExternRef(idx));
    }

    #[test]
    fn raw_slots_round_trip(a in any::<i32>(), b in any::<i64>(), bits32 in any::<u32>(), bits64 in any::<u64>()) {
        for value in [
            Value::I32(a),
            Value::I64(b),
            Value::F32(FloatBits32::from_bits(bits32)),
            Value::F64(FloatBits64::from_bits(bits64)),
        ] {
            prop_assert_eq!(Value::from_raw(value.value_type(), value.to_raw()), value);
        }
    }

    #[test]
    fn i32_slots_are_sign_extended(a in any::<i32>()) {
        prop_assert_eq!(Value::I32(a).to_raw() as i64, i64::from(a));
    }

    #[test]
    fn i32_slot_load_truncates(raw in any::<u64>()) {
        prop_assert_eq!(Value::from_raw(ValueType::I32, raw), Value::I32(raw as u32 as i32));
    }
}
