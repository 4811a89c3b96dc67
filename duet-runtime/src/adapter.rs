// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Adapters between the uniform boxed calling convention and native entry
//! points.
//!
//! An [`Adapter`] turns `(instance, &[Value])` into `Vec<Value>` for one
//! function index. Typed entry points are wrapped through [`IntoAdapter`],
//! implemented once per arity (0 to 8 parameters) for every closure or
//! function whose last parameter is `&ExecutionContext`. The signature is
//! checked against the declared [`FuncType`] when the adapter is built, so
//! the call path only destructures and unboxes.

use std::{fmt, sync::Arc};

use duet_error::{Error, Result};
use duet_foundation::{FuncType, NativeParams, NativeResults, NativeType, Value};

use crate::{context::ExecutionContext, instance::Instance};

type AdapterFn = dyn Fn(&[Value], &ExecutionContext) -> Result<Vec<Value>> + Send + Sync;

/// A callable bridging boxed values to one function's entry point.
///
/// Holds no instance state; the instance is supplied on every call.
#[derive(Clone)]
pub struct Adapter {
    ty:     FuncType,
    invoke: Arc<AdapterFn>,
}

impl Adapter {
    /// Wrap a typed native entry point, checking it against `ty`
    pub fn new<P, R, F>(ty: &FuncType, entry_point: F) -> Result<Self>
    where
        F: IntoAdapter<P, R>,
    {
        entry_point.into_adapter(ty)
    }

    /// Wrap a boxed entry point.
    ///
    /// Arguments are checked against `ty` before the call and results after
    /// it; mismatches raise the argument and result mismatch traps.
    pub fn dynamic<F>(ty: FuncType, entry_point: F) -> Self
    where
        F: Fn(&[Value], &ExecutionContext) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        let expected = ty.clone();
        Self {
            ty,
            invoke: Arc::new(move |args: &[Value], ctx: &ExecutionContext| {
                if !kinds_match(args, expected.params()) {
                    return Err(Error::trap_argument_mismatch());
                }
                let results = entry_point(args, ctx)?;
                if !kinds_match(&results, expected.results()) {
                    return Err(Error::trap_result_mismatch());
                }
                Ok(results)
            }),
        }
    }

    /// Declared type
    pub fn ty(&self) -> &FuncType {
        &self.ty
    }

    /// Run against `instance`, fetching its current memory handle
    pub fn invoke(&self, instance: &Arc<Instance>, args: &[Value]) -> Result<Vec<Value>> {
        let ctx = ExecutionContext::new(instance);
        (self.invoke)(args, &ctx)
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter").field("ty", &self.ty).finish_non_exhaustive()
    }
}

pub(crate) fn kinds_match(values: &[Value], kinds: &[duet_foundation::ValueType]) -> bool {
    values.len() == kinds.len() && values.iter().zip(kinds).all(|(v, k)| v.matches_type(*k))
}

/// Types convertible into an [`Adapter`].
///
/// `Params` is the tuple of native parameter types and `Results` the native
/// return type; both are inferred from the closure or function signature.
pub trait IntoAdapter<Params, Results>: Send + Sync + 'static {
    /// The function type this entry point implements
    fn signature() -> FuncType;

    /// Build the adapter, failing if `ty` disagrees with [`Self::signature`]
    fn into_adapter(self, ty: &FuncType) -> Result<Adapter>;
}

fn check_signature(declared: &FuncType, native: &FuncType) -> Result<()> {
    if declared.params() != native.params() {
        return Err(Error::entry_point_signature_mismatch(
            "Native entry point parameters disagree with the function type",
        ));
    }
    if declared.results() != native.results() {
        return Err(Error::entry_point_signature_mismatch(
            "Native entry point results disagree with the function type",
        ));
    }
    Ok(())
}

macro_rules! impl_into_adapter {
    ($($a:ident $v:ident)*) => {
        impl<F, $($a,)* R> IntoAdapter<($($a,)*), R> for F
        where
            F: Fn($($a,)* &ExecutionContext) -> Result<R> + Send + Sync + 'static,
            $($a: NativeType,)*
            R: NativeResults,
        {
            fn signature() -> FuncType {
                FuncType::new(<($($a,)*) as NativeParams>::param_types(), R::result_types())
            }

            fn into_adapter(self, ty: &FuncType) -> Result<Adapter> {
                check_signature(ty, &<Self as IntoAdapter<($($a,)*), R>>::signature())?;
                Ok(Adapter {
                    ty: ty.clone(),
                    invoke: Arc::new(move |args: &[Value], ctx: &ExecutionContext| {
                        let [$($v),*] = args else {
                            return Err(Error::trap_argument_mismatch());
                        };
                        $(
                            let $v = $a::from_value($v).ok_or(Error::trap_argument_mismatch())?;
                        )*
                        let results = (self)($($v,)* ctx)?;
                        Ok(NativeResults::into_values(results))
                    }),
                })
            }
        }
    };
}

impl_into_adapter!();
impl_into_adapter!(A1 a1);
impl_into_adapter!(A1 a1 A2 a2);
impl_into_adapter!(A1 a1 A2 a2 A3 a3);
impl_into_adapter!(A1 a1 A2 a2 A3 a3 A4 a4);
impl_into_adapter!(A1 a1 A2 a2 A3 a3 A4 a4 A5 a5);
impl_into_adapter!(A1 a1 A2 a2 A3 a3 A4 a4 A5 a5 A6 a6);
impl_into_adapter!(A1 a1 A2 a2 A3 a3 A4 a4 A5 a5 A6 a6 A7 a7);
impl_into_adapter!(A1 a1 A2 a2 A3 a3 A4 a4 A5 a5 A6 a6 A7 a7 A8 a8);
