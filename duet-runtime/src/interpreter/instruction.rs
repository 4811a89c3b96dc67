// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Decoded instructions executed by the interpreter.
//!
//! Numeric operators are grouped per operand shape (unary, binary,
//! comparison) and parameterised by width, as the execution code is.

use duet_foundation::{FloatBits32, FloatBits64, ValueType};

/// Block signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// No parameters, no results
    Empty,
    /// No parameters, one result
    Value(ValueType),
    /// Parameters and results from a type index
    FuncType(u32),
}

/// Static offset and alignment hint of a memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemArg {
    /// log2 of the alignment; advisory only
    pub align:  u32,
    /// Constant added to the dynamic address
    pub offset: u32,
}

impl MemArg {
    /// Access at `offset` with natural alignment ignored
    pub const fn offset(offset: u32) -> Self {
        Self { align: 0, offset }
    }
}

/// Memory loads, including sign- and zero-extending narrow forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// i32.load
    I32Load,
    /// i64.load
    I64Load,
    /// f32.load
    F32Load,
    /// f64.load
    F64Load,
    /// i32.load8_s
    I32Load8S,
    /// i32.load8_u
    I32Load8U,
    /// i32.load16_s
    I32Load16S,
    /// i32.load16_u
    I32Load16U,
    /// i64.load8_s
    I64Load8S,
    /// i64.load8_u
    I64Load8U,
    /// i64.load16_s
    I64Load16S,
    /// i64.load16_u
    I64Load16U,
    /// i64.load32_s
    I64Load32S,
    /// i64.load32_u
    I64Load32U,
}

/// Memory stores, including truncating narrow forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// i32.store
    I32Store,
    /// i64.store
    I64Store,
    /// f32.store
    F32Store,
    /// f64.store
    F64Store,
    /// i32.store8
    I32Store8,
    /// i32.store16
    I32Store16,
    /// i64.store8
    I64Store8,
    /// i64.store16
    I64Store16,
    /// i64.store32
    I64Store32,
}

/// Integer unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntUnaryOp {
    /// Count leading zeros
    Clz,
    /// Count trailing zeros
    Ctz,
    /// Count set bits
    Popcnt,
    /// Sign-extend the low 8 bits
    Extend8S,
    /// Sign-extend the low 16 bits
    Extend16S,
    /// Sign-extend the low 32 bits (i64 only)
    Extend32S,
}

/// Integer binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum IntBinaryOp {
    Add,
    Sub,
    Mul,
    DivS,
    DivU,
    RemS,
    RemU,
    And,
    Or,
    Xor,
    Shl,
    ShrS,
    ShrU,
    Rotl,
    Rotr,
}

/// Integer comparisons; the result is an i32 boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum IntCompareOp {
    Eq,
    Ne,
    LtS,
    LtU,
    GtS,
    GtU,
    LeS,
    LeU,
    GeS,
    GeU,
}

/// Float unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FloatUnaryOp {
    Abs,
    Neg,
    Ceil,
    Floor,
    Trunc,
    /// Round to nearest, ties to even
    Nearest,
    Sqrt,
}

/// Float binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FloatBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Copysign,
}

/// Float comparisons; the result is an i32 boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FloatCompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// Conversions between numeric kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConversionOp {
    I32WrapI64,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64ExtendI32S,
    I64ExtendI32U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F32DemoteF64,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,
}

/// One instruction of a function body
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Trap unconditionally
    Unreachable,
    /// Do nothing
    Nop,
    /// Start a block; branches jump past its `End`
    Block(BlockType),
    /// Start a loop; branches jump back to its start
    Loop(BlockType),
    /// Pop an i32 and enter the then or else arm
    If(BlockType),
    /// Separates the arms of an `If`
    Else,
    /// Close the innermost block, or the function body
    End,
    /// Branch to the label at the given depth
    Br(u32),
    /// Pop an i32 and branch if it is non-zero
    BrIf(u32),
    /// Pop an i32 and branch to `targets[i]`, or `default` when out of range
    BrTable {
        /// Label depths indexed by operand
        targets: Vec<u32>,
        /// Depth used for out-of-range operands
        default: u32,
    },
    /// Return from the function
    Return,
    /// Call a function by index
    Call(u32),
    /// Pop a table index and call through the table, expecting the type at
    /// the given type index
    CallIndirect(u32),
    /// Call a function and return its results, replacing the current frame
    ReturnCall(u32),
    /// `CallIndirect` in tail position
    ReturnCallIndirect(u32),
    /// Discard the top operand
    Drop,
    /// Pop a condition and choose between two operands
    Select,
    /// Push a local
    LocalGet(u32),
    /// Pop into a local
    LocalSet(u32),
    /// Copy the top operand into a local
    LocalTee(u32),
    /// Push a global
    GlobalGet(u32),
    /// Pop into a mutable global
    GlobalSet(u32),
    /// Load from memory
    Load(LoadOp, MemArg),
    /// Store to memory
    Store(StoreOp, MemArg),
    /// Push the memory size in pages
    MemorySize,
    /// Grow memory; push the previous size or -1
    MemoryGrow,
    /// Push an i32 constant
    I32Const(i32),
    /// Push an i64 constant
    I64Const(i64),
    /// Push an f32 constant
    F32Const(FloatBits32),
    /// Push an f64 constant
    F64Const(FloatBits64),
    /// Push a null reference
    RefNull(ValueType),
    /// Test a reference for null
    RefIsNull,
    /// Push a reference to a function of this instance
    RefFunc(u32),
    /// i32.eqz
    I32Eqz,
    /// i64.eqz
    I64Eqz,
    /// i32 unary operator
    I32Unary(IntUnaryOp),
    /// i64 unary operator
    I64Unary(IntUnaryOp),
    /// i32 binary operator
    I32Binary(IntBinaryOp),
    /// i64 binary operator
    I64Binary(IntBinaryOp),
    /// i32 comparison
    I32Compare(IntCompareOp),
    /// i64 comparison
    I64Compare(IntCompareOp),
    /// f32 unary operator
    F32Unary(FloatUnaryOp),
    /// f64 unary operator
    F64Unary(FloatUnaryOp),
    /// f32 binary operator
    F32Binary(FloatBinaryOp),
    /// f64 binary operator
    F64Binary(FloatBinaryOp),
    /// f32 comparison
    F32Compare(FloatCompareOp),
    /// f64 comparison
    F64Compare(FloatCompareOp),
    /// Numeric conversion
    Convert(ConversionOp),
}

impl Instruction {
    /// `f32.const` from a float
    pub fn f32_const(value: f32) -> Self {
        Self::F32Const(FloatBits32::from_float(value))
    }

    /// `f64.const` from a float
    pub fn f64_const(value: f64) -> Self {
        Self::F64Const(FloatBits64::from_float(value))
    }
}
