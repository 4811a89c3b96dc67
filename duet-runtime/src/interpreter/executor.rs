// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Execution of interpreted function bodies.
//!
//! The operand stack and locals hold raw 64-bit slots. Values are boxed
//! only where a call leaves the interpreter, where types are known from
//! the callee. Calls between interpreted functions of one instance push a
//! frame onto the executor's own call stack, so nesting is bounded by
//! the depth limit and not by the native stack.

use std::{mem, sync::Arc};

use duet_error::{Error, Result};
use duet_foundation::{FuncType, Value, ValueType, REF_NULL_RAW};
use tracing::trace;

use super::{
    instruction::{BlockType, Instruction, LoadOp, MemArg, StoreOp},
    numeric,
};
use crate::{
    call,
    instance::{CallDepthGuard, Instance},
    memory::Memory,
    module::CompiledBody,
};

#[derive(Debug, Clone, Copy)]
struct Label {
    /// Stack height below the block's parameters
    height:       usize,
    /// Values carried by a branch to this label
    arity:        usize,
    /// Where a branch resumes
    continuation: usize,
    is_loop:      bool,
}

enum Flow {
    Continue,
    Return,
}

/// Activation of one interpreted function
struct Frame<'a> {
    body:   &'a CompiledBody,
    ty:     &'a FuncType,
    locals: Vec<u64>,
    labels: Vec<Label>,
    pc:     usize,
    /// Operand stack height at entry
    base:   usize,
    /// Depth slot; `None` for the outermost frame, whose slot is held by
    /// `Instance::call`
    depth:  Option<CallDepthGuard>,
}

impl<'a> Frame<'a> {
    fn new(
        ty: &'a FuncType,
        body: &'a CompiledBody,
        mut locals: Vec<u64>,
        base: usize,
        depth: Option<CallDepthGuard>,
    ) -> Self {
        locals.extend(
            body.locals()
                .iter()
                .map(|ty| Value::default_for_type(*ty).to_raw()),
        );
        Self {
            body,
            ty,
            locals,
            labels: Vec::new(),
            pc: 0,
            base,
            depth,
        }
    }
}

pub(super) struct Executor<'a> {
    instance: &'a Arc<Instance>,
    memory:   Option<Arc<Memory>>,
    stack:    Vec<u64>,
    frame:    Frame<'a>,
    callers:  Vec<Frame<'a>>,
}

impl<'a> Executor<'a> {
    pub(super) fn new(
        instance: &'a Arc<Instance>,
        ty: &'a FuncType,
        body: &'a CompiledBody,
        args: &[Value],
    ) -> Self {
        let locals = args.iter().map(Value::to_raw).collect();
        Self {
            instance,
            memory: instance.memory(),
            stack: Vec::with_capacity(16),
            frame: Frame::new(ty, body, locals, 0, None),
            callers: Vec::new(),
        }
    }

    pub(super) fn run(mut self) -> Result<Vec<Value>> {
        loop {
            let body = self.frame.body;
            let flow = match body.code().get(self.frame.pc) {
                Some(instruction) => {
                    self.frame.pc += 1;
                    self.step(instruction)?
                }
                None => Flow::Return,
            };
            if let Flow::Return = flow {
                if !self.leave_frame()? {
                    break;
                }
            }
        }
        let ty = self.frame.ty;
        self.pop_values(ty.results())
    }

    /// Drop the finished frame, keeping its results on the stack.
    ///
    /// Returns false once the outermost frame has finished.
    fn leave_frame(&mut self) -> Result<bool> {
        let results = self.pop_n(self.frame.ty.results().len())?;
        self.stack.truncate(self.frame.base);
        self.stack.extend(results);
        match self.callers.pop() {
            Some(caller) => {
                self.frame = caller;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn step(&mut self, instruction: &Instruction) -> Result<Flow> {
        let instance = self.instance;
        let body = self.frame.body;
        let at = self.frame.pc - 1;
        match instruction {
            Instruction::Unreachable => return Err(Error::trap_unreachable()),
            Instruction::Nop => {}
            Instruction::Block(bt) => {
                let (params, results) = self.block_arity(*bt)?;
                let end = body.control().end_of(at)?;
                self.push_label(params, results, end + 1, false)?;
            }
            Instruction::Loop(bt) => {
                let (params, _) = self.block_arity(*bt)?;
                self.push_label(params, params, at + 1, true)?;
            }
            Instruction::If(bt) => {
                let (params, results) = self.block_arity(*bt)?;
                let condition = self.pop_i32()?;
                let end = body.control().end_of(at)?;
                self.push_label(params, results, end + 1, false)?;
                if condition == 0 {
                    self.frame.pc = match body.control().else_of(at) {
                        Some(else_pc) => else_pc + 1,
                        None => end,
                    };
                }
            }
            Instruction::Else => {
                // then-arm finished; skip to the shared end
                self.frame.pc = body.control().end_of(at)?;
            }
            Instruction::End => {
                if self.frame.labels.pop().is_none() {
                    return Ok(Flow::Return);
                }
            }
            Instruction::Br(depth) => return self.branch(*depth),
            Instruction::BrIf(depth) => {
                if self.pop_i32()? != 0 {
                    return self.branch(*depth);
                }
            }
            Instruction::BrTable { targets, default } => {
                let index = self.pop_i32()? as u32 as usize;
                let depth = targets.get(index).copied().unwrap_or(*default);
                return self.branch(depth);
            }
            Instruction::Return => return Ok(Flow::Return),
            Instruction::Call(func_index) => return self.call(instance, *func_index, false),
            Instruction::ReturnCall(func_index) => return self.call(instance, *func_index, true),
            Instruction::CallIndirect(type_index) => return self.call_indirect(*type_index, false),
            Instruction::ReturnCallIndirect(type_index) => {
                return self.call_indirect(*type_index, true);
            }
            Instruction::Drop => {
                self.pop()?;
            }
            Instruction::Select => {
                let condition = self.pop_i32()?;
                let second = self.pop()?;
                let first = self.pop()?;
                self.stack.push(if condition != 0 { first } else { second });
            }
            Instruction::LocalGet(idx) => {
                let value = *self.local(*idx)?;
                self.stack.push(value);
            }
            Instruction::LocalSet(idx) => {
                let value = self.pop()?;
                *self.local(*idx)? = value;
            }
            Instruction::LocalTee(idx) => {
                let value = self.peek()?;
                *self.local(*idx)? = value;
            }
            Instruction::GlobalGet(idx) => {
                let value = instance.global(*idx)?.get()?;
                self.stack.push(value.to_raw());
            }
            Instruction::GlobalSet(idx) => {
                let global = instance.global(*idx)?;
                let raw = self.pop()?;
                global.set(Value::from_raw(global.ty().value_type, raw))?;
            }
            Instruction::Load(op, memarg) => self.load(*op, *memarg)?,
            Instruction::Store(op, memarg) => self.store(*op, *memarg)?,
            Instruction::MemorySize => {
                let pages = self.memory()?.pages()?;
                self.push_i32(pages as i32);
            }
            Instruction::MemoryGrow => {
                let delta = self.pop_i32()? as u32;
                let previous = self.memory()?.grow(delta)?;
                self.push_i32(previous.map_or(-1, |pages| pages as i32));
            }
            Instruction::I32Const(v) => self.push_i32(*v),
            Instruction::I64Const(v) => self.stack.push(*v as u64),
            Instruction::F32Const(v) => self.stack.push(u64::from(v.to_bits())),
            Instruction::F64Const(v) => self.stack.push(v.to_bits()),
            Instruction::RefNull(_) => self.stack.push(REF_NULL_RAW),
            Instruction::RefIsNull => {
                let raw = self.pop()?;
                self.push_i32(i32::from(raw == REF_NULL_RAW));
            }
            Instruction::RefFunc(func_index) => self.stack.push(u64::from(*func_index)),
            Instruction::I32Eqz => {
                let a = self.pop_i32()?;
                self.push_i32(i32::from(a == 0));
            }
            Instruction::I64Eqz => {
                let a = self.pop()? as i64;
                self.push_i32(i32::from(a == 0));
            }
            Instruction::I32Unary(op) => {
                let a = self.pop_i32()?;
                self.push_i32(numeric::i32_unary(*op, a)?);
            }
            Instruction::I64Unary(op) => {
                let a = self.pop()? as i64;
                self.stack.push(numeric::i64_unary(*op, a)? as u64);
            }
            Instruction::I32Binary(op) => {
                let b = self.pop_i32()?;
                let a = self.pop_i32()?;
                self.push_i32(numeric::i32_binary(*op, a, b)?);
            }
            Instruction::I64Binary(op) => {
                let b = self.pop()? as i64;
                let a = self.pop()? as i64;
                self.stack.push(numeric::i64_binary(*op, a, b)? as u64);
            }
            Instruction::I32Compare(op) => {
                let b = self.pop_i32()?;
                let a = self.pop_i32()?;
                self.push_i32(i32::from(numeric::i32_compare(*op, a, b)));
            }
            Instruction::I64Compare(op) => {
                let b = self.pop()? as i64;
                let a = self.pop()? as i64;
                self.push_i32(i32::from(numeric::i64_compare(*op, a, b)));
            }
            Instruction::F32Unary(op) => {
                let a = self.pop()? as u32;
                self.stack.push(u64::from(numeric::f32_unary(*op, a)));
            }
            Instruction::F64Unary(op) => {
                let a = self.pop()?;
                self.stack.push(numeric::f64_unary(*op, a));
            }
            Instruction::F32Binary(op) => {
                let b = self.pop()? as u32;
                let a = self.pop()? as u32;
                self.stack.push(u64::from(numeric::f32_binary(*op, a, b)));
            }
            Instruction::F64Binary(op) => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(numeric::f64_binary(*op, a, b));
            }
            Instruction::F32Compare(op) => {
                let b = self.pop()? as u32;
                let a = self.pop()? as u32;
                self.push_i32(i32::from(numeric::f32_compare(*op, a, b)));
            }
            Instruction::F64Compare(op) => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push_i32(i32::from(numeric::f64_compare(*op, a, b)));
            }
            Instruction::Convert(op) => {
                let raw = self.pop()?;
                self.stack.push(numeric::convert(*op, raw)?);
            }
        }
        Ok(Flow::Continue)
    }

    /// Call `func_index` on `target`.
    ///
    /// An interpreted function of this executor's instance gets a new frame,
    /// or replaces the current one in tail position. Anything else leaves
    /// the interpreter through [`Instance::call`].
    fn call(&mut self, target: &Arc<Instance>, func_index: u32, tail: bool) -> Result<Flow> {
        if Arc::ptr_eq(target, self.instance) && target.interprets(func_index) {
            if tail {
                self.replace_frame(func_index)?;
            } else {
                let depth = target.enter_call()?;
                self.push_frame(func_index, depth)?;
            }
            return Ok(Flow::Continue);
        }
        let callee = target.func_type(func_index)?;
        let args = self.pop_values(callee.params())?;
        let results = target.call(func_index, &args)?;
        self.push_values(&results);
        Ok(if tail { Flow::Return } else { Flow::Continue })
    }

    fn call_indirect(&mut self, type_index: u32, tail: bool) -> Result<Flow> {
        let instance = self.instance;
        let expected = instance.module().type_at(type_index)?;
        let element = self.pop_i32()? as u32;
        let entry = call::resolve_indirect(instance, expected, element)?;
        let target = entry.owner.as_ref().unwrap_or(instance);
        self.call(target, entry.func_index, tail)
    }

    fn callee(&self, func_index: u32) -> Result<(&'a FuncType, &'a CompiledBody)> {
        let instance: &'a Arc<Instance> = self.instance;
        let module = instance.module();
        let ty = module.func_type(func_index)?;
        let body = module.body(func_index)?.ok_or(Error::runtime_unsupported_operation(
            "Function has no body to interpret",
        ))?;
        Ok((ty, body))
    }

    fn push_frame(&mut self, func_index: u32, depth: CallDepthGuard) -> Result<()> {
        let (ty, body) = self.callee(func_index)?;
        let args = self.pop_n(ty.params().len())?;
        let frame = Frame::new(ty, body, args, self.stack.len(), Some(depth));
        trace!(func_index, frames = self.callers.len() + 2, "interpreted call");
        self.callers.push(mem::replace(&mut self.frame, frame));
        Ok(())
    }

    /// Reuse the current frame's stack region and depth slot
    fn replace_frame(&mut self, func_index: u32) -> Result<()> {
        self.instance.check_interrupt()?;
        let (ty, body) = self.callee(func_index)?;
        let args = self.pop_n(ty.params().len())?;
        let base = self.frame.base;
        self.stack.truncate(base);
        let depth = self.frame.depth.take();
        trace!(func_index, "interpreted tail call");
        self.frame = Frame::new(ty, body, args, base, depth);
        Ok(())
    }

    fn block_arity(&self, bt: BlockType) -> Result<(usize, usize)> {
        Ok(match bt {
            BlockType::Empty => (0, 0),
            BlockType::Value(_) => (0, 1),
            BlockType::FuncType(type_index) => {
                let ty = self.instance.module().type_at(type_index)?;
                (ty.params().len(), ty.results().len())
            }
        })
    }

    fn push_label(
        &mut self,
        params: usize,
        arity: usize,
        continuation: usize,
        is_loop: bool,
    ) -> Result<()> {
        let height = self
            .stack
            .len()
            .checked_sub(params)
            .ok_or(Error::runtime_stack_underflow("Block parameters missing"))?;
        self.frame.labels.push(Label {
            height,
            arity,
            continuation,
            is_loop,
        });
        Ok(())
    }

    fn branch(&mut self, depth: u32) -> Result<Flow> {
        let depth = depth as usize;
        let labels = self.frame.labels.len();
        if depth >= labels {
            return Ok(Flow::Return);
        }
        let target = labels - 1 - depth;
        let label = self.frame.labels[target];
        let carried = self.pop_n(label.arity)?;
        self.stack.truncate(label.height);
        self.stack.extend(carried);
        self.frame.pc = label.continuation;
        if label.is_loop {
            self.frame.labels.truncate(target + 1);
            self.instance.check_interrupt()?;
        } else {
            self.frame.labels.truncate(target);
        }
        Ok(Flow::Continue)
    }

    fn load(&mut self, op: LoadOp, memarg: MemArg) -> Result<()> {
        let addr = self.effective_address(memarg)?;
        let memory = self.memory()?;
        let raw = match op {
            LoadOp::I32Load => i32::from_le_bytes(memory.load(addr)?) as i64 as u64,
            LoadOp::I64Load => u64::from_le_bytes(memory.load(addr)?),
            LoadOp::F32Load => u64::from(u32::from_le_bytes(memory.load(addr)?)),
            LoadOp::F64Load => u64::from_le_bytes(memory.load(addr)?),
            LoadOp::I32Load8S | LoadOp::I64Load8S => {
                i8::from_le_bytes(memory.load(addr)?) as i64 as u64
            }
            LoadOp::I32Load8U | LoadOp::I64Load8U => u64::from(u8::from_le_bytes(memory.load(addr)?)),
            LoadOp::I32Load16S | LoadOp::I64Load16S => {
                i16::from_le_bytes(memory.load(addr)?) as i64 as u64
            }
            LoadOp::I32Load16U | LoadOp::I64Load16U => {
                u64::from(u16::from_le_bytes(memory.load(addr)?))
            }
            LoadOp::I64Load32S => i32::from_le_bytes(memory.load(addr)?) as i64 as u64,
            LoadOp::I64Load32U => u64::from(u32::from_le_bytes(memory.load(addr)?)),
        };
        self.stack.push(raw);
        Ok(())
    }

    fn store(&mut self, op: StoreOp, memarg: MemArg) -> Result<()> {
        let raw = self.pop()?;
        let addr = self.effective_address(memarg)?;
        let memory = self.memory()?;
        match op {
            StoreOp::I32Store | StoreOp::F32Store | StoreOp::I64Store32 => {
                memory.store(addr, (raw as u32).to_le_bytes())
            }
            StoreOp::I64Store | StoreOp::F64Store => memory.store(addr, raw.to_le_bytes()),
            StoreOp::I32Store8 | StoreOp::I64Store8 => memory.store(addr, (raw as u8).to_le_bytes()),
            StoreOp::I32Store16 | StoreOp::I64Store16 => {
                memory.store(addr, (raw as u16).to_le_bytes())
            }
        }
    }

    fn effective_address(&mut self, memarg: MemArg) -> Result<u64> {
        let base = self.pop_i32()? as u32;
        Ok(u64::from(base) + u64::from(memarg.offset))
    }

    fn memory(&self) -> Result<&Memory> {
        self.memory
            .as_deref()
            .ok_or(Error::memory_not_found("Instance has no memory"))
    }

    fn local(&mut self, idx: u32) -> Result<&mut u64> {
        self.frame
            .locals
            .get_mut(idx as usize)
            .ok_or(Error::runtime_out_of_bounds("Local index out of range"))
    }

    fn push_i32(&mut self, value: i32) {
        self.stack.push(value as i64 as u64);
    }

    fn push_values(&mut self, values: &[Value]) {
        self.stack.extend(values.iter().map(Value::to_raw));
    }

    /// Pop one slot of the current frame
    fn pop(&mut self) -> Result<u64> {
        if self.stack.len() <= self.frame.base {
            return Err(Error::runtime_stack_underflow("Operand stack is empty"));
        }
        self.stack
            .pop()
            .ok_or(Error::runtime_stack_underflow("Operand stack is empty"))
    }

    fn pop_i32(&mut self) -> Result<i32> {
        Ok(self.pop()? as i32)
    }

    fn peek(&self) -> Result<u64> {
        if self.stack.len() <= self.frame.base {
            return Err(Error::runtime_stack_underflow("Operand stack is empty"));
        }
        self.stack
            .last()
            .copied()
            .ok_or(Error::runtime_stack_underflow("Operand stack is empty"))
    }

    /// Pop the top `n` slots, in stack order
    fn pop_n(&mut self, n: usize) -> Result<Vec<u64>> {
        let split = self
            .stack
            .len()
            .checked_sub(n)
            .filter(|split| *split >= self.frame.base)
            .ok_or(Error::runtime_stack_underflow("Too few operands"))?;
        Ok(self.stack.split_off(split))
    }

    fn pop_values(&mut self, kinds: &[ValueType]) -> Result<Vec<Value>> {
        let raw = self.pop_n(kinds.len())?;
        Ok(kinds
            .iter()
            .zip(raw)
            .map(|(kind, raw)| Value::from_raw(*kind, raw))
            .collect())
    }
}
