// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Structured control flow pre-scan.
//!
//! Run once per body when the module is built. Records where every block,
//! loop and if ends and where each if's else arm starts, so execution never
//! searches for a matching `end`.

use duet_error::{Error, Result};

use super::instruction::Instruction;

const NO_TARGET: u32 = u32::MAX;

/// Matching `else`/`end` positions for every structured instruction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlMap {
    ends:  Vec<u32>,
    elses: Vec<u32>,
}

impl ControlMap {
    /// Position of the `End` closing the block, loop, if or else at `pc`
    pub fn end_of(&self, pc: usize) -> Result<usize> {
        lookup(&self.ends, pc)
    }

    /// Position of the `Else` of the if at `pc`, if it has one
    pub fn else_of(&self, pc: usize) -> Option<usize> {
        lookup(&self.elses, pc).ok()
    }
}

fn lookup(table: &[u32], pc: usize) -> Result<usize> {
    match table.get(pc) {
        Some(&target) if target != NO_TARGET => Ok(target as usize),
        _ => Err(Error::malformed_body("No matching end for structured instruction")),
    }
}

/// Pair every structured instruction with its `else`/`end`.
///
/// The body must close with a final `End` for the function itself, and
/// every branch depth must name an enclosing label.
pub fn analyze(code: &[Instruction]) -> Result<ControlMap> {
    let mut map = ControlMap {
        ends:  vec![NO_TARGET; code.len()],
        elses: vec![NO_TARGET; code.len()],
    };
    // (pc of the opener, pc of its else if seen)
    let mut open: Vec<(usize, Option<usize>)> = Vec::new();
    let mut closed = false;

    for (pc, instruction) in code.iter().enumerate() {
        if closed {
            return Err(Error::malformed_body("Instructions after the end of the function"));
        }
        match instruction {
            Instruction::Block(_) | Instruction::Loop(_) | Instruction::If(_) => {
                open.push((pc, None));
            }
            Instruction::Else => {
                let Some((opener, seen_else)) = open.last_mut() else {
                    return Err(Error::malformed_body("else outside of if"));
                };
                if !matches!(code[*opener], Instruction::If(_)) || seen_else.is_some() {
                    return Err(Error::malformed_body("else without matching if"));
                }
                *seen_else = Some(pc);
                map.elses[*opener] = pc as u32;
            }
            Instruction::End => match open.pop() {
                Some((opener, seen_else)) => {
                    map.ends[opener] = pc as u32;
                    if let Some(else_pc) = seen_else {
                        map.ends[else_pc] = pc as u32;
                    }
                }
                None => closed = true,
            },
            Instruction::Br(depth) | Instruction::BrIf(depth) => {
                check_depth(*depth, open.len())?;
            }
            Instruction::BrTable { targets, default } => {
                for depth in targets.iter().chain(core::iter::once(default)) {
                    check_depth(*depth, open.len())?;
                }
            }
            _ => {}
        }
    }

    if !closed {
        return Err(Error::malformed_body("Function body is not terminated by end"));
    }
    Ok(map)
}

fn check_depth(depth: u32, open_blocks: usize) -> Result<()> {
    // depth == open_blocks targets the function body itself
    if depth as usize > open_blocks {
        return Err(Error::malformed_body("Branch depth exceeds enclosing blocks"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::instruction::BlockType;

    #[test]
    fn pairs_if_else_end() -> Result<()> {
        let code = vec![
            Instruction::I32Const(1),
            Instruction::If(BlockType::Empty),
            Instruction::Nop,
            Instruction::Else,
            Instruction::Nop,
            Instruction::End,
            Instruction::End,
        ];
        let map = analyze(&code)?;
        assert_eq!(map.end_of(1)?, 5);
        assert_eq!(map.else_of(1), Some(3));
        assert_eq!(map.end_of(3)?, 5);
        Ok(())
    }

    #[test]
    fn nested_blocks() -> Result<()> {
        let code = vec![
            Instruction::Block(BlockType::Empty),
            Instruction::Loop(BlockType::Empty),
            Instruction::Br(1),
            Instruction::End,
            Instruction::End,
            Instruction::End,
        ];
        let map = analyze(&code)?;
        assert_eq!(map.end_of(0)?, 4);
        assert_eq!(map.end_of(1)?, 3);
        assert_eq!(map.else_of(0), None);
        Ok(())
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(analyze(&[Instruction::Nop]).is_err());
        assert!(analyze(&[Instruction::Else, Instruction::End]).is_err());
        assert!(analyze(&[Instruction::End, Instruction::Nop]).is_err());
        assert!(analyze(&[Instruction::Br(1), Instruction::End]).is_err());
        assert!(analyze(&[
            Instruction::Block(BlockType::Empty),
            Instruction::Else,
            Instruction::End,
            Instruction::End
        ])
        .is_err());
    }
}
