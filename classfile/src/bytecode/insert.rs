//! Splices a code fragment into an existing method body. Everything at or after the
//! insertion point moves by the fragment length; jumps, exception ranges, debug tables
//! and stack map frames are relocated so that nothing outside the fragment targets it.

use crate::attribute::code::{
    CodeAttribute, encode_line_numbers, encode_local_variables, parse_line_numbers,
    parse_local_variables,
};
use crate::attribute::stack_map::{
    FrameState, VerificationType, compress_frames, encode_frames, expand_frames, parse_frames,
};
use crate::attribute::{HasAttributes, names};
use crate::bytecode::{i16_at, i32_at, instructions, jump_operands, max_stack};
use crate::constant::pool::ConstantPool;
use crate::error::ConstructionErr;
use tracing_log::log::warn;

pub struct Insertion<'a> {
    pub position: usize,
    pub block: &'a [u8],
    /// Locals live at the end of the block. When set, a frame is recorded there unless
    /// one already exists, so the block may jump to its own end.
    pub join_locals: Option<Vec<VerificationType>>,
}

struct Relocation {
    position: usize,
    len: usize,
}

impl Relocation {
    /// New offset of an instruction start.
    fn start(&self, offset: usize) -> usize {
        if offset < self.position {
            offset
        } else {
            offset + self.len
        }
    }

    /// New offset of an exclusive range end.
    fn end(&self, offset: usize) -> usize {
        if offset > self.position {
            offset + self.len
        } else {
            offset
        }
    }

    fn start_u16(&self, offset: u16) -> u16 {
        self.start(offset as usize) as u16
    }

    fn end_u16(&self, offset: u16) -> u16 {
        self.end(offset as usize) as u16
    }
}

pub fn insert_code(
    code: &mut CodeAttribute,
    cp: &mut ConstantPool,
    initial_locals: &[VerificationType],
    insertion: Insertion<'_>,
) -> Result<(), ConstructionErr> {
    let Insertion {
        position,
        block,
        join_locals,
    } = insertion;
    let reloc = Relocation {
        position,
        len: block.len(),
    };
    let original = code.code.as_slice();

    let mut boundary = position == original.len();
    let mut decoded = Vec::new();
    for insn in instructions(original) {
        let insn = insn?;
        boundary |= insn.offset == position;
        if insn.opcode.is_switch() && insn.offset >= position && reloc.len % 4 != 0 {
            return Err(ConstructionErr::MisalignedSwitch {
                offset: insn.offset,
                gap: reloc.len,
            });
        }
        decoded.push(insn);
    }
    if !boundary {
        return Err(ConstructionErr::InvalidInsertionPoint(position));
    }

    let new_len = original.len() + reloc.len;
    if new_len > u16::MAX as usize {
        return Err(ConstructionErr::CodeTooLarge(new_len));
    }

    let mut patched = Vec::with_capacity(new_len);
    patched.extend_from_slice(&original[..position]);
    patched.extend_from_slice(block);
    patched.extend_from_slice(&original[position..]);

    for insn in &decoded {
        let moved = reloc.start(insn.offset);
        for (operand, width) in jump_operands(original, insn)? {
            let relative = if width == 2 {
                i16_at(original, operand)? as i64
            } else {
                i32_at(original, operand)? as i64
            };
            let target = (insn.offset as i64 + relative) as usize;
            let shifted = reloc.start(target) as i64 - moved as i64;
            let at = moved + (operand - insn.offset);
            if width == 2 {
                let short = i16::try_from(shifted).map_err(|_| ConstructionErr::BranchOffsetOverflow {
                    offset: moved,
                    target: reloc.start(target) as i64,
                })?;
                patched[at..at + 2].copy_from_slice(&short.to_be_bytes());
            } else {
                patched[at..at + 4].copy_from_slice(&(shifted as i32).to_be_bytes());
            }
        }
    }
    code.code = patched;

    for entry in &mut code.exception_table {
        entry.start_pc = reloc.start_u16(entry.start_pc);
        entry.end_pc = reloc.end_u16(entry.end_pc);
        entry.handler_pc = reloc.start_u16(entry.handler_pc);
    }

    let mut has_stack_map = false;
    let join_offset = position + reloc.len;
    for attr in &mut code.attributes {
        let name = attr.name(cp)?.to_string();
        match name.as_str() {
            names::LINE_NUMBER_TABLE => {
                let mut lines = parse_line_numbers(&attr.info)?;
                for line in &mut lines {
                    line.start_pc = reloc.start_u16(line.start_pc);
                }
                attr.info = encode_line_numbers(&lines)?;
            }
            names::LOCAL_VARIABLE_TABLE | names::LOCAL_VARIABLE_TYPE_TABLE => {
                let mut locals = parse_local_variables(&attr.info)?;
                for local in &mut locals {
                    let start = reloc.start(local.start_pc as usize);
                    let end = reloc.end(local.start_pc as usize + local.length as usize);
                    local.start_pc = start as u16;
                    local.length = end.saturating_sub(start) as u16;
                }
                attr.info = encode_local_variables(&locals)?;
            }
            names::STACK_MAP_TABLE => {
                has_stack_map = true;
                let frames = parse_frames(&attr.info)?;
                let mut states = expand_frames(&frames, initial_locals)?;
                for state in &mut states {
                    state.offset = reloc.start(state.offset);
                    relocate_uninitialized(&mut state.locals, &reloc);
                    relocate_uninitialized(&mut state.stack, &reloc);
                }
                if let Some(locals) = &join_locals
                    && !states.iter().any(|s| s.offset == join_offset)
                {
                    let at = states.partition_point(|s| s.offset < join_offset);
                    states.insert(
                        at,
                        FrameState {
                            offset: join_offset,
                            locals: locals.clone(),
                            stack: Vec::new(),
                        },
                    );
                }
                attr.info = encode_frames(&compress_frames(&states, initial_locals))?;
            }
            other => warn!("Leaving code attribute {other} untouched while relocating bytecode"),
        }
    }

    if !has_stack_map && let Some(locals) = join_locals {
        let frame = FrameState {
            offset: join_offset,
            locals,
            stack: Vec::new(),
        };
        let info = encode_frames(&compress_frames(&[frame], initial_locals))?;
        code.set_attribute(cp, names::STACK_MAP_TABLE, info)?;
    }

    let computed = max_stack::compute_max_stack(code, cp)?;
    code.max_stack = code.max_stack.max(computed);
    Ok(())
}

fn relocate_uninitialized(types: &mut [VerificationType], reloc: &Relocation) {
    for ty in types {
        if let VerificationType::Uninitialized(offset) = ty {
            *offset = reloc.start_u16(*offset);
        }
    }
}
