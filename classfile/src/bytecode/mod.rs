//! Bytecode decoding helpers shared by the builder, the inserter and the stack analysis.

use crate::bytecode::opcode::Opcode;
use crate::constant::ConstantInfo;
use crate::constant::pool::ConstantPool;
use crate::error::ClassFormatErr;
use crate::method::CONSTRUCTOR_NAME;
use itertools::Itertools;
use smallvec::SmallVec;
use std::fmt::Write;

pub mod builder;
pub mod insert;
pub mod max_stack;
pub mod opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: Opcode,
    /// Encoded length including operands and switch padding.
    pub len: usize,
}

impl Instruction {
    pub fn next_offset(&self) -> usize {
        self.offset + self.len
    }
}

pub(crate) fn u8_at(code: &[u8], pos: usize) -> Result<u8, ClassFormatErr> {
    code.get(pos)
        .copied()
        .ok_or(ClassFormatErr::TruncatedInstruction { offset: pos })
}

pub(crate) fn u16_at(code: &[u8], pos: usize) -> Result<u16, ClassFormatErr> {
    Ok(u16::from_be_bytes([u8_at(code, pos)?, u8_at(code, pos + 1)?]))
}

pub(crate) fn i16_at(code: &[u8], pos: usize) -> Result<i16, ClassFormatErr> {
    Ok(u16_at(code, pos)? as i16)
}

pub(crate) fn i32_at(code: &[u8], pos: usize) -> Result<i32, ClassFormatErr> {
    Ok(i32::from_be_bytes([
        u8_at(code, pos)?,
        u8_at(code, pos + 1)?,
        u8_at(code, pos + 2)?,
        u8_at(code, pos + 3)?,
    ]))
}

/// Bytes between a switch opcode and its 4-byte aligned operands.
pub fn switch_padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

pub fn decode_at(code: &[u8], offset: usize) -> Result<Instruction, ClassFormatErr> {
    let byte = u8_at(code, offset)?;
    let opcode =
        Opcode::try_from(byte).map_err(|_| ClassFormatErr::InvalidOpcode { offset, opcode: byte })?;
    let len = match opcode.fixed_size() {
        Some(size) => size,
        None => match opcode {
            Opcode::Tableswitch => {
                let base = offset + 1 + switch_padding(offset);
                let low = i32_at(code, base + 4)?;
                let high = i32_at(code, base + 8)?;
                let entries = (high as i64 - low as i64 + 1).max(0) as usize;
                base + 12 + entries * 4 - offset
            }
            Opcode::Lookupswitch => {
                let base = offset + 1 + switch_padding(offset);
                let pairs = i32_at(code, base + 4)?.max(0) as usize;
                base + 8 + pairs * 8 - offset
            }
            _ => {
                let inner = u8_at(code, offset + 1)?;
                if inner == u8::from(Opcode::Iinc) { 6 } else { 4 }
            }
        },
    };
    if offset + len > code.len() {
        return Err(ClassFormatErr::TruncatedInstruction { offset });
    }
    Ok(Instruction {
        offset,
        opcode,
        len,
    })
}

pub struct Instructions<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, ClassFormatErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }
        match decode_at(self.code, self.offset) {
            Ok(insn) => {
                self.offset = insn.next_offset();
                Some(Ok(insn))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

pub fn instructions(code: &[u8]) -> Instructions<'_> {
    Instructions {
        code,
        offset: 0,
        failed: false,
    }
}

/// Position of every relative jump operand in the instruction, with its width in bytes.
/// Offsets are relative to the instruction's opcode.
pub fn jump_operands(code: &[u8], insn: &Instruction) -> Result<SmallVec<[(usize, u8); 2]>, ClassFormatErr> {
    let mut operands = SmallVec::new();
    if insn.opcode.is_short_branch() {
        operands.push((insn.offset + 1, 2));
    } else if insn.opcode.is_wide_branch() {
        operands.push((insn.offset + 1, 4));
    } else if insn.opcode.is_switch() {
        let base = insn.offset + 1 + switch_padding(insn.offset);
        operands.push((base, 4));
        if insn.opcode == Opcode::Tableswitch {
            let low = i32_at(code, base + 4)?;
            let high = i32_at(code, base + 8)?;
            for i in 0..(high as i64 - low as i64 + 1).max(0) as usize {
                operands.push((base + 12 + i * 4, 4));
            }
        } else {
            let pairs = i32_at(code, base + 4)?.max(0) as usize;
            for i in 0..pairs {
                operands.push((base + 8 + i * 8 + 4, 4));
            }
        }
    }
    Ok(operands)
}

pub fn jump_targets(code: &[u8], insn: &Instruction) -> Result<SmallVec<[usize; 2]>, ClassFormatErr> {
    jump_operands(code, insn)?
        .into_iter()
        .map(|(pos, width)| {
            let relative = if width == 2 {
                i16_at(code, pos)? as i64
            } else {
                i32_at(code, pos)? as i64
            };
            let target = insn.offset as i64 + relative;
            if target < 0 || target as usize >= code.len() {
                return Err(ClassFormatErr::TruncatedInstruction { offset: insn.offset });
            }
            Ok(target as usize)
        })
        .collect()
}

/// Offset just past the `invokespecial <init>` that runs the superclass or delegated
/// constructor on `this`. Objects created with `new` before that call are paired with
/// their own `<init>` calls so they are not mistaken for it.
pub fn skip_constructor(code: &[u8], cp: &ConstantPool) -> Result<Option<usize>, ClassFormatErr> {
    let mut pending_news = 0usize;
    for insn in instructions(code) {
        let insn = insn?;
        match insn.opcode {
            Opcode::New => pending_news += 1,
            Opcode::InvokeSpecial => {
                let member = cp.get_member_ref(u16_at(code, insn.offset + 1)?)?;
                if member.name != CONSTRUCTOR_NAME {
                    continue;
                }
                if pending_news == 0 {
                    return Ok(Some(insn.next_offset()));
                }
                pending_news -= 1;
            }
            _ => {}
        }
    }
    Ok(None)
}

fn describe_constant(cp: &ConstantPool, index: u16) -> Result<String, ClassFormatErr> {
    Ok(match cp.get(index)? {
        ConstantInfo::Integer(v) => v.to_string(),
        ConstantInfo::Float(v) => format!("{v}f"),
        ConstantInfo::Long(v) => format!("{v}L"),
        ConstantInfo::Double(v) => format!("{v}d"),
        ConstantInfo::String(utf8) => format!("{:?}", cp.get_utf8(*utf8)?),
        ConstantInfo::Class(_) => cp.get_class_name(index)?.to_string(),
        _ => format!("#{index}"),
    })
}

fn describe_member(cp: &ConstantPool, index: u16) -> Result<String, ClassFormatErr> {
    let member = cp.get_member_ref(index)?;
    Ok(format!(
        "{}.{}:{}",
        member.class_name, member.name, member.descriptor
    ))
}

/// One instruction per line, e.g. `0003: getfield com/example/Foo.count:I`.
pub fn disassemble(code: &[u8], cp: &ConstantPool) -> Result<String, ClassFormatErr> {
    use Opcode::*;
    let mut out = String::new();
    for insn in instructions(code) {
        let insn = insn?;
        let at = insn.offset;
        let operand = match insn.opcode {
            Bipush => Some((u8_at(code, at + 1)? as i8).to_string()),
            Sipush => Some(i16_at(code, at + 1)?.to_string()),
            Ldc => Some(describe_constant(cp, u8_at(code, at + 1)? as u16)?),
            LdcW | Ldc2W => Some(describe_constant(cp, u16_at(code, at + 1)?)?),
            Iload | Lload | Fload | Dload | Aload | Istore | Lstore | Fstore | Dstore | Astore
            | Ret => Some(u8_at(code, at + 1)?.to_string()),
            Iinc => Some(format!(
                "{}, {}",
                u8_at(code, at + 1)?,
                u8_at(code, at + 2)? as i8
            )),
            Getstatic | Putstatic | Getfield | Putfield | InvokeVirtual | InvokeSpecial
            | InvokeStatic | InvokeInterface => Some(describe_member(cp, u16_at(code, at + 1)?)?),
            InvokeDynamic => Some(format!("#{}", u16_at(code, at + 1)?)),
            New | Anewarray | Checkcast | Instanceof => {
                Some(cp.get_class_name(u16_at(code, at + 1)?)?.to_string())
            }
            Multianewarray => Some(format!(
                "{}, {}",
                cp.get_class_name(u16_at(code, at + 1)?)?,
                u8_at(code, at + 3)?
            )),
            Newarray => Some(u8_at(code, at + 1)?.to_string()),
            Wide => {
                let inner = u8_at(code, at + 1)?;
                let inner = Opcode::try_from(inner)
                    .map_err(|_| ClassFormatErr::InvalidOpcode { offset: at + 1, opcode: inner })?;
                let mut text = format!("{} {}", inner.mnemonic(), u16_at(code, at + 2)?);
                if inner == Iinc {
                    write!(text, ", {}", i16_at(code, at + 4)?).ok();
                }
                Some(text)
            }
            op if op.is_switch() => Some(
                jump_targets(code, &insn)?
                    .iter()
                    .map(|target| target.to_string())
                    .join(", "),
            ),
            op if op.is_short_branch() || op.is_wide_branch() => {
                Some(jump_targets(code, &insn)?[0].to_string())
            }
            _ => None,
        };
        let _ = match operand {
            Some(operand) => writeln!(out, "{:04}: {} {}", at, insn.opcode.mnemonic(), operand),
            None => writeln!(out, "{:04}: {}", at, insn.opcode.mnemonic()),
        };
    }
    Ok(out)
}
