//! `StackMapTable` frames. Frames are expanded to absolute states for editing and
//! compressed back into the smallest encoding when written.

use crate::attribute::write_count;
use crate::constant::pool::ConstantPool;
use crate::error::{ClassFormatErr, ConstructionErr};
use byteorder::{BigEndian, WriteBytesExt};
use hotfield_common::descriptor::MethodDescriptor;
use hotfield_common::jtype::{JavaType, PrimitiveType};
use hotfield_common::utils::cursor::ByteCursor;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// Class constant index.
    Object(u16),
    /// Offset of the `new` instruction that created the value.
    Uninitialized(u16),
}

impl VerificationType {
    fn parse(cursor: &mut ByteCursor) -> Result<Self, ClassFormatErr> {
        Ok(match cursor.u8()? {
            0 => VerificationType::Top,
            1 => VerificationType::Integer,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            4 => VerificationType::Long,
            5 => VerificationType::Null,
            6 => VerificationType::UninitializedThis,
            7 => VerificationType::Object(cursor.u16()?),
            8 => VerificationType::Uninitialized(cursor.u16()?),
            other => return Err(ClassFormatErr::InvalidVerificationType(other)),
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), ConstructionErr> {
        match self {
            VerificationType::Top => out.write_u8(0)?,
            VerificationType::Integer => out.write_u8(1)?,
            VerificationType::Float => out.write_u8(2)?,
            VerificationType::Double => out.write_u8(3)?,
            VerificationType::Long => out.write_u8(4)?,
            VerificationType::Null => out.write_u8(5)?,
            VerificationType::UninitializedThis => out.write_u8(6)?,
            VerificationType::Object(index) => {
                out.write_u8(7)?;
                out.write_u16::<BigEndian>(*index)?;
            }
            VerificationType::Uninitialized(offset) => {
                out.write_u8(8)?;
                out.write_u16::<BigEndian>(*offset)?;
            }
        }
        Ok(())
    }

    /// Verifier type of a value of `ty` held in a local or on the stack.
    pub fn for_type(ty: &JavaType, cp: &mut ConstantPool) -> Result<Self, ConstructionErr> {
        Ok(match ty {
            JavaType::Primitive(PrimitiveType::Long) => VerificationType::Long,
            JavaType::Primitive(PrimitiveType::Double) => VerificationType::Double,
            JavaType::Primitive(PrimitiveType::Float) => VerificationType::Float,
            JavaType::Primitive(_) => VerificationType::Integer,
            reference => match reference.class_entry_name() {
                Some(name) => VerificationType::Object(cp.add_class(&name)?),
                None => VerificationType::Top,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMapFrame {
    Same {
        offset_delta: u16,
    },
    SameLocals1StackItem {
        offset_delta: u16,
        stack: VerificationType,
    },
    Chop {
        offset_delta: u16,
        k: u8,
    },
    Append {
        offset_delta: u16,
        locals: SmallVec<[VerificationType; 3]>,
    },
    Full {
        offset_delta: u16,
        locals: Vec<VerificationType>,
        stack: Vec<VerificationType>,
    },
}

impl StackMapFrame {
    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::Same { offset_delta }
            | StackMapFrame::SameLocals1StackItem { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }

    fn parse(cursor: &mut ByteCursor) -> Result<Self, ClassFormatErr> {
        let frame_type = cursor.u8()?;
        Ok(match frame_type {
            0..=63 => StackMapFrame::Same {
                offset_delta: frame_type as u16,
            },
            64..=127 => StackMapFrame::SameLocals1StackItem {
                offset_delta: (frame_type - 64) as u16,
                stack: VerificationType::parse(cursor)?,
            },
            247 => StackMapFrame::SameLocals1StackItem {
                offset_delta: cursor.u16()?,
                stack: VerificationType::parse(cursor)?,
            },
            248..=250 => StackMapFrame::Chop {
                offset_delta: cursor.u16()?,
                k: 251 - frame_type,
            },
            251 => StackMapFrame::Same {
                offset_delta: cursor.u16()?,
            },
            252..=254 => {
                let offset_delta = cursor.u16()?;
                let mut locals = SmallVec::new();
                for _ in 0..(frame_type - 251) {
                    locals.push(VerificationType::parse(cursor)?);
                }
                StackMapFrame::Append {
                    offset_delta,
                    locals,
                }
            }
            255 => {
                let offset_delta = cursor.u16()?;
                let locals_count = cursor.u16()?;
                let locals = (0..locals_count)
                    .map(|_| VerificationType::parse(cursor))
                    .collect::<Result<_, _>>()?;
                let stack_count = cursor.u16()?;
                let stack = (0..stack_count)
                    .map(|_| VerificationType::parse(cursor))
                    .collect::<Result<_, _>>()?;
                StackMapFrame::Full {
                    offset_delta,
                    locals,
                    stack,
                }
            }
            other => return Err(ClassFormatErr::InvalidStackMapFrameType(other)),
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<(), ConstructionErr> {
        match self {
            StackMapFrame::Same { offset_delta } if *offset_delta <= 63 => {
                out.write_u8(*offset_delta as u8)?;
            }
            StackMapFrame::Same { offset_delta } => {
                out.write_u8(251)?;
                out.write_u16::<BigEndian>(*offset_delta)?;
            }
            StackMapFrame::SameLocals1StackItem {
                offset_delta,
                stack,
            } => {
                if *offset_delta <= 63 {
                    out.write_u8(64 + *offset_delta as u8)?;
                } else {
                    out.write_u8(247)?;
                    out.write_u16::<BigEndian>(*offset_delta)?;
                }
                stack.write(out)?;
            }
            StackMapFrame::Chop { offset_delta, k } => {
                out.write_u8(251 - k)?;
                out.write_u16::<BigEndian>(*offset_delta)?;
            }
            StackMapFrame::Append {
                offset_delta,
                locals,
            } => {
                out.write_u8(251 + locals.len() as u8)?;
                out.write_u16::<BigEndian>(*offset_delta)?;
                for local in locals {
                    local.write(out)?;
                }
            }
            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            } => {
                out.write_u8(255)?;
                out.write_u16::<BigEndian>(*offset_delta)?;
                write_count(out, locals.len(), "frame locals")?;
                for local in locals {
                    local.write(out)?;
                }
                write_count(out, stack.len(), "frame stack items")?;
                for item in stack {
                    item.write(out)?;
                }
            }
        }
        Ok(())
    }
}

pub fn parse_frames(info: &[u8]) -> Result<Vec<StackMapFrame>, ClassFormatErr> {
    let mut cursor = ByteCursor::new(info);
    let count = cursor.u16()?;
    let frames = (0..count)
        .map(|_| StackMapFrame::parse(&mut cursor))
        .collect::<Result<Vec<_>, _>>()?;
    if !cursor.is_empty() {
        return Err(ClassFormatErr::TrailingBytes {
            attribute: "StackMapTable",
            remaining: cursor.remaining(),
        });
    }
    Ok(frames)
}

pub fn encode_frames(frames: &[StackMapFrame]) -> Result<Vec<u8>, ConstructionErr> {
    let mut out = Vec::new();
    write_count(&mut out, frames.len(), "stack map frames")?;
    for frame in frames {
        frame.write(&mut out)?;
    }
    Ok(out)
}

/// Verifier state at one bytecode offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameState {
    pub offset: usize,
    pub locals: Vec<VerificationType>,
    pub stack: Vec<VerificationType>,
}

/// Locals the verifier assumes on method entry.
pub fn initial_locals(
    cp: &mut ConstantPool,
    this_class: u16,
    is_static: bool,
    is_constructor: bool,
    descriptor: &MethodDescriptor,
) -> Result<Vec<VerificationType>, ConstructionErr> {
    let mut locals = Vec::with_capacity(descriptor.param_count() + 1);
    if !is_static {
        locals.push(if is_constructor {
            VerificationType::UninitializedThis
        } else {
            VerificationType::Object(this_class)
        });
    }
    for param in &descriptor.params {
        locals.push(VerificationType::for_type(param, cp)?);
    }
    Ok(locals)
}

/// Resolves every frame's delta against its predecessor.
pub fn expand_frames(
    frames: &[StackMapFrame],
    initial_locals: &[VerificationType],
) -> Result<Vec<FrameState>, ClassFormatErr> {
    let mut states: Vec<FrameState> = Vec::with_capacity(frames.len());
    let mut locals = initial_locals.to_vec();
    for (index, frame) in frames.iter().enumerate() {
        let offset = match states.last() {
            None => frame.offset_delta() as usize,
            Some(previous) => previous.offset + frame.offset_delta() as usize + 1,
        };
        let stack = match frame {
            StackMapFrame::Same { .. } => Vec::new(),
            StackMapFrame::SameLocals1StackItem { stack, .. } => vec![*stack],
            StackMapFrame::Chop { k, .. } => {
                let k = *k as usize;
                if k > locals.len() {
                    return Err(ClassFormatErr::ChopBelowLocals { frame: index });
                }
                locals.truncate(locals.len() - k);
                Vec::new()
            }
            StackMapFrame::Append { locals: added, .. } => {
                locals.extend(added.iter().copied());
                Vec::new()
            }
            StackMapFrame::Full {
                locals: full,
                stack,
                ..
            } => {
                locals = full.clone();
                stack.clone()
            }
        };
        states.push(FrameState {
            offset,
            locals: locals.clone(),
            stack,
        });
    }
    Ok(states)
}

/// Encodes sorted states using the most compact frame type for each step.
pub fn compress_frames(
    states: &[FrameState],
    initial_locals: &[VerificationType],
) -> Vec<StackMapFrame> {
    let mut frames = Vec::with_capacity(states.len());
    let mut previous_locals = initial_locals;
    let mut previous_offset: Option<usize> = None;
    for state in states {
        let offset_delta = match previous_offset {
            None => state.offset,
            Some(prev) => state.offset - prev - 1,
        } as u16;
        let locals = state.locals.as_slice();
        let frame = if locals == previous_locals && state.stack.is_empty() {
            StackMapFrame::Same { offset_delta }
        } else if locals == previous_locals && state.stack.len() == 1 {
            StackMapFrame::SameLocals1StackItem {
                offset_delta,
                stack: state.stack[0],
            }
        } else if state.stack.is_empty()
            && locals.len() < previous_locals.len()
            && previous_locals.len() - locals.len() <= 3
            && previous_locals.starts_with(locals)
        {
            StackMapFrame::Chop {
                offset_delta,
                k: (previous_locals.len() - locals.len()) as u8,
            }
        } else if state.stack.is_empty()
            && locals.len() > previous_locals.len()
            && locals.len() - previous_locals.len() <= 3
            && locals.starts_with(previous_locals)
        {
            StackMapFrame::Append {
                offset_delta,
                locals: locals[previous_locals.len()..].iter().copied().collect(),
            }
        } else {
            StackMapFrame::Full {
                offset_delta,
                locals: state.locals.clone(),
                stack: state.stack.clone(),
            }
        };
        frames.push(frame);
        previous_locals = locals;
        previous_offset = Some(state.offset);
    }
    frames
}
