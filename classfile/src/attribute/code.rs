use crate::attribute::{AttributeInfo, HasAttributes, write_count};
use crate::error::{ClassFormatErr, ConstructionErr};
use byteorder::{BigEndian, WriteBytesExt};
use hotfield_common::utils::cursor::ByteCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Zero for `finally` handlers.
    pub catch_type: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn parse(info: &[u8]) -> Result<Self, ClassFormatErr> {
        let mut cursor = ByteCursor::new(info);
        let max_stack = cursor.u16()?;
        let max_locals = cursor.u16()?;
        let code = cursor.u32_prefixed()?.to_vec();
        let exception_count = cursor.u16()?;
        let mut exception_table = Vec::with_capacity(exception_count as usize);
        for _ in 0..exception_count {
            exception_table.push(ExceptionTableEntry {
                start_pc: cursor.u16()?,
                end_pc: cursor.u16()?,
                handler_pc: cursor.u16()?,
                catch_type: cursor.u16()?,
            });
        }
        let attributes = AttributeInfo::parse_list(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(ClassFormatErr::TrailingBytes {
                attribute: "Code",
                remaining: cursor.remaining(),
            });
        }
        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ConstructionErr> {
        if self.code.len() > u16::MAX as usize {
            return Err(ConstructionErr::CodeTooLarge(self.code.len()));
        }
        let mut out = Vec::with_capacity(self.code.len() + 32);
        out.write_u16::<BigEndian>(self.max_stack)?;
        out.write_u16::<BigEndian>(self.max_locals)?;
        out.write_u32::<BigEndian>(self.code.len() as u32)?;
        out.extend_from_slice(&self.code);
        write_count(&mut out, self.exception_table.len(), "exception handlers")?;
        for entry in &self.exception_table {
            out.write_u16::<BigEndian>(entry.start_pc)?;
            out.write_u16::<BigEndian>(entry.end_pc)?;
            out.write_u16::<BigEndian>(entry.handler_pc)?;
            out.write_u16::<BigEndian>(entry.catch_type)?;
        }
        AttributeInfo::write_list(&self.attributes, &mut out)?;
        Ok(out)
    }
}

impl HasAttributes for CodeAttribute {
    fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Vec<AttributeInfo> {
        &mut self.attributes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

pub fn parse_line_numbers(info: &[u8]) -> Result<Vec<LineNumberEntry>, ClassFormatErr> {
    let mut cursor = ByteCursor::new(info);
    let count = cursor.u16()?;
    (0..count)
        .map(|_| {
            Ok(LineNumberEntry {
                start_pc: cursor.u16()?,
                line_number: cursor.u16()?,
            })
        })
        .collect()
}

pub fn encode_line_numbers(entries: &[LineNumberEntry]) -> Result<Vec<u8>, ConstructionErr> {
    let mut out = Vec::with_capacity(2 + entries.len() * 4);
    write_count(&mut out, entries.len(), "line numbers")?;
    for entry in entries {
        out.write_u16::<BigEndian>(entry.start_pc)?;
        out.write_u16::<BigEndian>(entry.line_number)?;
    }
    Ok(out)
}

/// Entry of `LocalVariableTable` or `LocalVariableTypeTable`; the layouts are identical
/// apart from `descriptor_index` holding a signature in the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

pub fn parse_local_variables(info: &[u8]) -> Result<Vec<LocalVariableEntry>, ClassFormatErr> {
    let mut cursor = ByteCursor::new(info);
    let count = cursor.u16()?;
    (0..count)
        .map(|_| {
            Ok(LocalVariableEntry {
                start_pc: cursor.u16()?,
                length: cursor.u16()?,
                name_index: cursor.u16()?,
                descriptor_index: cursor.u16()?,
                index: cursor.u16()?,
            })
        })
        .collect()
}

pub fn encode_local_variables(entries: &[LocalVariableEntry]) -> Result<Vec<u8>, ConstructionErr> {
    let mut out = Vec::with_capacity(2 + entries.len() * 10);
    write_count(&mut out, entries.len(), "local variables")?;
    for entry in entries {
        out.write_u16::<BigEndian>(entry.start_pc)?;
        out.write_u16::<BigEndian>(entry.length)?;
        out.write_u16::<BigEndian>(entry.name_index)?;
        out.write_u16::<BigEndian>(entry.descriptor_index)?;
        out.write_u16::<BigEndian>(entry.index)?;
    }
    Ok(out)
}
