//! `RuntimeVisibleAnnotations` decoded into a form that does not depend on the
//! constant pool it came from, so annotations can be moved between classes.

use crate::attribute::write_count;
use crate::constant::ConstantInfo;
use crate::constant::pool::ConstantPool;
use crate::error::{ClassFormatErr, ConstructionErr};
use byteorder::{BigEndian, WriteBytesExt};
use hotfield_common::utils::cursor::ByteCursor;

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation interface, e.g. `Ljavax/inject/Inject;`.
    pub type_descriptor: String,
    pub elements: Vec<ElementValuePair>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementValuePair {
    pub name: String,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Byte(i32),
    Char(i32),
    Short(i32),
    Boolean(i32),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Enum {
        type_descriptor: String,
        const_name: String,
    },
    /// Return descriptor of the class literal, `V` for `void.class`.
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl Annotation {
    pub fn new(type_descriptor: impl Into<String>) -> Self {
        Self {
            type_descriptor: type_descriptor.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.elements.push(ElementValuePair {
            name: name.into(),
            value,
        });
        self
    }

    fn parse(cursor: &mut ByteCursor, cp: &ConstantPool) -> Result<Self, ClassFormatErr> {
        let type_descriptor = cp.get_utf8(cursor.u16()?)?.to_string();
        let count = cursor.u16()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = cp.get_utf8(cursor.u16()?)?.to_string();
            let value = ElementValue::parse(cursor, cp)?;
            elements.push(ElementValuePair { name, value });
        }
        Ok(Self {
            type_descriptor,
            elements,
        })
    }

    fn encode(&self, cp: &mut ConstantPool, out: &mut Vec<u8>) -> Result<(), ConstructionErr> {
        out.write_u16::<BigEndian>(cp.add_utf8(&self.type_descriptor)?)?;
        write_count(out, self.elements.len(), "annotation elements")?;
        for pair in &self.elements {
            out.write_u16::<BigEndian>(cp.add_utf8(&pair.name)?)?;
            pair.value.encode(cp, out)?;
        }
        Ok(())
    }
}

impl ElementValue {
    fn parse(cursor: &mut ByteCursor, cp: &ConstantPool) -> Result<Self, ClassFormatErr> {
        let tag = cursor.u8()?;
        Ok(match tag {
            b'B' => ElementValue::Byte(cp.get_integer(cursor.u16()?)?),
            b'C' => ElementValue::Char(cp.get_integer(cursor.u16()?)?),
            b'S' => ElementValue::Short(cp.get_integer(cursor.u16()?)?),
            b'Z' => ElementValue::Boolean(cp.get_integer(cursor.u16()?)?),
            b'I' => ElementValue::Int(cp.get_integer(cursor.u16()?)?),
            b'J' => {
                let index = cursor.u16()?;
                match cp.get(index)? {
                    ConstantInfo::Long(v) => ElementValue::Long(*v),
                    _ => return Err(ClassFormatErr::InvalidConstantIndex { index, expected: "Long" }),
                }
            }
            b'F' => {
                let index = cursor.u16()?;
                match cp.get(index)? {
                    ConstantInfo::Float(v) => ElementValue::Float(*v),
                    _ => return Err(ClassFormatErr::InvalidConstantIndex { index, expected: "Float" }),
                }
            }
            b'D' => {
                let index = cursor.u16()?;
                match cp.get(index)? {
                    ConstantInfo::Double(v) => ElementValue::Double(*v),
                    _ => return Err(ClassFormatErr::InvalidConstantIndex { index, expected: "Double" }),
                }
            }
            b's' => ElementValue::String(cp.get_utf8(cursor.u16()?)?.to_string()),
            b'e' => ElementValue::Enum {
                type_descriptor: cp.get_utf8(cursor.u16()?)?.to_string(),
                const_name: cp.get_utf8(cursor.u16()?)?.to_string(),
            },
            b'c' => ElementValue::Class(cp.get_utf8(cursor.u16()?)?.to_string()),
            b'@' => ElementValue::Annotation(Annotation::parse(cursor, cp)?),
            b'[' => {
                let count = cursor.u16()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(ElementValue::parse(cursor, cp)?);
                }
                ElementValue::Array(values)
            }
            other => return Err(ClassFormatErr::InvalidElementValueTag(other)),
        })
    }

    fn tag(&self) -> u8 {
        match self {
            ElementValue::Byte(_) => b'B',
            ElementValue::Char(_) => b'C',
            ElementValue::Short(_) => b'S',
            ElementValue::Boolean(_) => b'Z',
            ElementValue::Int(_) => b'I',
            ElementValue::Long(_) => b'J',
            ElementValue::Float(_) => b'F',
            ElementValue::Double(_) => b'D',
            ElementValue::String(_) => b's',
            ElementValue::Enum { .. } => b'e',
            ElementValue::Class(_) => b'c',
            ElementValue::Annotation(_) => b'@',
            ElementValue::Array(_) => b'[',
        }
    }

    fn encode(&self, cp: &mut ConstantPool, out: &mut Vec<u8>) -> Result<(), ConstructionErr> {
        out.write_u8(self.tag())?;
        match self {
            ElementValue::Byte(v)
            | ElementValue::Char(v)
            | ElementValue::Short(v)
            | ElementValue::Boolean(v)
            | ElementValue::Int(v) => out.write_u16::<BigEndian>(cp.add_integer(*v)?)?,
            ElementValue::Long(v) => out.write_u16::<BigEndian>(cp.add_long(*v)?)?,
            ElementValue::Float(v) => out.write_u16::<BigEndian>(cp.add_float(*v)?)?,
            ElementValue::Double(v) => out.write_u16::<BigEndian>(cp.add_double(*v)?)?,
            ElementValue::String(v) | ElementValue::Class(v) => {
                out.write_u16::<BigEndian>(cp.add_utf8(v)?)?
            }
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => {
                out.write_u16::<BigEndian>(cp.add_utf8(type_descriptor)?)?;
                out.write_u16::<BigEndian>(cp.add_utf8(const_name)?)?;
            }
            ElementValue::Annotation(nested) => nested.encode(cp, out)?,
            ElementValue::Array(values) => {
                write_count(out, values.len(), "array element values")?;
                for value in values {
                    value.encode(cp, out)?;
                }
            }
        }
        Ok(())
    }
}

pub fn parse_annotations(info: &[u8], cp: &ConstantPool) -> Result<Vec<Annotation>, ClassFormatErr> {
    let mut cursor = ByteCursor::new(info);
    let count = cursor.u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(Annotation::parse(&mut cursor, cp)?);
    }
    if !cursor.is_empty() {
        return Err(ClassFormatErr::TrailingBytes {
            attribute: "RuntimeVisibleAnnotations",
            remaining: cursor.remaining(),
        });
    }
    Ok(annotations)
}

pub fn encode_annotations(
    annotations: &[Annotation],
    cp: &mut ConstantPool,
) -> Result<Vec<u8>, ConstructionErr> {
    let mut out = Vec::new();
    write_count(&mut out, annotations.len(), "annotations")?;
    for annotation in annotations {
        annotation.encode(cp, &mut out)?;
    }
    Ok(out)
}
