use crate::attribute::annotation::Annotation;
use crate::constant::pool::ConstantPool;
use crate::error::{ClassFormatErr, ConstructionErr};
use byteorder::{BigEndian, WriteBytesExt};
use hotfield_common::utils::cursor::ByteCursor;

pub mod annotation;
pub mod code;
pub mod stack_map;

pub mod names {
    pub const CODE: &str = "Code";
    pub const STACK_MAP_TABLE: &str = "StackMapTable";
    pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
    pub const LOCAL_VARIABLE_TYPE_TABLE: &str = "LocalVariableTypeTable";
    pub const SIGNATURE: &str = "Signature";
    pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
}

/// Raw attribute; the payload is kept verbatim so unknown attributes survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn new(cp: &mut ConstantPool, name: &str, info: Vec<u8>) -> Result<Self, ConstructionErr> {
        Ok(Self {
            name_index: cp.add_utf8(name)?,
            info,
        })
    }

    pub fn name<'a>(&self, cp: &'a ConstantPool) -> Result<&'a str, ClassFormatErr> {
        cp.get_utf8(self.name_index)
    }

    pub(crate) fn parse_list(cursor: &mut ByteCursor) -> Result<Vec<Self>, ClassFormatErr> {
        let count = cursor.u16()?;
        (0..count)
            .map(|_| {
                Ok(Self {
                    name_index: cursor.u16()?,
                    info: cursor.u32_prefixed()?.to_vec(),
                })
            })
            .collect()
    }

    pub(crate) fn write_list(attributes: &[Self], out: &mut Vec<u8>) -> Result<(), ConstructionErr> {
        write_count(out, attributes.len(), "attributes")?;
        for attr in attributes {
            out.write_u16::<BigEndian>(attr.name_index)?;
            out.write_u32::<BigEndian>(attr.info.len() as u32)?;
            out.extend_from_slice(&attr.info);
        }
        Ok(())
    }
}

pub(crate) fn write_count(out: &mut Vec<u8>, count: usize, what: &'static str) -> Result<(), ConstructionErr> {
    if count > u16::MAX as usize {
        return Err(ConstructionErr::TooManyItems { what, count });
    }
    out.write_u16::<BigEndian>(count as u16)?;
    Ok(())
}

/// Members (fields, methods, code) that carry an attribute table.
pub trait HasAttributes {
    fn attributes(&self) -> &[AttributeInfo];

    fn attributes_mut(&mut self) -> &mut Vec<AttributeInfo>;

    fn find_attribute(
        &self,
        cp: &ConstantPool,
        name: &str,
    ) -> Result<Option<&AttributeInfo>, ClassFormatErr> {
        for attr in self.attributes() {
            if attr.name(cp)? == name {
                return Ok(Some(attr));
            }
        }
        Ok(None)
    }

    fn remove_attribute(
        &mut self,
        cp: &ConstantPool,
        name: &str,
    ) -> Result<Option<AttributeInfo>, ClassFormatErr> {
        let mut found = None;
        for (pos, attr) in self.attributes().iter().enumerate() {
            if attr.name(cp)? == name {
                found = Some(pos);
                break;
            }
        }
        Ok(found.map(|pos| self.attributes_mut().remove(pos)))
    }

    /// Replaces the attribute with the same name or appends a new one.
    fn set_attribute(
        &mut self,
        cp: &mut ConstantPool,
        name: &str,
        info: Vec<u8>,
    ) -> Result<(), ConstructionErr> {
        let attr = AttributeInfo::new(cp, name, info)?;
        let mut existing = None;
        for (pos, current) in self.attributes().iter().enumerate() {
            if current.name_index == attr.name_index {
                existing = Some(pos);
                break;
            }
        }
        match existing {
            Some(pos) => self.attributes_mut()[pos] = attr,
            None => self.attributes_mut().push(attr),
        }
        Ok(())
    }

    fn signature<'a>(&self, cp: &'a ConstantPool) -> Result<Option<&'a str>, ClassFormatErr> {
        let Some(attr) = self.find_attribute(cp, names::SIGNATURE)? else {
            return Ok(None);
        };
        let index = ByteCursor::new(&attr.info).u16()?;
        cp.get_utf8(index).map(Some)
    }

    fn set_signature(&mut self, cp: &mut ConstantPool, signature: &str) -> Result<(), ConstructionErr> {
        let index = cp.add_utf8(signature)?;
        self.set_attribute(cp, names::SIGNATURE, index.to_be_bytes().to_vec())
    }

    fn visible_annotations(&self, cp: &ConstantPool) -> Result<Option<Vec<Annotation>>, ClassFormatErr> {
        self.find_attribute(cp, names::RUNTIME_VISIBLE_ANNOTATIONS)?
            .map(|attr| annotation::parse_annotations(&attr.info, cp))
            .transpose()
    }

    /// Writes `annotations` into this member, interning every constant into `cp`.
    fn set_visible_annotations(
        &mut self,
        cp: &mut ConstantPool,
        annotations: &[Annotation],
    ) -> Result<(), ConstructionErr> {
        let info = annotation::encode_annotations(annotations, cp)?;
        self.set_attribute(cp, names::RUNTIME_VISIBLE_ANNOTATIONS, info)
    }

    /// Copies visible annotations and the generic signature from `source` (resolved
    /// against `source_cp`) into this member, re-interning every constant into `cp`.
    fn copy_metadata_from<S: HasAttributes>(
        &mut self,
        cp: &mut ConstantPool,
        source: &S,
        source_cp: &ConstantPool,
    ) -> Result<(), ConstructionErr> {
        if let Some(annotations) = source.visible_annotations(source_cp)? {
            self.set_visible_annotations(cp, &annotations)?;
        }
        if let Some(signature) = source.signature(source_cp)? {
            self.set_signature(cp, signature)?;
        }
        Ok(())
    }
}
