use crate::attribute::{AttributeInfo, HasAttributes};
use crate::constant::pool::ConstantPool;
use crate::error::{ClassFormatErr, ConstructionErr};
use crate::flags::FieldFlags;
use byteorder::{BigEndian, WriteBytesExt};
use hotfield_common::utils::cursor::ByteCursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub access_flags: FieldFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl FieldInfo {
    pub fn new(
        cp: &mut ConstantPool,
        access_flags: FieldFlags,
        name: &str,
        descriptor: &str,
    ) -> Result<Self, ConstructionErr> {
        Ok(Self {
            access_flags,
            name_index: cp.add_utf8(name)?,
            descriptor_index: cp.add_utf8(descriptor)?,
            attributes: Vec::new(),
        })
    }

    pub fn name<'a>(&self, cp: &'a ConstantPool) -> Result<&'a str, ClassFormatErr> {
        cp.get_utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, cp: &'a ConstantPool) -> Result<&'a str, ClassFormatErr> {
        cp.get_utf8(self.descriptor_index)
    }

    pub(crate) fn parse(cursor: &mut ByteCursor) -> Result<Self, ClassFormatErr> {
        Ok(Self {
            access_flags: FieldFlags::new(cursor.u16()?),
            name_index: cursor.u16()?,
            descriptor_index: cursor.u16()?,
            attributes: AttributeInfo::parse_list(cursor)?,
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) -> Result<(), ConstructionErr> {
        out.write_u16::<BigEndian>(self.access_flags.raw())?;
        out.write_u16::<BigEndian>(self.name_index)?;
        out.write_u16::<BigEndian>(self.descriptor_index)?;
        AttributeInfo::write_list(&self.attributes, out)
    }
}

impl HasAttributes for FieldInfo {
    fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Vec<AttributeInfo> {
        &mut self.attributes
    }
}
