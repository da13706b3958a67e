use crate::attribute::code::CodeAttribute;
use crate::attribute::{AttributeInfo, HasAttributes, names};
use crate::constant::pool::ConstantPool;
use crate::error::{ClassFormatErr, ConstructionErr};
use crate::flags::MethodFlags;
use byteorder::{BigEndian, WriteBytesExt};
use hotfield_common::utils::cursor::ByteCursor;

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const CLASS_INITIALIZER_NAME: &str = "<clinit>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub access_flags: MethodFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    pub fn new(
        cp: &mut ConstantPool,
        access_flags: MethodFlags,
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

    pub fn is_constructor(&self, cp: &ConstantPool) -> Result<bool, ClassFormatErr> {
        Ok(self.name(cp)? == CONSTRUCTOR_NAME)
    }

    /// Decoded `Code` attribute; `None` for abstract and native methods.
    pub fn code(&self, cp: &ConstantPool) -> Result<Option<CodeAttribute>, ClassFormatErr> {
        self.find_attribute(cp, names::CODE)?
            .map(|attr| CodeAttribute::parse(&attr.info))
            .transpose()
    }

    pub fn set_code(&mut self, cp: &mut ConstantPool, code: &CodeAttribute) -> Result<(), ConstructionErr> {
        let info = code.to_bytes()?;
        self.set_attribute(cp, names::CODE, info)
    }

    pub(crate) fn parse(cursor: &mut ByteCursor) -> Result<Self, ClassFormatErr> {
        Ok(Self {
            access_flags: MethodFlags::new(cursor.u16()?),
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

impl HasAttributes for MethodInfo {
    fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Vec<AttributeInfo> {
        &mut self.attributes
    }
}
