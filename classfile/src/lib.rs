//! Reading, editing and writing JVM class definitions.

use crate::attribute::{AttributeInfo, HasAttributes};
use crate::constant::pool::ConstantPool;
use crate::error::{ClassFormatErr, ConstructionErr};
use crate::field::FieldInfo;
use crate::flags::ClassFlags;
use crate::method::MethodInfo;
use byteorder::{BigEndian, WriteBytesExt};
use hotfield_common::utils::cursor::ByteCursor;

pub mod attribute;
pub mod bytecode;
pub mod constant;
pub mod error;
pub mod field;
pub mod flags;
pub mod method;

pub const MAGIC: u32 = 0xCAFEBABE;
/// First class-file version whose verifier requires `StackMapTable` frames.
pub const STACK_MAP_MAJOR_VERSION: u16 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub cp: ConstantPool,
    pub access_flags: ClassFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Empty class named `name` extending `super_name`.
    pub fn new(
        major_version: u16,
        access_flags: ClassFlags,
        name: &str,
        super_name: &str,
    ) -> Result<Self, ConstructionErr> {
        let mut cp = ConstantPool::new();
        let this_class = cp.add_class(name)?;
        let super_class = cp.add_class(super_name)?;
        Ok(Self {
            minor_version: 0,
            major_version,
            cp,
            access_flags,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFormatErr> {
        let mut cursor = ByteCursor::new(bytes);
        let magic = cursor.u32()?;
        if magic != MAGIC {
            return Err(ClassFormatErr::BadMagic(magic));
        }
        let minor_version = cursor.u16()?;
        let major_version = cursor.u16()?;
        let cp = ConstantPool::parse(&mut cursor)?;
        let access_flags = ClassFlags::new(cursor.u16()?);
        let this_class = cursor.u16()?;
        let super_class = cursor.u16()?;
        let interfaces_count = cursor.u16()?;
        let interfaces = (0..interfaces_count)
            .map(|_| cursor.u16())
            .collect::<Result<Vec<_>, _>>()?;
        let fields_count = cursor.u16()?;
        let fields = (0..fields_count)
            .map(|_| FieldInfo::parse(&mut cursor))
            .collect::<Result<Vec<_>, _>>()?;
        let methods_count = cursor.u16()?;
        let methods = (0..methods_count)
            .map(|_| MethodInfo::parse(&mut cursor))
            .collect::<Result<Vec<_>, _>>()?;
        let attributes = AttributeInfo::parse_list(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(ClassFormatErr::TrailingBytes {
                attribute: "ClassFile",
                remaining: cursor.remaining(),
            });
        }
        Ok(Self {
            minor_version,
            major_version,
            cp,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ConstructionErr> {
        let mut out = Vec::with_capacity(1024);
        out.write_u32::<BigEndian>(MAGIC)?;
        out.write_u16::<BigEndian>(self.minor_version)?;
        out.write_u16::<BigEndian>(self.major_version)?;
        self.cp.write(&mut out)?;
        out.write_u16::<BigEndian>(self.access_flags.raw())?;
        out.write_u16::<BigEndian>(self.this_class)?;
        out.write_u16::<BigEndian>(self.super_class)?;
        attribute::write_count(&mut out, self.interfaces.len(), "interfaces")?;
        for interface in &self.interfaces {
            out.write_u16::<BigEndian>(*interface)?;
        }
        attribute::write_count(&mut out, self.fields.len(), "fields")?;
        for field in &self.fields {
            field.write(&mut out)?;
        }
        attribute::write_count(&mut out, self.methods.len(), "methods")?;
        for method in &self.methods {
            method.write(&mut out)?;
        }
        AttributeInfo::write_list(&self.attributes, &mut out)?;
        Ok(out)
    }

    /// Internal name of this class.
    pub fn name(&self) -> Result<&str, ClassFormatErr> {
        self.cp.get_class_name(self.this_class)
    }

    /// `None` only for `java/lang/Object`.
    pub fn super_name(&self) -> Result<Option<&str>, ClassFormatErr> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.cp.get_class_name(self.super_class).map(Some)
    }

    pub fn requires_stack_map(&self) -> bool {
        self.major_version >= STACK_MAP_MAJOR_VERSION
    }

    pub fn find_field(&self, name: &str, descriptor: &str) -> Result<Option<usize>, ClassFormatErr> {
        for (pos, field) in self.fields.iter().enumerate() {
            if field.name(&self.cp)? == name && field.descriptor(&self.cp)? == descriptor {
                return Ok(Some(pos));
            }
        }
        Ok(None)
    }

    /// Appends a field; a class may not declare the same name and descriptor twice.
    pub fn add_field(&mut self, field: FieldInfo) -> Result<usize, ConstructionErr> {
        let name = field.name(&self.cp)?.to_string();
        let descriptor = field.descriptor(&self.cp)?.to_string();
        if self.find_field(&name, &descriptor)?.is_some() {
            return Err(ConstructionErr::DuplicateMember { name, descriptor });
        }
        self.fields.push(field);
        Ok(self.fields.len() - 1)
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Result<Option<usize>, ClassFormatErr> {
        for (pos, method) in self.methods.iter().enumerate() {
            if method.name(&self.cp)? == name && method.descriptor(&self.cp)? == descriptor {
                return Ok(Some(pos));
            }
        }
        Ok(None)
    }

    pub fn add_method(&mut self, method: MethodInfo) -> Result<usize, ConstructionErr> {
        let name = method.name(&self.cp)?.to_string();
        let descriptor = method.descriptor(&self.cp)?.to_string();
        if self.find_method(&name, &descriptor)?.is_some() {
            return Err(ConstructionErr::DuplicateMember { name, descriptor });
        }
        self.methods.push(method);
        Ok(self.methods.len() - 1)
    }
}

impl HasAttributes for ClassFile {
    fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Vec<AttributeInfo> {
        &mut self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FieldFlags;

    #[test]
    fn writes_and_reads_back_a_class() {
        let mut class = ClassFile::new(
            52,
            ClassFlags::new(ClassFlags::ACC_PUBLIC | ClassFlags::ACC_SUPER),
            "com/example/Point",
            "java/lang/Object",
        )
        .unwrap();
        let field = FieldInfo::new(&mut class.cp, FieldFlags::new(FieldFlags::ACC_PRIVATE), "x", "I")
            .unwrap();
        class.add_field(field).unwrap();

        let bytes = class.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        let parsed = ClassFile::parse(&bytes).unwrap();
        assert_eq!(parsed, class);
        assert_eq!(parsed.name().unwrap(), "com/example/Point");
        assert_eq!(parsed.super_name().unwrap(), Some("java/lang/Object"));
        assert_eq!(parsed.find_field("x", "I").unwrap(), Some(0));
        assert!(parsed.requires_stack_map());
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let mut class = ClassFile::new(52, ClassFlags::default(), "A", "java/lang/Object").unwrap();
        let first = FieldInfo::new(&mut class.cp, FieldFlags::default(), "x", "I").unwrap();
        let second = first.clone();
        class.add_field(first).unwrap();
        let err = class.add_field(second).unwrap_err();
        assert_eq!(err.to_string(), "duplicate member x:I");
    }

    #[test]
    fn bad_magic_is_reported() {
        assert_eq!(
            ClassFile::parse(&[0, 0, 0, 1]),
            Err(ClassFormatErr::BadMagic(1))
        );
    }
}
