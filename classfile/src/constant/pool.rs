use crate::constant::{
    ConstantInfo, ConstantTag, DynamicInfo, MethodHandleInfo, NameAndTypeInfo, ReferenceInfo,
};
use crate::error::{ClassFormatErr, ConstructionErr};
use byteorder::{BigEndian, WriteBytesExt};
use hotfield_common::utils::cursor::ByteCursor;
use hotfield_common::utils::mutf8;

/// Resolved view of a Fieldref / Methodref / InterfaceMethodref entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub class_name: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPool {
    pub inner: Vec<ConstantInfo>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Pool count is written as a u16, so the last usable index is 65534.
    const MAX_COUNT: usize = u16::MAX as usize;

    pub fn new() -> Self {
        Self {
            inner: vec![ConstantInfo::Unused],
        }
    }

    pub(crate) fn parse(cursor: &mut ByteCursor) -> Result<Self, ClassFormatErr> {
        let count = cursor.u16()?;
        let mut inner = Vec::with_capacity(count as usize);
        inner.push(ConstantInfo::Unused);
        let mut index = 1u16;
        while index < count {
            let tag_byte = cursor.u8()?;
            let tag = ConstantTag::try_from(tag_byte).map_err(|_| {
                ClassFormatErr::InvalidConstantTag {
                    index,
                    tag: tag_byte,
                }
            })?;
            let entry = match tag {
                ConstantTag::Utf8 => ConstantInfo::Utf8(mutf8::decode(cursor.u16_prefixed()?)?),
                ConstantTag::Integer => ConstantInfo::Integer(cursor.i32()?),
                ConstantTag::Float => ConstantInfo::Float(cursor.f32()?),
                ConstantTag::Long => ConstantInfo::Long(cursor.i64()?),
                ConstantTag::Double => ConstantInfo::Double(cursor.f64()?),
                ConstantTag::Class => ConstantInfo::Class(cursor.u16()?),
                ConstantTag::String => ConstantInfo::String(cursor.u16()?),
                ConstantTag::FieldRef => ConstantInfo::FieldRef(Self::parse_ref(cursor)?),
                ConstantTag::MethodRef => ConstantInfo::MethodRef(Self::parse_ref(cursor)?),
                ConstantTag::InterfaceMethodRef => {
                    ConstantInfo::InterfaceMethodRef(Self::parse_ref(cursor)?)
                }
                ConstantTag::NameAndType => ConstantInfo::NameAndType(NameAndTypeInfo {
                    name_index: cursor.u16()?,
                    descriptor_index: cursor.u16()?,
                }),
                ConstantTag::MethodHandle => ConstantInfo::MethodHandle(MethodHandleInfo {
                    reference_kind: cursor.u8()?,
                    reference_index: cursor.u16()?,
                }),
                ConstantTag::MethodType => ConstantInfo::MethodType(cursor.u16()?),
                ConstantTag::Dynamic => ConstantInfo::Dynamic(Self::parse_dynamic(cursor)?),
                ConstantTag::InvokeDynamic => {
                    ConstantInfo::InvokeDynamic(Self::parse_dynamic(cursor)?)
                }
                ConstantTag::Module => ConstantInfo::Module(cursor.u16()?),
                ConstantTag::Package => ConstantInfo::Package(cursor.u16()?),
            };
            let wide = entry.is_wide();
            inner.push(entry);
            index += 1;
            if wide {
                inner.push(ConstantInfo::Unused);
                index += 1;
            }
        }
        Ok(Self { inner })
    }

    fn parse_ref(cursor: &mut ByteCursor) -> Result<ReferenceInfo, ClassFormatErr> {
        Ok(ReferenceInfo {
            class_index: cursor.u16()?,
            name_and_type_index: cursor.u16()?,
        })
    }

    fn parse_dynamic(cursor: &mut ByteCursor) -> Result<DynamicInfo, ClassFormatErr> {
        Ok(DynamicInfo {
            bootstrap_method_attr_index: cursor.u16()?,
            name_and_type_index: cursor.u16()?,
        })
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) -> Result<(), ConstructionErr> {
        if self.inner.len() > Self::MAX_COUNT {
            return Err(ConstructionErr::ConstantPoolOverflow);
        }
        out.write_u16::<BigEndian>(self.inner.len() as u16)?;
        for entry in &self.inner {
            let Some(tag) = entry.tag() else {
                continue;
            };
            out.write_u8(tag.into())?;
            match entry {
                ConstantInfo::Unused => {}
                ConstantInfo::Utf8(value) => {
                    let bytes = mutf8::encode(value);
                    if bytes.len() > u16::MAX as usize {
                        return Err(ConstructionErr::TooManyItems {
                            what: "utf8 bytes",
                            count: bytes.len(),
                        });
                    }
                    out.write_u16::<BigEndian>(bytes.len() as u16)?;
                    out.extend_from_slice(&bytes);
                }
                ConstantInfo::Integer(v) => out.write_i32::<BigEndian>(*v)?,
                ConstantInfo::Float(v) => out.write_f32::<BigEndian>(*v)?,
                ConstantInfo::Long(v) => out.write_i64::<BigEndian>(*v)?,
                ConstantInfo::Double(v) => out.write_f64::<BigEndian>(*v)?,
                ConstantInfo::Class(idx)
                | ConstantInfo::String(idx)
                | ConstantInfo::MethodType(idx)
                | ConstantInfo::Module(idx)
                | ConstantInfo::Package(idx) => out.write_u16::<BigEndian>(*idx)?,
                ConstantInfo::FieldRef(r)
                | ConstantInfo::MethodRef(r)
                | ConstantInfo::InterfaceMethodRef(r) => {
                    out.write_u16::<BigEndian>(r.class_index)?;
                    out.write_u16::<BigEndian>(r.name_and_type_index)?;
                }
                ConstantInfo::NameAndType(nat) => {
                    out.write_u16::<BigEndian>(nat.name_index)?;
                    out.write_u16::<BigEndian>(nat.descriptor_index)?;
                }
                ConstantInfo::MethodHandle(handle) => {
                    out.write_u8(handle.reference_kind)?;
                    out.write_u16::<BigEndian>(handle.reference_index)?;
                }
                ConstantInfo::Dynamic(d) | ConstantInfo::InvokeDynamic(d) => {
                    out.write_u16::<BigEndian>(d.bootstrap_method_attr_index)?;
                    out.write_u16::<BigEndian>(d.name_and_type_index)?;
                }
            }
        }
        Ok(())
    }

    /// Number of slots including the unused slot 0.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() <= 1
    }

    pub fn get(&self, index: u16) -> Result<&ConstantInfo, ClassFormatErr> {
        match self.inner.get(index as usize) {
            Some(ConstantInfo::Unused) | None => Err(ClassFormatErr::InvalidConstantIndex {
                index,
                expected: "any",
            }),
            Some(entry) => Ok(entry),
        }
    }

    pub fn get_utf8(&self, index: u16) -> Result<&str, ClassFormatErr> {
        match self.inner.get(index as usize) {
            Some(ConstantInfo::Utf8(value)) => Ok(value),
            _ => Err(ClassFormatErr::InvalidConstantIndex {
                index,
                expected: "Utf8",
            }),
        }
    }

    pub fn get_class_name(&self, index: u16) -> Result<&str, ClassFormatErr> {
        match self.inner.get(index as usize) {
            Some(ConstantInfo::Class(name_index)) => self.get_utf8(*name_index),
            _ => Err(ClassFormatErr::InvalidConstantIndex {
                index,
                expected: "Class",
            }),
        }
    }

    pub fn get_integer(&self, index: u16) -> Result<i32, ClassFormatErr> {
        match self.inner.get(index as usize) {
            Some(ConstantInfo::Integer(v)) => Ok(*v),
            _ => Err(ClassFormatErr::InvalidConstantIndex {
                index,
                expected: "Integer",
            }),
        }
    }

    pub fn get_name_and_type(&self, index: u16) -> Result<(&str, &str), ClassFormatErr> {
        match self.inner.get(index as usize) {
            Some(ConstantInfo::NameAndType(nat)) => Ok((
                self.get_utf8(nat.name_index)?,
                self.get_utf8(nat.descriptor_index)?,
            )),
            _ => Err(ClassFormatErr::InvalidConstantIndex {
                index,
                expected: "NameAndType",
            }),
        }
    }

    pub fn get_member_ref(&self, index: u16) -> Result<MemberRef<'_>, ClassFormatErr> {
        match self.inner.get(index as usize) {
            Some(
                ConstantInfo::FieldRef(r)
                | ConstantInfo::MethodRef(r)
                | ConstantInfo::InterfaceMethodRef(r),
            ) => {
                let (name, descriptor) = self.get_name_and_type(r.name_and_type_index)?;
                Ok(MemberRef {
                    class_name: self.get_class_name(r.class_index)?,
                    name,
                    descriptor,
                })
            }
            _ => Err(ClassFormatErr::InvalidConstantIndex {
                index,
                expected: "member reference",
            }),
        }
    }

    /// Descriptor of the NameAndType behind an InvokeDynamic / Dynamic entry.
    pub fn get_dynamic_descriptor(&self, index: u16) -> Result<&str, ClassFormatErr> {
        match self.inner.get(index as usize) {
            Some(ConstantInfo::InvokeDynamic(d) | ConstantInfo::Dynamic(d)) => {
                Ok(self.get_name_and_type(d.name_and_type_index)?.1)
            }
            _ => Err(ClassFormatErr::InvalidConstantIndex {
                index,
                expected: "Dynamic",
            }),
        }
    }

    fn find(&self, entry: &ConstantInfo) -> Option<u16> {
        self.inner
            .iter()
            .position(|existing| existing.same_as(entry))
            .map(|pos| pos as u16)
    }

    fn push(&mut self, entry: ConstantInfo) -> Result<u16, ConstructionErr> {
        let needed = if entry.is_wide() { 2 } else { 1 };
        if self.inner.len() + needed > Self::MAX_COUNT {
            return Err(ConstructionErr::ConstantPoolOverflow);
        }
        let index = self.inner.len() as u16;
        let wide = entry.is_wide();
        self.inner.push(entry);
        if wide {
            self.inner.push(ConstantInfo::Unused);
        }
        Ok(index)
    }

    fn find_or_push(&mut self, entry: ConstantInfo) -> Result<u16, ConstructionErr> {
        match self.find(&entry) {
            Some(index) => Ok(index),
            None => self.push(entry),
        }
    }

    pub fn add_utf8(&mut self, value: &str) -> Result<u16, ConstructionErr> {
        self.find_or_push(ConstantInfo::Utf8(value.to_string()))
    }

    pub fn add_class(&mut self, internal_name: &str) -> Result<u16, ConstructionErr> {
        let name_index = self.add_utf8(internal_name)?;
        self.find_or_push(ConstantInfo::Class(name_index))
    }

    pub fn add_string(&mut self, value: &str) -> Result<u16, ConstructionErr> {
        let utf8_index = self.add_utf8(value)?;
        self.find_or_push(ConstantInfo::String(utf8_index))
    }

    pub fn add_integer(&mut self, value: i32) -> Result<u16, ConstructionErr> {
        self.find_or_push(ConstantInfo::Integer(value))
    }

    pub fn add_float(&mut self, value: f32) -> Result<u16, ConstructionErr> {
        self.find_or_push(ConstantInfo::Float(value))
    }

    pub fn add_long(&mut self, value: i64) -> Result<u16, ConstructionErr> {
        self.find_or_push(ConstantInfo::Long(value))
    }

    pub fn add_double(&mut self, value: f64) -> Result<u16, ConstructionErr> {
        self.find_or_push(ConstantInfo::Double(value))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, ConstructionErr> {
        let name_index = self.add_utf8(name)?;
        let descriptor_index = self.add_utf8(descriptor)?;
        self.find_or_push(ConstantInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    pub fn add_fieldref(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ConstructionErr> {
        let info = self.reference_info(class_name, name, descriptor)?;
        self.find_or_push(ConstantInfo::FieldRef(info))
    }

    pub fn add_methodref(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<u16, ConstructionErr> {
        let info = self.reference_info(class_name, name, descriptor)?;
        self.find_or_push(ConstantInfo::MethodRef(info))
    }

    fn reference_info(
        &mut self,
        class_name: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<ReferenceInfo, ConstructionErr> {
        Ok(ReferenceInfo {
            class_index: self.add_class(class_name)?,
            name_and_type_index: self.add_name_and_type(name, descriptor)?,
        })
    }
}
