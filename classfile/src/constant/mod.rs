use num_enum::{IntoPrimitive, TryFromPrimitive};

pub mod pool;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum ConstantTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantInfo {
    /// Slot 0 and the second slot of Long / Double entries.
    Unused,
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(ReferenceInfo),
    MethodRef(ReferenceInfo),
    InterfaceMethodRef(ReferenceInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(u16),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module(u16),
    Package(u16),
}

impl ConstantInfo {
    pub fn tag(&self) -> Option<ConstantTag> {
        Some(match self {
            ConstantInfo::Unused => return None,
            ConstantInfo::Utf8(_) => ConstantTag::Utf8,
            ConstantInfo::Integer(_) => ConstantTag::Integer,
            ConstantInfo::Float(_) => ConstantTag::Float,
            ConstantInfo::Long(_) => ConstantTag::Long,
            ConstantInfo::Double(_) => ConstantTag::Double,
            ConstantInfo::Class(_) => ConstantTag::Class,
            ConstantInfo::String(_) => ConstantTag::String,
            ConstantInfo::FieldRef(_) => ConstantTag::FieldRef,
            ConstantInfo::MethodRef(_) => ConstantTag::MethodRef,
            ConstantInfo::InterfaceMethodRef(_) => ConstantTag::InterfaceMethodRef,
            ConstantInfo::NameAndType(_) => ConstantTag::NameAndType,
            ConstantInfo::MethodHandle(_) => ConstantTag::MethodHandle,
            ConstantInfo::MethodType(_) => ConstantTag::MethodType,
            ConstantInfo::Dynamic(_) => ConstantTag::Dynamic,
            ConstantInfo::InvokeDynamic(_) => ConstantTag::InvokeDynamic,
            ConstantInfo::Module(_) => ConstantTag::Module,
            ConstantInfo::Package(_) => ConstantTag::Package,
        })
    }

    /// Long and Double take two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, ConstantInfo::Long(_) | ConstantInfo::Double(_))
    }

    /// Equality used for deduplication; floats compare by bit pattern.
    pub(crate) fn same_as(&self, other: &ConstantInfo) -> bool {
        match (self, other) {
            (ConstantInfo::Float(a), ConstantInfo::Float(b)) => a.to_bits() == b.to_bits(),
            (ConstantInfo::Double(a), ConstantInfo::Double(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }
}
