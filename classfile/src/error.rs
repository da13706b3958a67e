use hotfield_common::error::{CursorError, MethodDescriptorErr, TypeDescriptorErr};
use std::fmt::Display;

/// Failures while decoding an existing class definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassFormatErr {
    Cursor(CursorError),
    BadMagic(u32),
    InvalidConstantTag { index: u16, tag: u8 },
    InvalidConstantIndex { index: u16, expected: &'static str },
    TypeDescriptor(TypeDescriptorErr),
    MethodDescriptor(MethodDescriptorErr),
    InvalidOpcode { offset: usize, opcode: u8 },
    TruncatedInstruction { offset: usize },
    InvalidElementValueTag(u8),
    InvalidStackMapFrameType(u8),
    InvalidVerificationType(u8),
    ChopBelowLocals { frame: usize },
    TrailingBytes { attribute: &'static str, remaining: usize },
    InconsistentStackDepth { offset: usize },
    NegativeStackDepth { offset: usize },
}

/// Failures while producing or editing a class definition.
#[derive(Debug)]
pub enum ConstructionErr {
    Format(ClassFormatErr),
    Io(std::io::Error),
    ConstantPoolOverflow,
    TooManyItems { what: &'static str, count: usize },
    CodeTooLarge(usize),
    BranchOffsetOverflow { offset: usize, target: i64 },
    InvalidInsertionPoint(usize),
    MisalignedSwitch { offset: usize, gap: usize },
    DuplicateMember { name: String, descriptor: String },
    ConstructorCallNotFound { method: String },
}

impl From<CursorError> for ClassFormatErr {
    fn from(value: CursorError) -> Self {
        ClassFormatErr::Cursor(value)
    }
}

impl From<TypeDescriptorErr> for ClassFormatErr {
    fn from(value: TypeDescriptorErr) -> Self {
        ClassFormatErr::TypeDescriptor(value)
    }
}

impl From<MethodDescriptorErr> for ClassFormatErr {
    fn from(value: MethodDescriptorErr) -> Self {
        ClassFormatErr::MethodDescriptor(value)
    }
}

impl From<ClassFormatErr> for ConstructionErr {
    fn from(value: ClassFormatErr) -> Self {
        ConstructionErr::Format(value)
    }
}

impl From<CursorError> for ConstructionErr {
    fn from(value: CursorError) -> Self {
        ConstructionErr::Format(ClassFormatErr::Cursor(value))
    }
}

impl From<std::io::Error> for ConstructionErr {
    fn from(value: std::io::Error) -> Self {
        ConstructionErr::Io(value)
    }
}

impl Display for ClassFormatErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for ConstructionErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstructionErr::Format(err) => write!(f, "{}", err),
            ConstructionErr::Io(err) => write!(f, "{}", err),
            ConstructionErr::DuplicateMember { name, descriptor } => {
                write!(f, "duplicate member {name}:{descriptor}")
            }
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for ClassFormatErr {}
impl std::error::Error for ConstructionErr {}
