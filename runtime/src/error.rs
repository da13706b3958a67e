use hotfield_classfile::error::{ClassFormatErr, ConstructionErr};
use hotfield_classfile::flags::FieldFlags;
use hotfield_common::error::TypeDescriptorErr;
use std::fmt::Display;

/// The original class, one of its fields, or its loader could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    ClassNotFound(String),
    FieldNotFound {
        owner: String,
        name: String,
        descriptor: String,
    },
    Denied(String),
}

/// Every variant aborts the reconciliation of the current class; nothing is committed.
#[derive(Debug)]
pub enum RedefineError {
    Lookup(LookupError),
    /// Access flags changed beyond the `static` bit while changes are rejected.
    AccessChange {
        owner: String,
        name: String,
        descriptor: String,
        old: FieldFlags,
        new: FieldFlags,
    },
    Format(ClassFormatErr),
    Construction(ConstructionErr),
    Duplicate {
        name: String,
        descriptor: String,
    },
}

impl From<LookupError> for RedefineError {
    fn from(value: LookupError) -> Self {
        RedefineError::Lookup(value)
    }
}

impl From<ClassFormatErr> for RedefineError {
    fn from(value: ClassFormatErr) -> Self {
        RedefineError::Format(value)
    }
}

impl From<TypeDescriptorErr> for RedefineError {
    fn from(value: TypeDescriptorErr) -> Self {
        RedefineError::Format(ClassFormatErr::TypeDescriptor(value))
    }
}

impl From<ConstructionErr> for RedefineError {
    fn from(value: ConstructionErr) -> Self {
        match value {
            ConstructionErr::DuplicateMember { name, descriptor } => {
                RedefineError::Duplicate { name, descriptor }
            }
            ConstructionErr::Format(err) => RedefineError::Format(err),
            other => RedefineError::Construction(other),
        }
    }
}

impl Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::ClassNotFound(name) => write!(f, "class {name} not found"),
            LookupError::FieldNotFound {
                owner,
                name,
                descriptor,
            } => write!(f, "field {owner}.{name}:{descriptor} not found"),
            LookupError::Denied(reason) => write!(f, "lookup denied: {reason}"),
        }
    }
}

impl Display for RedefineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedefineError::Lookup(err) => write!(f, "{err}"),
            RedefineError::AccessChange {
                owner,
                name,
                descriptor,
                old,
                new,
            } => write!(
                f,
                "access flags of {owner}.{name}:{descriptor} changed from {old:?} to {new:?}"
            ),
            RedefineError::Format(err) => write!(f, "malformed class: {err}"),
            RedefineError::Construction(err) => write!(f, "cannot build class: {err}"),
            RedefineError::Duplicate { name, descriptor } => {
                write!(f, "duplicate member {name}:{descriptor}")
            }
        }
    }
}

impl std::error::Error for LookupError {}
impl std::error::Error for RedefineError {}
