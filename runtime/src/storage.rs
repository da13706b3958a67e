//! Per-instance storage for instance fields added by a redefinition.
//!
//! Each instance of a reshaped class owns one [`StorageContainer`] (the hidden
//! `Object[]`), allocated by the instrumented constructors or lazily on first write.
//! A [`FieldAccessor`] is bound to one slot of that container.

use crate::rewriter::AddedFieldRecord;
use hotfield_common::error::TypeDescriptorErr;
use hotfield_common::jtype::{JavaType, PrimitiveType};
use std::fmt::Display;
use std::sync::Arc;

pub type HeapRef = usize;

/// A boxed slot value. Primitive variants stand for the wrapper object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(HeapRef),
    Null,
}

impl Value {
    pub fn as_nullable_obj_ref(&self) -> Result<Option<HeapRef>, StorageError> {
        match self {
            Value::Ref(addr) => Ok(Some(*addr)),
            Value::Null => Ok(None),
            other => Err(StorageError::NotAReference(*other)),
        }
    }

    pub fn as_int(&self) -> Result<i32, StorageError> {
        match self {
            Value::Integer(v) => Ok(*v),
            other => Err(StorageError::UnexpectedValue {
                expected: "int",
                found: *other,
            }),
        }
    }

    pub fn as_long(&self) -> Result<i64, StorageError> {
        match self {
            Value::Long(v) => Ok(*v),
            other => Err(StorageError::UnexpectedValue {
                expected: "long",
                found: *other,
            }),
        }
    }

    pub fn as_double(&self) -> Result<f64, StorageError> {
        match self {
            Value::Double(v) => Ok(*v),
            other => Err(StorageError::UnexpectedValue {
                expected: "double",
                found: *other,
            }),
        }
    }

    /// Whether a slot declared as `ty` may hold this value.
    pub fn fits(&self, ty: &JavaType) -> bool {
        match (ty, self) {
            (JavaType::Primitive(PrimitiveType::Long), Value::Long(_))
            | (JavaType::Primitive(PrimitiveType::Float), Value::Float(_))
            | (JavaType::Primitive(PrimitiveType::Double), Value::Double(_))
            | (JavaType::Instance(_) | JavaType::Array(_), Value::Ref(_) | Value::Null) => true,
            (JavaType::Primitive(p), Value::Integer(_)) => {
                !matches!(p, PrimitiveType::Long | PrimitiveType::Float | PrimitiveType::Double)
            }
            _ => false,
        }
    }
}

impl From<&PrimitiveType> for Value {
    fn from(value: &PrimitiveType) -> Self {
        match value {
            PrimitiveType::Byte
            | PrimitiveType::Char
            | PrimitiveType::Short
            | PrimitiveType::Int
            | PrimitiveType::Boolean => Value::Integer(0),
            PrimitiveType::Double => Value::Double(0.0),
            PrimitiveType::Float => Value::Float(0.0),
            PrimitiveType::Long => Value::Long(0),
        }
    }
}

/// Default a slot of type `jtype` starts with: boxed zero or null.
impl From<&JavaType> for Value {
    fn from(jtype: &JavaType) -> Self {
        match jtype {
            JavaType::Primitive(prim) => Value::from(prim),
            JavaType::Instance(_) | JavaType::Array(_) => Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    SlotOutOfRange { ordinal: usize, len: usize },
    TypeMismatch { ordinal: usize, expected: String, found: Value },
    UnexpectedValue { expected: &'static str, found: Value },
    NotAReference(Value),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for StorageError {}

/// Slot types of one class's added instance fields, by ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub owner: String,
    pub slots: Vec<JavaType>,
}

impl StorageLayout {
    pub fn from_records(owner: impl Into<String>, records: &[AddedFieldRecord]) -> Result<Self, TypeDescriptorErr> {
        let mut ordered: Vec<&AddedFieldRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.ordinal);
        let slots = ordered
            .into_iter()
            .map(|r| JavaType::try_from(r.descriptor.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            owner: owner.into(),
            slots,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageContainer {
    slots: Vec<Value>,
}

impl StorageContainer {
    /// Array sized for `layout` with every slot at its default.
    pub fn allocate(layout: &StorageLayout) -> Self {
        Self {
            slots: layout.slots.iter().map(Value::from).collect(),
        }
    }

    pub fn from_values(slots: Vec<Value>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.slots
    }

    pub fn get(&self, ordinal: usize) -> Result<Value, StorageError> {
        self.slots.get(ordinal).copied().ok_or(StorageError::SlotOutOfRange {
            ordinal,
            len: self.slots.len(),
        })
    }

    pub fn set(&mut self, ordinal: usize, value: Value) -> Result<(), StorageError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(ordinal)
            .ok_or(StorageError::SlotOutOfRange { ordinal, len })?;
        *slot = value;
        Ok(())
    }

    /// Grows to cover slots added by a later redefinition. Existing values are kept.
    pub fn extend_to(&mut self, layout: &StorageLayout) {
        if self.slots.len() < layout.len() {
            let start = self.slots.len();
            self.slots
                .extend(layout.slots[start..].iter().map(Value::from));
        }
    }
}

/// An object that may carry the hidden storage array.
pub trait InstanceStorage {
    fn container(&self) -> Option<&StorageContainer>;

    fn container_mut(&mut self) -> &mut Option<StorageContainer>;
}

/// Reads and writes one added field through the owner's storage array.
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    ordinal: usize,
    layout: Arc<StorageLayout>,
}

impl FieldAccessor {
    pub fn new(ordinal: usize, layout: Arc<StorageLayout>) -> Self {
        Self { ordinal, layout }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    fn slot_type(&self) -> Result<&JavaType, StorageError> {
        self.layout.slots.get(self.ordinal).ok_or(StorageError::SlotOutOfRange {
            ordinal: self.ordinal,
            len: self.layout.len(),
        })
    }

    /// Objects created before the field existed read the slot's default.
    pub fn get(&self, instance: &dyn InstanceStorage) -> Result<Value, StorageError> {
        let ty = self.slot_type()?;
        match instance.container() {
            Some(container) if self.ordinal < container.len() => container.get(self.ordinal),
            _ => Ok(Value::from(ty)),
        }
    }

    pub fn set(&self, instance: &mut dyn InstanceStorage, value: Value) -> Result<(), StorageError> {
        let ty = self.slot_type()?;
        if !value.fits(ty) {
            return Err(StorageError::TypeMismatch {
                ordinal: self.ordinal,
                expected: ty.to_descriptor(),
                found: value,
            });
        }
        let container = instance
            .container_mut()
            .get_or_insert_with(|| StorageContainer::allocate(&self.layout));
        container.extend_to(&self.layout);
        container.set(self.ordinal, value)
    }
}
