//! Hooks that retarget field access in code elsewhere once a class changed shape.
//!
//! The reconciler only decides *what* moved; rewriting `getfield`/`putstatic` sites in
//! other classes is left to whoever implements [`FieldAccessRewriter`].

use crate::keys::LoaderScope;
use hotfield_classfile::flags::FieldFlags;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An instance field living in slot `ordinal` of its owner's storage array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedFieldRecord {
    pub ordinal: usize,
    pub name: String,
    pub descriptor: String,
    pub owner: String,
    pub loader: LoaderScope,
}

/// A static field that now lives on `holder` under the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFieldRedirect {
    pub owner: String,
    pub holder: String,
    pub field_name: String,
    pub descriptor: String,
    pub loader: LoaderScope,
}

/// A field the new definition dropped; it stays declared but nothing should use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedFieldRecord {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub access_flags: FieldFlags,
    pub loader: LoaderScope,
}

pub trait FieldAccessRewriter: Send + Sync {
    fn rewrite_instance_field_access(&self, record: &AddedFieldRecord);

    fn rewrite_static_field_access(&self, redirect: &StaticFieldRedirect);

    fn rewrite_removed_field_access(&self, record: &RemovedFieldRecord);
}

/// Rewriter that changes nothing and keeps every request, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingRewriter {
    instance: Mutex<Vec<AddedFieldRecord>>,
    statics: Mutex<Vec<StaticFieldRedirect>>,
    removed: Mutex<Vec<RemovedFieldRecord>>,
}

// A panic elsewhere must not lose what was already recorded.
fn requests<T>(requests: &Mutex<Vec<T>>) -> MutexGuard<'_, Vec<T>> {
    requests.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_requests(&self) -> Vec<AddedFieldRecord> {
        requests(&self.instance).clone()
    }

    pub fn static_requests(&self) -> Vec<StaticFieldRedirect> {
        requests(&self.statics).clone()
    }

    pub fn removed_requests(&self) -> Vec<RemovedFieldRecord> {
        requests(&self.removed).clone()
    }

    pub fn is_empty(&self) -> bool {
        requests(&self.instance).is_empty()
            && requests(&self.statics).is_empty()
            && requests(&self.removed).is_empty()
    }
}

impl FieldAccessRewriter for RecordingRewriter {
    fn rewrite_instance_field_access(&self, record: &AddedFieldRecord) {
        requests(&self.instance).push(record.clone());
    }

    fn rewrite_static_field_access(&self, redirect: &StaticFieldRedirect) {
        requests(&self.statics).push(redirect.clone());
    }

    fn rewrite_removed_field_access(&self, record: &RemovedFieldRecord) {
        requests(&self.removed).push(record.clone());
    }
}
