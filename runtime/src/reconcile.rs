use crate::annotations::AnnotationSource;
use crate::context::RedefinitionContext;
use crate::error::RedefineError;
use crate::instrument::instrument_constructors;
use crate::proxy::{instance_accessor_for, static_holder_for};
use crate::rewriter::{AddedFieldRecord, FieldAccessRewriter, RemovedFieldRecord, StaticFieldRedirect};
use crate::schema::{ClassSchema, FieldSchemaEntry, MemberKind};
use crate::storage::{FieldAccessor, StorageLayout};
use crate::{AccessChangePolicy, RedefineConfig, debug_log};
use hotfield_classfile::ClassFile;
use hotfield_classfile::attribute::annotation::Annotation;
use hotfield_classfile::attribute::{HasAttributes, names};
use hotfield_classfile::field::FieldInfo;
use hotfield_classfile::flags::FieldFlags;
use itertools::Itertools;
use std::sync::Arc;
use tracing_log::log::warn;

const STORAGE_FIELD_FLAGS: u16 =
    FieldFlags::ACC_PUBLIC | FieldFlags::ACC_TRANSIENT | FieldFlags::ACC_SYNTHETIC;

/// Result of one successful pass.
#[derive(Debug)]
pub struct RedefinitionOutcome {
    /// The class to hand to the host; its field table matches the loaded shape.
    pub class_bytes: Vec<u8>,
    pub added_fields: Vec<AddedFieldRecord>,
    pub static_redirects: Vec<StaticFieldRedirect>,
    pub removed_fields: Vec<RemovedFieldRecord>,
    /// The class as the next pass must see it: every declared field in declaration
    /// order (kept, storage, removed shells) followed by the proxied ones.
    /// [`ClassSchema::visible_fields`] gives what reflection should report.
    pub schema: ClassSchema,
    pub instrumented_constructors: usize,
}

/// Adds the storage field to a class before it is first loaded, so later passes can
/// add instance fields without changing its shape. Returns false if it was present.
pub fn prepare_for_redefinition(class: &mut ClassFile, config: &RedefineConfig) -> Result<bool, RedefineError> {
    if class.access_flags.is_interface() {
        return Ok(false);
    }
    if class
        .find_field(&config.storage_field_name, &config.storage_field_descriptor)?
        .is_some()
    {
        return Ok(false);
    }
    let field = FieldInfo::new(
        &mut class.cp,
        FieldFlags::new(STORAGE_FIELD_FLAGS),
        &config.storage_field_name,
        &config.storage_field_descriptor,
    )?;
    class.add_field(field)?;
    Ok(true)
}

/// Annotations to record for `owner.name:descriptor` once the pass commits.
type AnnotationRecord = (String, String, String, Option<Vec<Annotation>>);

enum Classification {
    Matched(usize),
    Added,
}

pub struct FieldReconciler<'a> {
    ctx: &'a RedefinitionContext,
    annotations: &'a dyn AnnotationSource,
    rewriter: &'a dyn FieldAccessRewriter,
}

impl<'a> FieldReconciler<'a> {
    pub fn new(
        ctx: &'a RedefinitionContext,
        annotations: &'a dyn AnnotationSource,
        rewriter: &'a dyn FieldAccessRewriter,
    ) -> Self {
        Self {
            ctx,
            annotations,
            rewriter,
        }
    }

    /// Re-declares `entry` as it was loaded, annotations included.
    fn shell(&self, owner: &str, entry: &FieldSchemaEntry, class: &mut ClassFile) -> Result<FieldInfo, RedefineError> {
        let mut shell = FieldInfo::new(&mut class.cp, entry.access_flags, &entry.name, &entry.descriptor)?;
        if let Some(loaded) = self.annotations.field_annotations(owner, &entry.name, &entry.descriptor)? {
            shell.set_visible_annotations(&mut class.cp, &loaded)?;
        }
        Ok(shell)
    }

    fn classify(
        &self,
        old: &ClassSchema,
        unmatched: &[usize],
        name: &str,
        descriptor: &str,
        flags: FieldFlags,
    ) -> Result<Classification, RedefineError> {
        let Some(index) = unmatched
            .iter()
            .copied()
            .find(|&i| old.fields[i].same_member(name, descriptor))
        else {
            return Ok(Classification::Added);
        };
        let previous = old.fields[index].access_flags;
        if previous == flags {
            return Ok(Classification::Matched(index));
        }
        if previous.differs_only_in_static(flags) {
            warn!(
                "{}.{name}:{descriptor} changed only its static modifier; keeping {previous:?}",
                old.class_name
            );
            return Ok(Classification::Matched(index));
        }
        match self.ctx.config().access_change_policy {
            AccessChangePolicy::Reject => Err(RedefineError::AccessChange {
                owner: old.class_name.clone(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
                old: previous,
                new: flags,
            }),
            AccessChangePolicy::TreatAsNew => {
                debug_log!("{}.{name}:{descriptor} changed access flags, handling it as new", old.class_name);
                Ok(Classification::Added)
            }
        }
    }

    /// Rewrites `class`, the new definition of the class whose loaded shape is `old`,
    /// so that it declares exactly the fields `old` says are declared.
    ///
    /// Holders, accessors and rewriter requests are only committed once every step
    /// succeeded; on error the context is left as it was.
    #[hotpath::measure]
    pub fn reconcile(&self, old: &ClassSchema, mut class: ClassFile) -> Result<RedefinitionOutcome, RedefineError> {
        let config = self.ctx.config();
        let owner = class.name()?.to_string();
        let loader = self.ctx.scope().clone();
        let storage_name = config.storage_field_name.as_str();

        let mut unmatched: Vec<usize> = old
            .fields
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind.is_normal() && e.name != storage_name)
            .map(|(i, _)| i)
            .collect();
        let mut slots: Vec<Option<FieldInfo>> = vec![None; old.fields.len()];
        let mut recorded: Vec<AnnotationRecord> = Vec::new();
        let mut added_static = Vec::new();
        let mut added_instance = Vec::new();

        let mut declared = Vec::with_capacity(class.fields.len());
        for field in &class.fields {
            declared.push((field.name(&class.cp)?, field.descriptor(&class.cp)?));
        }
        if let Some((name, descriptor)) = declared.into_iter().duplicates().next() {
            return Err(RedefineError::Duplicate {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            });
        }

        for mut field in std::mem::take(&mut class.fields) {
            let name = field.name(&class.cp)?.to_string();
            let descriptor = field.descriptor(&class.cp)?.to_string();
            if name == storage_name {
                debug_log!("Dropping storage field declared by the new {owner}");
                continue;
            }
            match self.classify(old, &unmatched, &name, &descriptor, field.access_flags)? {
                Classification::Matched(index) => {
                    let declared_annotations = field.visible_annotations(&class.cp)?;
                    match self.annotations.field_annotations(&owner, &name, &descriptor)? {
                        Some(loaded) => field.set_visible_annotations(&mut class.cp, &loaded)?,
                        None => {
                            field.remove_attribute(&class.cp, names::RUNTIME_VISIBLE_ANNOTATIONS)?;
                        }
                    }
                    field.access_flags = old.fields[index].access_flags;
                    recorded.push((owner.clone(), name, descriptor, declared_annotations));
                    slots[index] = Some(field);
                    unmatched.retain(|&i| i != index);
                }
                Classification::Added if field.access_flags.is_static() => added_static.push(field),
                Classification::Added => added_instance.push(field),
            }
        }

        let mut removed_fields = Vec::with_capacity(unmatched.len());
        for &index in &unmatched {
            let entry = &old.fields[index];
            slots[index] = Some(self.shell(&owner, entry, &mut class)?);
            removed_fields.push(RemovedFieldRecord {
                owner: owner.clone(),
                name: entry.name.clone(),
                descriptor: entry.descriptor.clone(),
                access_flags: entry.access_flags,
                loader: loader.clone(),
            });
        }

        // Shells removed by an earlier pass stay; the rewriter already knows about them.
        let mut has_storage = false;
        for (index, entry) in old.fields.iter().enumerate() {
            match entry.kind {
                MemberKind::Removed => slots[index] = Some(self.shell(&owner, entry, &mut class)?),
                MemberKind::Normal if entry.name == storage_name => {
                    slots[index] = Some(FieldInfo::new(
                        &mut class.cp,
                        entry.access_flags,
                        &entry.name,
                        &entry.descriptor,
                    )?);
                    has_storage = true;
                }
                _ => {}
            }
        }
        for field in slots.into_iter().flatten() {
            class.add_field(field)?;
        }
        let appends_storage = !has_storage && !added_instance.is_empty();
        if appends_storage {
            warn!("{owner} was loaded without {storage_name}; its shape will change");
            let storage = FieldInfo::new(
                &mut class.cp,
                FieldFlags::new(STORAGE_FIELD_FLAGS),
                storage_name,
                &config.storage_field_descriptor,
            )?;
            class.add_field(storage)?;
        }

        let mut view = ClassSchema::new(owner.as_str());
        for (index, entry) in old.fields.iter().enumerate() {
            match entry.kind {
                MemberKind::Fake { .. } => {}
                MemberKind::Normal if unmatched.contains(&index) => view.fields.push(entry.to_removed()),
                _ => view.fields.push(entry.clone()),
            }
        }
        if appends_storage {
            view.fields.push(FieldSchemaEntry::normal(
                storage_name,
                config.storage_field_descriptor.as_str(),
                FieldFlags::new(STORAGE_FIELD_FLAGS),
            ));
        }

        let mut pending = Vec::new();
        let added_fields: Vec<AddedFieldRecord> = added_instance
            .iter()
            .enumerate()
            .map(|(ordinal, field)| -> Result<AddedFieldRecord, RedefineError> {
                Ok(AddedFieldRecord {
                    ordinal,
                    name: field.name(&class.cp)?.to_string(),
                    descriptor: field.descriptor(&class.cp)?.to_string(),
                    owner: owner.clone(),
                    loader: loader.clone(),
                })
            })
            .collect::<Result<_, _>>()?;
        let layout = Arc::new(StorageLayout::from_records(owner.as_str(), &added_fields)?);
        for (record, field) in added_fields.iter().zip(&added_instance) {
            let accessor = FieldAccessor::new(record.ordinal, layout.clone());
            let (proxy, definition) =
                instance_accessor_for(self.ctx, &owner, class.major_version, field, &class.cp, accessor)?;
            view.fields.push(FieldSchemaEntry::fake(
                record.name.as_str(),
                record.descriptor.as_str(),
                field.access_flags,
                proxy,
            ));
            pending.push(definition);
        }

        let mut static_redirects = Vec::with_capacity(added_static.len());
        for field in &added_static {
            let (holder, definition) =
                static_holder_for(self.ctx, &owner, class.major_version, field, &class.cp)?;
            let name = field.name(&class.cp)?.to_string();
            let descriptor = field.descriptor(&class.cp)?.to_string();
            recorded.push((
                holder.clone(),
                name.clone(),
                descriptor.clone(),
                field.visible_annotations(&class.cp)?,
            ));
            view.fields.push(FieldSchemaEntry::fake(
                name.as_str(),
                descriptor.as_str(),
                field.access_flags,
                holder.as_str(),
            ));
            static_redirects.push(StaticFieldRedirect {
                owner: owner.clone(),
                holder,
                field_name: name,
                descriptor,
                loader: loader.clone(),
            });
            pending.extend(definition);
        }

        let instrumented_constructors = instrument_constructors(&mut class, config, &added_fields)?;
        let class_bytes = class.to_bytes()?;

        self.ctx.commit(pending);
        for (member_owner, name, descriptor, annotations) in recorded {
            self.annotations
                .record_field_annotations(&member_owner, &name, &descriptor, annotations);
        }
        for record in &added_fields {
            self.rewriter.rewrite_instance_field_access(record);
        }
        for redirect in &static_redirects {
            self.rewriter.rewrite_static_field_access(redirect);
        }
        for record in &removed_fields {
            self.rewriter.rewrite_removed_field_access(record);
        }
        debug_log!(
            "Reconciled {owner}: {} added instance, {} added static, {} removed",
            added_fields.len(),
            static_redirects.len(),
            removed_fields.len()
        );

        Ok(RedefinitionOutcome {
            class_bytes,
            added_fields,
            static_redirects,
            removed_fields,
            schema: view,
            instrumented_constructors,
        })
    }
}
