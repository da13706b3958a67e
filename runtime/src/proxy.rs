//! Generated classes backing fields that could not stay on the redefined class.
//!
//! A static holder is a public class with one public static field that takes over an
//! added static field. An accessor proxy is a public class that declares a field of the
//! same name, flags and metadata as an added instance field, so reflection has a real
//! member to report; its values live in the owner's storage array.

use crate::context::RedefinitionContext;
use crate::debug_log;
use crate::storage::FieldAccessor;
use hotfield_classfile::ClassFile;
use hotfield_classfile::attribute::HasAttributes;
use hotfield_classfile::constant::pool::ConstantPool;
use hotfield_classfile::error::ConstructionErr;
use hotfield_classfile::field::FieldInfo;
use hotfield_classfile::flags::{ClassFlags, FieldFlags};

const PROXY_SUPER: &str = "java/lang/Object";

/// Output of a pass that is only saved and registered once the whole pass succeeded.
#[derive(Debug)]
pub enum PendingDefinition {
    StaticHolder {
        owner: String,
        field_name: String,
        descriptor: String,
        holder: String,
        bytes: Vec<u8>,
    },
    InstanceAccessor {
        owner: String,
        proxy: String,
        bytes: Vec<u8>,
        accessor: FieldAccessor,
    },
}

/// Flags kept from the original field on a holder's field; it is always public static.
fn holder_field_flags(original: FieldFlags) -> FieldFlags {
    let kept = FieldFlags::ACC_VOLATILE
        | FieldFlags::ACC_TRANSIENT
        | FieldFlags::ACC_SYNTHETIC
        | FieldFlags::ACC_ENUM;
    FieldFlags::new(original.raw() & kept).with(FieldFlags::ACC_PUBLIC | FieldFlags::ACC_STATIC)
}

fn single_field_class(
    major_version: u16,
    name: &str,
    field: &FieldInfo,
    source_cp: &ConstantPool,
    flags: FieldFlags,
) -> Result<ClassFile, ConstructionErr> {
    let mut class = ClassFile::new(
        major_version,
        ClassFlags::new(ClassFlags::ACC_PUBLIC | ClassFlags::ACC_SUPER),
        name,
        PROXY_SUPER,
    )?;
    let mut copy = FieldInfo::new(
        &mut class.cp,
        flags,
        field.name(source_cp)?,
        field.descriptor(source_cp)?,
    )?;
    copy.copy_metadata_from(&mut class.cp, field, source_cp)?;
    class.add_field(copy)?;
    Ok(class)
}

pub fn build_static_holder(
    major_version: u16,
    holder: &str,
    field: &FieldInfo,
    source_cp: &ConstantPool,
) -> Result<ClassFile, ConstructionErr> {
    single_field_class(
        major_version,
        holder,
        field,
        source_cp,
        holder_field_flags(field.access_flags),
    )
}

pub fn build_instance_accessor(
    major_version: u16,
    proxy: &str,
    field: &FieldInfo,
    source_cp: &ConstantPool,
) -> Result<ClassFile, ConstructionErr> {
    single_field_class(major_version, proxy, field, source_cp, field.access_flags)
}

/// Holder for an added static field. An existing holder is reused so the field keeps
/// its value across redefinitions; only a new one yields a definition to commit.
pub(crate) fn static_holder_for(
    ctx: &RedefinitionContext,
    owner: &str,
    major_version: u16,
    field: &FieldInfo,
    source_cp: &ConstantPool,
) -> Result<(String, Option<PendingDefinition>), ConstructionErr> {
    let name = field.name(source_cp)?;
    let descriptor = field.descriptor(source_cp)?;
    if let Some(existing) = ctx.holder_for(owner, name, descriptor) {
        debug_log!("Reusing static holder {existing} for {owner}.{name}");
        return Ok((existing, None));
    }
    let holder = ctx.next_holder_name(owner);
    let bytes = build_static_holder(major_version, &holder, field, source_cp)?.to_bytes()?;
    let pending = PendingDefinition::StaticHolder {
        owner: owner.to_string(),
        field_name: name.to_string(),
        descriptor: descriptor.to_string(),
        holder: holder.clone(),
        bytes,
    };
    Ok((holder, Some(pending)))
}

pub(crate) fn instance_accessor_for(
    ctx: &RedefinitionContext,
    owner: &str,
    major_version: u16,
    field: &FieldInfo,
    source_cp: &ConstantPool,
    accessor: FieldAccessor,
) -> Result<(String, PendingDefinition), ConstructionErr> {
    let proxy = ctx.store().next_proxy_name(&ctx.config().proxy_name_prefix);
    let bytes = build_instance_accessor(major_version, &proxy, field, source_cp)?.to_bytes()?;
    let pending = PendingDefinition::InstanceAccessor {
        owner: owner.to_string(),
        proxy: proxy.clone(),
        bytes,
        accessor,
    };
    Ok((proxy, pending))
}
