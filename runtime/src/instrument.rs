//! Constructor prologue that allocates the storage array for added instance fields.
//!
//! Right after the superclass (or delegated) constructor call, every constructor gets:
//!
//! ```text
//! aload_0; getfield <storage>; ifnonnull END
//! aload_0; <size>; anewarray Object; dup_x1; putfield <storage>
//! (dup; <ordinal>; <boxed default>; aastore)*
//! pop
//! END:
//! ```
//!
//! The null check keeps the array a delegating `this(..)` call already built.

use crate::RedefineConfig;
use crate::debug_log;
use crate::error::RedefineError;
use crate::rewriter::AddedFieldRecord;
use crate::storage::StorageLayout;
use hotfield_classfile::ClassFile;
use hotfield_classfile::attribute::stack_map::{VerificationType, initial_locals};
use hotfield_classfile::bytecode::builder::Bytecode;
use hotfield_classfile::bytecode::insert::{Insertion, insert_code};
use hotfield_classfile::bytecode::opcode::Opcode;
use hotfield_classfile::bytecode::skip_constructor;
use hotfield_classfile::constant::pool::ConstantPool;
use hotfield_classfile::error::{ClassFormatErr, ConstructionErr};
use hotfield_classfile::method::CONSTRUCTOR_NAME;
use hotfield_common::descriptor::MethodDescriptor;
use hotfield_common::jtype::JavaType;

const STORAGE_ELEMENT_CLASS: &str = "java/lang/Object";

fn push_default(code: &mut Bytecode, cp: &mut ConstantPool, ty: &JavaType) -> Result<(), ConstructionErr> {
    match ty.as_primitive() {
        Some(primitive) => {
            let box_class = primitive.box_class();
            let descriptor = format!("({})L{box_class};", primitive.descriptor_char());
            code.push_zero(primitive)
                .invokestatic(cp, box_class, "valueOf", &descriptor)?;
        }
        None => {
            code.op(Opcode::AconstNull);
        }
    }
    Ok(())
}

/// Check-and-allocate block for `owner`, padded with `nop`s to a multiple of four bytes
/// so `tableswitch`/`lookupswitch` padding after it stays valid.
pub fn storage_initializer(
    cp: &mut ConstantPool,
    owner: &str,
    config: &RedefineConfig,
    layout: &StorageLayout,
) -> Result<Vec<u8>, ConstructionErr> {
    let size = i32::try_from(layout.len()).map_err(|_| ConstructionErr::TooManyItems {
        what: "added fields",
        count: layout.len(),
    })?;
    let storage_name = config.storage_field_name.as_str();
    let storage_desc = config.storage_field_descriptor.as_str();

    let mut init = Bytecode::new();
    init.aload(0).push_int(cp, size)?;
    init.anewarray(cp, STORAGE_ELEMENT_CLASS)?
        .op(Opcode::DupX1)
        .putfield(cp, owner, storage_name, storage_desc)?;
    for (ordinal, ty) in layout.slots.iter().enumerate() {
        init.op(Opcode::Dup).push_int(cp, ordinal as i32)?;
        push_default(&mut init, cp, ty)?;
        init.op(Opcode::Aastore);
    }
    init.op(Opcode::Pop);

    let mut check = Bytecode::new();
    check.aload(0).getfield(cp, owner, storage_name, storage_desc)?;
    let branch = check.branch(Opcode::Ifnonnull);
    let end = (check.len() + init.len()).next_multiple_of(4);
    check.patch_branch(branch, end)?;

    let mut block = check.into_bytes();
    block.extend_from_slice(init.as_slice());
    block.resize(end, Opcode::Nop.into());
    Ok(block)
}

/// Adds the storage prologue to every constructor of `class`. Returns how many were changed.
pub fn instrument_constructors(
    class: &mut ClassFile,
    config: &RedefineConfig,
    records: &[AddedFieldRecord],
) -> Result<usize, RedefineError> {
    if records.is_empty() {
        return Ok(0);
    }
    let owner = class.name()?.to_string();
    let layout = StorageLayout::from_records(owner.as_str(), records)?;
    let this_class = class.this_class;
    let requires_stack_map = class.requires_stack_map();
    let ClassFile { cp, methods, .. } = class;

    let block = storage_initializer(cp, &owner, config, &layout)?;
    let mut instrumented = 0;
    for method in methods.iter_mut() {
        if !method.is_constructor(cp)? {
            continue;
        }
        let Some(mut code) = method.code(cp)? else {
            continue;
        };
        let descriptor_str = method.descriptor(cp)?.to_string();
        let descriptor = MethodDescriptor::try_from(descriptor_str.as_str()).map_err(ClassFormatErr::from)?;
        let position = skip_constructor(&code.code, cp)?.ok_or_else(|| {
            ConstructionErr::ConstructorCallNotFound {
                method: format!("{owner}.{CONSTRUCTOR_NAME}{descriptor_str}"),
            }
        })?;

        let entry_locals = initial_locals(cp, this_class, false, true, &descriptor)?;
        let join_locals = requires_stack_map.then(|| {
            entry_locals
                .iter()
                .map(|local| match local {
                    VerificationType::UninitializedThis => VerificationType::Object(this_class),
                    other => *other,
                })
                .collect()
        });
        insert_code(
            &mut code,
            cp,
            &entry_locals,
            Insertion {
                position,
                block: &block,
                join_locals,
            },
        )?;
        method.set_code(cp, &code)?;
        debug_log!("Instrumented {owner}.{CONSTRUCTOR_NAME}{descriptor_str} at offset {position}");
        instrumented += 1;
    }
    Ok(instrumented)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::LoaderScope;
    use hotfield_classfile::bytecode::disassemble;
    use rstest::rstest;

    fn records(descriptors: &[&str]) -> Vec<AddedFieldRecord> {
        descriptors
            .iter()
            .enumerate()
            .map(|(ordinal, desc)| AddedFieldRecord {
                ordinal,
                name: format!("f{ordinal}"),
                descriptor: desc.to_string(),
                owner: "a/B".into(),
                loader: LoaderScope::bootstrap(),
            })
            .collect()
    }

    #[rstest]
    #[case(&["I"])]
    #[case(&["Ljava/lang/String;", "J", "Z"])]
    #[case(&["D", "D", "D", "D", "D", "D", "D"])]
    fn block_is_word_aligned_and_jumps_to_its_end(#[case] descriptors: &[&str]) {
        let layout = StorageLayout::from_records("a/B", &records(descriptors)).unwrap();
        let mut cp = ConstantPool::new();
        let block = storage_initializer(&mut cp, "a/B", &RedefineConfig::default(), &layout).unwrap();
        assert_eq!(block.len() % 4, 0);
        // aload_0 getfield(3) ifnonnull at offset 4
        assert_eq!(block[4], u8::from(Opcode::Ifnonnull));
        let jump = i16::from_be_bytes([block[5], block[6]]) as usize;
        assert_eq!(4 + jump, block.len());
    }

    #[test]
    fn wide_default_is_boxed() {
        let layout = StorageLayout::from_records("a/B", &records(&["J"])).unwrap();
        let mut cp = ConstantPool::new();
        let mut code = storage_initializer(&mut cp, "a/B", &RedefineConfig::default(), &layout).unwrap();
        // the null check jumps past the block, so give it somewhere to land
        code.push(Opcode::Return.into());
        let listing = disassemble(&code, &cp).unwrap();
        assert!(listing.contains("lconst0"));
        assert!(listing.contains("invokestatic java/lang/Long.valueOf:(J)Ljava/lang/Long;"));
    }
}
