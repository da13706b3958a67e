#![allow(dead_code)]

use hotfield_classfile::ClassFile;
use hotfield_classfile::attribute::HasAttributes;
use hotfield_classfile::attribute::annotation::Annotation;
use hotfield_classfile::attribute::code::CodeAttribute;
use hotfield_classfile::bytecode::builder::Bytecode;
use hotfield_classfile::bytecode::decode_at;
use hotfield_classfile::bytecode::jump_targets;
use hotfield_classfile::bytecode::opcode::Opcode;
use hotfield_classfile::field::FieldInfo;
use hotfield_classfile::flags::{ClassFlags, FieldFlags, MethodFlags};
use hotfield_classfile::method::MethodInfo;
use hotfield_common::descriptor::MethodDescriptor;
use hotfield_runtime::annotations::AnnotationStore;
use hotfield_runtime::rewriter::RecordingRewriter;
use hotfield_runtime::schema::ClassSchema;
use hotfield_runtime::storage::{StorageContainer, Value};
use hotfield_runtime::{
    FieldReconciler, LoaderScope, ProxyDefinitionStore, RedefineConfig, RedefinitionContext,
    DEFAULT_STORAGE_FIELD_NAME,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

pub const OWNER: &str = "com/example/Person";
pub const PRIVATE: u16 = FieldFlags::ACC_PRIVATE;
pub const PRIVATE_STATIC: u16 = FieldFlags::ACC_PRIVATE | FieldFlags::ACC_STATIC;

/// `OWNER` with the given fields, a no-arg constructor calling `Object.<init>` and an
/// `(I)V` constructor delegating to it.
pub fn person(major_version: u16, fields: &[(&str, &str, u16)]) -> ClassFile {
    let mut class = ClassFile::new(
        major_version,
        ClassFlags::new(ClassFlags::ACC_PUBLIC | ClassFlags::ACC_SUPER),
        OWNER,
        "java/lang/Object",
    )
    .unwrap();
    for (name, desc, flags) in fields {
        let field = FieldInfo::new(&mut class.cp, FieldFlags::new(*flags), name, desc).unwrap();
        class.add_field(field).unwrap();
    }

    let mut no_arg = Bytecode::new();
    no_arg
        .aload(0)
        .invokespecial(&mut class.cp, "java/lang/Object", "<init>", "()V")
        .unwrap()
        .op(Opcode::Return);
    add_constructor(&mut class, "()V", no_arg.into_bytes(), 1);

    let mut delegating = Bytecode::new();
    delegating
        .aload(0)
        .invokespecial(&mut class.cp, OWNER, "<init>", "()V")
        .unwrap()
        .op(Opcode::Return);
    add_constructor(&mut class, "(I)V", delegating.into_bytes(), 2);
    class
}

fn add_constructor(class: &mut ClassFile, descriptor: &str, code: Vec<u8>, max_locals: u16) {
    let mut method = MethodInfo::new(
        &mut class.cp,
        MethodFlags::new(MethodFlags::ACC_PUBLIC),
        "<init>",
        descriptor,
    )
    .unwrap();
    method
        .set_code(&mut class.cp, &CodeAttribute::new(1, max_locals, code))
        .unwrap();
    class.add_method(method).unwrap();
}

pub fn annotate(class: &mut ClassFile, name: &str, descriptor: &str, annotations: &[Annotation]) {
    let index = class.find_field(name, descriptor).unwrap().unwrap();
    let ClassFile { cp, fields, .. } = class;
    fields[index].set_visible_annotations(cp, annotations).unwrap();
}

pub fn field_names(class: &ClassFile) -> Vec<String> {
    class
        .fields
        .iter()
        .map(|f| f.name(&class.cp).unwrap().to_string())
        .collect()
}

/// Everything one loader scope needs, seeded with the loaded version of a class.
pub struct Harness {
    pub ctx: RedefinitionContext,
    pub store: Arc<ProxyDefinitionStore>,
    pub annotations: AnnotationStore,
    pub rewriter: RecordingRewriter,
    pub loaded: ClassSchema,
}

impl Harness {
    pub fn new(loaded: &ClassFile) -> Self {
        Self::with_config(loaded, RedefineConfig::default())
    }

    pub fn with_config(loaded: &ClassFile, config: RedefineConfig) -> Self {
        let store = Arc::new(ProxyDefinitionStore::new());
        let ctx = RedefinitionContext::new(LoaderScope::new("app"), config, store.clone());
        let annotations = AnnotationStore::new();
        annotations.seed_from_class(loaded).unwrap();
        Self {
            ctx,
            store,
            annotations,
            rewriter: RecordingRewriter::new(),
            loaded: ClassSchema::from_class_file(loaded).unwrap(),
        }
    }

    pub fn reconciler(&self) -> FieldReconciler<'_> {
        FieldReconciler::new(&self.ctx, &self.annotations, &self.rewriter)
    }
}

#[derive(Debug, Clone)]
enum Operand {
    This,
    Array(Rc<RefCell<Vec<Value>>>),
    Value(Value),
}

/// An instance being constructed: only the storage field is modelled.
#[derive(Debug, Default)]
pub struct HostObject {
    storage: Option<Rc<RefCell<Vec<Value>>>>,
    pub allocations: usize,
}

impl HostObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(container: &StorageContainer) -> Self {
        Self {
            storage: Some(Rc::new(RefCell::new(container.values().to_vec()))),
            allocations: 0,
        }
    }

    pub fn container(&self) -> Option<StorageContainer> {
        self.storage
            .as_ref()
            .map(|values| StorageContainer::from_values(values.borrow().clone()))
    }

    pub fn write_slot(&self, ordinal: usize, value: Value) {
        if let Some(values) = &self.storage {
            values.borrow_mut()[ordinal] = value;
        }
    }
}

/// Runs the constructor `descriptor` of `class` on `object`. Understands the
/// instructions the test constructors and the storage prologue use.
pub fn construct(class: &ClassFile, descriptor: &str, object: &mut HostObject) {
    let index = class.find_method("<init>", descriptor).unwrap().unwrap();
    let code = class.methods[index].code(&class.cp).unwrap().unwrap().code;
    let mut stack: Vec<Operand> = Vec::new();
    let mut pc = 0;
    loop {
        let insn = decode_at(&code, pc).unwrap();
        let operand = || u16::from_be_bytes([code[pc + 1], code[pc + 2]]);
        let mut next = insn.next_offset();
        match insn.opcode {
            Opcode::Nop => {}
            Opcode::Aload0 => stack.push(Operand::This),
            Opcode::AconstNull => stack.push(Operand::Value(Value::Null)),
            Opcode::IconstM1
            | Opcode::Iconst0
            | Opcode::Iconst1
            | Opcode::Iconst2
            | Opcode::Iconst3
            | Opcode::Iconst4
            | Opcode::Iconst5 => {
                let value = u8::from(insn.opcode) as i32 - u8::from(Opcode::Iconst0) as i32;
                stack.push(Operand::Value(Value::Integer(value)));
            }
            Opcode::Bipush => stack.push(Operand::Value(Value::Integer(code[pc + 1] as i8 as i32))),
            Opcode::Sipush => stack.push(Operand::Value(Value::Integer(operand() as i16 as i32))),
            Opcode::Ldc => {
                let value = class.cp.get_integer(code[pc + 1] as u16).unwrap();
                stack.push(Operand::Value(Value::Integer(value)));
            }
            Opcode::Lconst0 => stack.push(Operand::Value(Value::Long(0))),
            Opcode::Fconst0 => stack.push(Operand::Value(Value::Float(0.0))),
            Opcode::Dconst0 => stack.push(Operand::Value(Value::Double(0.0))),
            Opcode::Dup => {
                let top = stack.last().cloned().unwrap();
                stack.push(top);
            }
            Opcode::DupX1 => {
                let v1 = stack.pop().unwrap();
                let v2 = stack.pop().unwrap();
                stack.push(v1.clone());
                stack.push(v2);
                stack.push(v1);
            }
            Opcode::Pop => {
                stack.pop().unwrap();
            }
            Opcode::Getfield => {
                assert_eq!(class.cp.get_member_ref(operand()).unwrap().name, DEFAULT_STORAGE_FIELD_NAME);
                assert!(matches!(stack.pop(), Some(Operand::This)));
                stack.push(match &object.storage {
                    Some(values) => Operand::Array(values.clone()),
                    None => Operand::Value(Value::Null),
                });
            }
            Opcode::Putfield => {
                assert_eq!(class.cp.get_member_ref(operand()).unwrap().name, DEFAULT_STORAGE_FIELD_NAME);
                let Some(Operand::Array(values)) = stack.pop() else {
                    panic!("storage must be an array");
                };
                assert!(matches!(stack.pop(), Some(Operand::This)));
                object.storage = Some(values);
            }
            Opcode::Ifnonnull => {
                if !matches!(stack.pop(), Some(Operand::Value(Value::Null))) {
                    next = jump_targets(&code, &insn).unwrap()[0];
                }
            }
            Opcode::Anewarray => {
                let Some(Operand::Value(Value::Integer(len))) = stack.pop() else {
                    panic!("array length must be an int");
                };
                object.allocations += 1;
                stack.push(Operand::Array(Rc::new(RefCell::new(vec![Value::Null; len as usize]))));
            }
            Opcode::Aastore => {
                let Some(Operand::Value(value)) = stack.pop() else {
                    panic!("only values are stored");
                };
                let Some(Operand::Value(Value::Integer(index))) = stack.pop() else {
                    panic!("index must be an int");
                };
                let Some(Operand::Array(values)) = stack.pop() else {
                    panic!("aastore needs an array");
                };
                values.borrow_mut()[index as usize] = value;
            }
            // Boxing keeps the value; slots hold boxed values as `Value`s.
            Opcode::InvokeStatic => {
                assert_eq!(class.cp.get_member_ref(operand()).unwrap().name, "valueOf");
            }
            Opcode::InvokeSpecial => {
                let member = class.cp.get_member_ref(operand()).unwrap();
                let params = MethodDescriptor::try_from(member.descriptor).unwrap().param_count();
                for _ in 0..=params {
                    stack.pop().unwrap();
                }
                if member.class_name == OWNER {
                    let delegate = member.descriptor.to_string();
                    construct(class, &delegate, object);
                }
            }
            Opcode::Return => return,
            other => panic!("unsupported instruction {other:?} at {pc}"),
        }
        pc = next;
    }
}
