mod common;

use common::{
    HostObject, Harness, OWNER, PRIVATE, PRIVATE_STATIC, annotate, construct, field_names, person,
};
use hotfield_classfile::ClassFile;
use hotfield_classfile::attribute::annotation::{Annotation, ElementValue};
use hotfield_classfile::attribute::stack_map::parse_frames;
use hotfield_classfile::attribute::{HasAttributes, names};
use hotfield_classfile::bytecode::disassemble;
use hotfield_classfile::field::FieldInfo;
use hotfield_classfile::flags::{ClassFlags, FieldFlags};
use hotfield_runtime::annotations::AnnotationStore;
use hotfield_runtime::error::{LookupError, RedefineError};
use hotfield_runtime::rewriter::RecordingRewriter;
use hotfield_runtime::schema::{ClassSchema, FieldSchemaEntry, MemberKind};
use hotfield_runtime::storage::{InstanceStorage, StorageContainer, Value};
use hotfield_runtime::{
    AccessChangePolicy, DEFAULT_STORAGE_FIELD_DESCRIPTOR, DEFAULT_STORAGE_FIELD_NAME, FieldReconciler,
    RedefineConfig, prepare_for_redefinition,
};

const STRING: &str = "Ljava/lang/String;";

fn loaded(fields: &[(&str, &str, u16)]) -> ClassFile {
    let mut class = person(52, fields);
    assert!(prepare_for_redefinition(&mut class, &RedefineConfig::default()).unwrap());
    class
}

fn visible(schema: &ClassSchema) -> Vec<FieldSchemaEntry> {
    schema.visible_fields(DEFAULT_STORAGE_FIELD_NAME).cloned().collect()
}

fn constructor_listing(class: &ClassFile, descriptor: &str) -> String {
    let index = class.find_method("<init>", descriptor).unwrap().unwrap();
    let code = class.methods[index].code(&class.cp).unwrap().unwrap();
    disassemble(&code.code, &class.cp).unwrap()
}

#[derive(Default)]
struct Instance {
    storage: Option<StorageContainer>,
}

impl InstanceStorage for Instance {
    fn container(&self) -> Option<&StorageContainer> {
        self.storage.as_ref()
    }

    fn container_mut(&mut self) -> &mut Option<StorageContainer> {
        &mut self.storage
    }
}

#[test]
fn added_instance_fields_move_to_storage() {
    let harness = Harness::new(&loaded(&[("count", "I", PRIVATE)]));
    let new = person(52, &[("count", "I", PRIVATE), ("name", STRING, PRIVATE), ("age", "I", PRIVATE)]);

    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    assert_eq!(field_names(&output), ["count", DEFAULT_STORAGE_FIELD_NAME]);
    let added: Vec<_> = outcome
        .added_fields
        .iter()
        .map(|r| (r.ordinal, r.name.as_str(), r.descriptor.as_str()))
        .collect();
    assert_eq!(added, [(0, "name", STRING), (1, "age", "I")]);
    assert_eq!(outcome.instrumented_constructors, 2);
    assert!(outcome.removed_fields.is_empty());

    let proxies = harness.ctx.proxies_of(OWNER);
    assert_eq!(proxies, ["org/hotfield/proxy/FieldProxy$0", "org/hotfield/proxy/FieldProxy$1"]);
    for (proxy, field) in proxies.iter().zip(["name", "age"]) {
        let bytes = harness.store.load(harness.ctx.scope(), proxy).unwrap();
        let proxy_class = ClassFile::parse(&bytes).unwrap();
        assert_eq!(field_names(&proxy_class), [field]);
        assert_eq!(proxy_class.fields[0].access_flags, FieldFlags::new(PRIVATE));
    }

    assert_eq!(
        visible(&outcome.schema),
        [
            FieldSchemaEntry::normal("count", "I", FieldFlags::new(PRIVATE)),
            FieldSchemaEntry::fake("name", STRING, FieldFlags::new(PRIVATE), proxies[0].as_str()),
            FieldSchemaEntry::fake("age", "I", FieldFlags::new(PRIVATE), proxies[1].as_str()),
        ]
    );
    assert_eq!(harness.rewriter.instance_requests(), outcome.added_fields);
}

#[test]
fn constructor_prologue_listing() {
    let harness = Harness::new(&loaded(&[]));
    let new = person(52, &[("name", STRING, PRIVATE), ("age", "I", PRIVATE)]);
    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    insta::assert_snapshot!(constructor_listing(&output, "()V").trim_end(), @r"
    0000: aload0
    0001: invokespecial java/lang/Object.<init>:()V
    0004: aload0
    0005: getfield com/example/Person.$hotfield_data:[Ljava/lang/Object;
    0008: ifnonnull 32
    0011: aload0
    0012: iconst2
    0013: anewarray java/lang/Object
    0016: dupx1
    0017: putfield com/example/Person.$hotfield_data:[Ljava/lang/Object;
    0020: dup
    0021: iconst0
    0022: aconstnull
    0023: aastore
    0024: dup
    0025: iconst1
    0026: iconst0
    0027: invokestatic java/lang/Integer.valueOf:(I)Ljava/lang/Integer;
    0030: aastore
    0031: pop
    0032: return
    ");

    let index = output.find_method("<init>", "()V").unwrap().unwrap();
    let code = output.methods[index].code(&output.cp).unwrap().unwrap();
    assert_eq!(code.max_stack, 4);
    let frames = code.find_attribute(&output.cp, names::STACK_MAP_TABLE).unwrap().unwrap();
    let frames = parse_frames(&frames.info).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].offset_delta(), 32);
}

#[test]
fn old_class_files_get_no_stack_map() {
    let mut old = person(49, &[]);
    prepare_for_redefinition(&mut old, &RedefineConfig::default()).unwrap();
    let harness = Harness::new(&old);
    let outcome = harness
        .reconciler()
        .reconcile(&harness.loaded, person(49, &[("age", "I", PRIVATE)]))
        .unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();
    let index = output.find_method("<init>", "()V").unwrap().unwrap();
    let code = output.methods[index].code(&output.cp).unwrap().unwrap();
    assert!(code.find_attribute(&output.cp, names::STACK_MAP_TABLE).unwrap().is_none());
}

#[test]
fn constructed_instances_start_with_defaults() {
    let harness = Harness::new(&loaded(&[]));
    let new = person(52, &[("name", STRING, PRIVATE), ("age", "I", PRIVATE), ("score", "D", PRIVATE)]);
    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    let mut object = HostObject::new();
    construct(&output, "()V", &mut object);
    assert_eq!(object.allocations, 1);
    assert_eq!(
        object.container().unwrap().values(),
        &[Value::Null, Value::Integer(0), Value::Double(0.0)]
    );
}

#[test]
fn delegating_constructor_allocates_once() {
    let harness = Harness::new(&loaded(&[]));
    let outcome = harness
        .reconciler()
        .reconcile(&harness.loaded, person(52, &[("age", "I", PRIVATE)]))
        .unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    let mut object = HostObject::new();
    construct(&output, "(I)V", &mut object);
    assert_eq!(object.allocations, 1);
    assert_eq!(object.container().unwrap().values(), &[Value::Integer(0)]);
}

#[test]
fn prologue_keeps_existing_storage() {
    let harness = Harness::new(&loaded(&[]));
    let outcome = harness
        .reconciler()
        .reconcile(&harness.loaded, person(52, &[("name", STRING, PRIVATE), ("age", "I", PRIVATE)]))
        .unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    let mut object = HostObject::new();
    construct(&output, "()V", &mut object);
    object.write_slot(1, Value::Integer(41));
    construct(&output, "()V", &mut object);
    assert_eq!(object.allocations, 1);
    assert_eq!(
        object.container().unwrap().values(),
        &[Value::Null, Value::Integer(41)]
    );
}

#[test]
fn accessors_read_back_writes() {
    let harness = Harness::new(&loaded(&[]));
    let outcome = harness
        .reconciler()
        .reconcile(&harness.loaded, person(52, &[("name", STRING, PRIVATE), ("age", "I", PRIVATE)]))
        .unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();
    let proxies = harness.ctx.proxies_of(OWNER);
    let name = harness.ctx.accessor(&proxies[0]).unwrap();
    let age = harness.ctx.accessor(&proxies[1]).unwrap();

    let mut object = HostObject::new();
    construct(&output, "()V", &mut object);
    let mut constructed = Instance {
        storage: object.container(),
    };
    assert_eq!(age.get(&constructed).unwrap(), Value::Integer(0));
    age.set(&mut constructed, Value::Integer(41)).unwrap();
    name.set(&mut constructed, Value::Ref(3)).unwrap();
    assert_eq!(age.get(&constructed).unwrap(), Value::Integer(41));
    assert_eq!(name.get(&constructed).unwrap(), Value::Ref(3));

    let mut older = Instance::default();
    assert_eq!(name.get(&older).unwrap(), Value::Null);
    age.set(&mut older, Value::Integer(7)).unwrap();
    assert_eq!(older.storage.unwrap().values(), &[Value::Null, Value::Integer(7)]);
}

#[test]
fn storage_built_by_an_earlier_version_survives() {
    let harness = Harness::new(&loaded(&[]));
    let first = harness
        .reconciler()
        .reconcile(&harness.loaded, person(52, &[("age", "I", PRIVATE)]))
        .unwrap();
    let output = ClassFile::parse(&first.class_bytes).unwrap();
    let mut object = HostObject::new();
    construct(&output, "()V", &mut object);
    object.write_slot(0, Value::Integer(9));

    let second = harness
        .reconciler()
        .reconcile(&first.schema, person(52, &[("age", "I", PRIVATE)]))
        .unwrap();
    assert_eq!(second.added_fields[0].ordinal, 0);
    let second = ClassFile::parse(&second.class_bytes).unwrap();
    let mut reused = HostObject::with_container(&object.container().unwrap());
    construct(&second, "()V", &mut reused);
    assert_eq!(reused.allocations, 0);
    assert_eq!(reused.container().unwrap().values(), &[Value::Integer(9)]);
}

#[test]
fn chained_passes_keep_storage_for_added_fields() {
    let old = loaded(&[("count", "I", PRIVATE)]);
    let shape = field_names(&old);
    let harness = Harness::new(&old);
    let with_name = || person(52, &[("count", "I", PRIVATE), ("name", STRING, PRIVATE)]);

    let first = harness.reconciler().reconcile(&harness.loaded, with_name()).unwrap();
    assert_eq!(field_names(&ClassFile::parse(&first.class_bytes).unwrap()), shape);
    let mut object = HostObject::new();
    construct(&ClassFile::parse(&first.class_bytes).unwrap(), "()V", &mut object);
    object.write_slot(0, Value::Ref(5));

    let second = harness.reconciler().reconcile(&first.schema, with_name()).unwrap();
    let output = ClassFile::parse(&second.class_bytes).unwrap();
    assert_eq!(field_names(&output), shape);
    assert_eq!(second.added_fields[0].ordinal, 0);
    assert!(second.removed_fields.is_empty());
    let mut reused = HostObject::with_container(&object.container().unwrap());
    construct(&output, "()V", &mut reused);
    assert_eq!(reused.allocations, 0);
    assert_eq!(reused.container().unwrap().values(), &[Value::Ref(5)]);

    let third = harness
        .reconciler()
        .reconcile(&second.schema, person(52, &[("count", "I", PRIVATE)]))
        .unwrap();
    assert_eq!(field_names(&ClassFile::parse(&third.class_bytes).unwrap()), shape);
    assert!(third.added_fields.is_empty());
    assert!(third.removed_fields.is_empty());
    assert_eq!(third.schema, harness.loaded);
}

#[test]
fn chained_passes_keep_removed_shells() {
    let mut old = loaded(&[("x", "I", PRIVATE), ("y", STRING, PRIVATE | FieldFlags::ACC_FINAL)]);
    let marker = Annotation::new("Lcom/example/Tag;");
    annotate(&mut old, "y", STRING, &[marker.clone()]);
    let shape = field_names(&old);
    let harness = Harness::new(&old);
    let only_x = || person(52, &[("x", "I", PRIVATE)]);

    let first = harness.reconciler().reconcile(&harness.loaded, only_x()).unwrap();
    let second = harness.reconciler().reconcile(&first.schema, only_x()).unwrap();
    let output = ClassFile::parse(&second.class_bytes).unwrap();

    assert_eq!(field_names(&output), shape);
    assert_eq!(output.fields[1].access_flags, FieldFlags::new(PRIVATE | FieldFlags::ACC_FINAL));
    assert_eq!(output.fields[1].visible_annotations(&output.cp).unwrap(), Some(vec![marker]));
    assert!(second.removed_fields.is_empty());
    assert_eq!(harness.rewriter.removed_requests().len(), 1);
    assert_eq!(second.schema, first.schema);
    assert_eq!(
        visible(&second.schema),
        [FieldSchemaEntry::normal("x", "I", FieldFlags::new(PRIVATE))]
    );
}

#[test]
fn unchanged_pass_reproduces_the_loaded_schema() {
    let old = loaded(&[("count", "I", PRIVATE), ("total", "J", PRIVATE_STATIC)]);
    let shape = field_names(&old);
    let harness = Harness::new(&old);
    let same = || person(52, &[("count", "I", PRIVATE), ("total", "J", PRIVATE_STATIC)]);

    let first = harness.reconciler().reconcile(&harness.loaded, same()).unwrap();
    assert_eq!(first.schema, harness.loaded);
    let second = harness.reconciler().reconcile(&first.schema, same()).unwrap();
    assert_eq!(field_names(&ClassFile::parse(&second.class_bytes).unwrap()), shape);
    assert_eq!(second.schema, harness.loaded);
    assert_eq!(second.instrumented_constructors, 0);
    assert!(harness.rewriter.is_empty());
    assert!(harness.store.is_empty());
}

#[test]
fn removed_field_stays_as_shell() {
    let mut old = loaded(&[("x", "I", PRIVATE), ("y", STRING, PRIVATE | FieldFlags::ACC_FINAL)]);
    let marker = Annotation::new("Lcom/example/Tag;").with_element("value", ElementValue::String("y".into()));
    annotate(&mut old, "y", STRING, &[marker.clone()]);
    let harness = Harness::new(&old);
    let new = person(52, &[("x", "I", PRIVATE)]);
    let untouched = constructor_listing(&new, "()V");

    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    assert_eq!(field_names(&output), ["x", "y", DEFAULT_STORAGE_FIELD_NAME]);
    let y = &output.fields[1];
    assert_eq!(y.access_flags, FieldFlags::new(PRIVATE | FieldFlags::ACC_FINAL));
    assert_eq!(y.visible_annotations(&output.cp).unwrap(), Some(vec![marker]));
    assert_eq!(outcome.removed_fields.len(), 1);
    assert_eq!(outcome.removed_fields[0].name, "y");
    assert_eq!(harness.rewriter.removed_requests(), outcome.removed_fields);
    assert!(outcome.added_fields.is_empty());
    assert_eq!(outcome.instrumented_constructors, 0);
    assert!(harness.store.is_empty());
    assert_eq!(constructor_listing(&output, "()V"), untouched);
    assert_eq!(
        visible(&outcome.schema),
        [FieldSchemaEntry::normal("x", "I", FieldFlags::new(PRIVATE))]
    );
    assert_eq!(outcome.schema.fields[1].kind, MemberKind::Removed);
}

#[test]
fn matched_field_keeps_loaded_annotations() {
    let old_tag = Annotation::new("Lcom/example/Old;").with_element("value", ElementValue::Int(1));
    let new_tag = Annotation::new("Lcom/example/New;");
    let mut old = loaded(&[("count", "I", PRIVATE), ("plain", "J", PRIVATE)]);
    annotate(&mut old, "count", "I", &[old_tag.clone()]);
    let harness = Harness::new(&old);

    let mut new = person(52, &[("count", "I", PRIVATE), ("plain", "J", PRIVATE)]);
    annotate(&mut new, "count", "I", &[new_tag.clone()]);
    annotate(&mut new, "plain", "J", &[new_tag.clone()]);
    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    assert_eq!(output.fields[0].visible_annotations(&output.cp).unwrap(), Some(vec![old_tag]));
    assert_eq!(output.fields[1].visible_annotations(&output.cp).unwrap(), None);
    assert_eq!(
        harness.annotations.recorded_annotations(OWNER, "count", "I"),
        Some(vec![new_tag.clone()])
    );
    assert_eq!(harness.annotations.recorded_annotations(OWNER, "plain", "J"), Some(vec![new_tag]));
}

#[test]
fn static_field_reuses_its_holder() {
    let harness = Harness::new(&loaded(&[]));
    let new = || person(52, &[("cache", "Ljava/util/Map;", PRIVATE_STATIC)]);

    let first = harness.reconciler().reconcile(&harness.loaded, new()).unwrap();
    let output = ClassFile::parse(&first.class_bytes).unwrap();
    assert_eq!(field_names(&output), [DEFAULT_STORAGE_FIELD_NAME]);
    assert_eq!(first.instrumented_constructors, 0);
    let holder = first.static_redirects[0].holder.clone();
    assert_eq!(holder, "com/example/Person$StaticFieldHolder$0");

    let bytes = harness.store.load(harness.ctx.scope(), &holder).unwrap();
    let holder_class = ClassFile::parse(&bytes).unwrap();
    assert!(holder_class.access_flags.is_public());
    assert_eq!(field_names(&holder_class), ["cache"]);
    assert_eq!(
        holder_class.fields[0].access_flags,
        FieldFlags::new(FieldFlags::ACC_PUBLIC | FieldFlags::ACC_STATIC)
    );

    let second = harness.reconciler().reconcile(&first.schema, new()).unwrap();
    assert_eq!(second.static_redirects[0].holder, holder);
    assert_eq!(harness.store.len(), 1);
    assert_eq!(harness.rewriter.static_requests().len(), 2);
    assert_eq!(
        field_names(&ClassFile::parse(&second.class_bytes).unwrap()),
        [DEFAULT_STORAGE_FIELD_NAME]
    );
    assert_eq!(
        visible(&second.schema),
        [FieldSchemaEntry::fake(
            "cache",
            "Ljava/util/Map;",
            FieldFlags::new(PRIVATE_STATIC),
            holder.as_str()
        )]
    );
}

#[test]
fn static_holder_annotations_are_recorded() {
    let harness = Harness::new(&loaded(&[]));
    let tag = Annotation::new("Lcom/example/Config;");
    let mut new = person(52, &[("LIMIT", "I", PRIVATE_STATIC)]);
    annotate(&mut new, "LIMIT", "I", &[tag.clone()]);
    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let holder = &outcome.static_redirects[0].holder;
    assert_eq!(
        harness.annotations.recorded_annotations(holder, "LIMIT", "I"),
        Some(vec![tag])
    );
}

#[test]
fn access_change_is_treated_as_new_field() {
    let harness = Harness::new(&loaded(&[("count", "I", PRIVATE)]));
    let new = person(52, &[("count", "I", FieldFlags::ACC_PUBLIC)]);
    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    assert_eq!(field_names(&output), ["count", DEFAULT_STORAGE_FIELD_NAME]);
    assert_eq!(output.fields[0].access_flags, FieldFlags::new(PRIVATE));
    assert_eq!(outcome.added_fields.len(), 1);
    assert_eq!(outcome.removed_fields.len(), 1);
    assert_eq!(outcome.schema.fields[0].kind, MemberKind::Removed);
    assert!(matches!(
        &visible(&outcome.schema)[0].kind,
        MemberKind::Fake { .. }
    ));
}

#[test]
fn access_change_can_be_rejected() {
    let old = loaded(&[("count", "I", PRIVATE)]);
    let config = RedefineConfig {
        access_change_policy: AccessChangePolicy::Reject,
        ..RedefineConfig::default()
    };
    let harness = Harness::with_config(&old, config);
    let new = person(52, &[("count", "I", FieldFlags::ACC_PUBLIC), ("extra", "I", PRIVATE)]);
    let err = harness.reconciler().reconcile(&harness.loaded, new).unwrap_err();
    assert!(matches!(err, RedefineError::AccessChange { ref name, .. } if name == "count"));
    assert!(harness.store.is_empty());
    assert!(harness.rewriter.is_empty());
}

#[test]
fn static_modifier_change_is_tolerated() {
    let harness = Harness::new(&loaded(&[("count", "I", PRIVATE)]));
    let new = person(52, &[("count", "I", PRIVATE_STATIC)]);
    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    assert_eq!(output.fields[0].access_flags, FieldFlags::new(PRIVATE));
    assert!(outcome.added_fields.is_empty());
    assert!(outcome.static_redirects.is_empty());
    assert!(outcome.removed_fields.is_empty());
}

#[test]
fn declared_storage_field_is_replaced() {
    let harness = Harness::new(&loaded(&[]));
    let new = person(
        52,
        &[(DEFAULT_STORAGE_FIELD_NAME, DEFAULT_STORAGE_FIELD_DESCRIPTOR, PRIVATE), ("age", "I", PRIVATE)],
    );
    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();

    assert_eq!(field_names(&output), [DEFAULT_STORAGE_FIELD_NAME]);
    assert_eq!(
        output.fields[0].access_flags,
        FieldFlags::new(FieldFlags::ACC_PUBLIC | FieldFlags::ACC_TRANSIENT | FieldFlags::ACC_SYNTHETIC)
    );
    let added: Vec<_> = outcome.added_fields.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(added, ["age"]);
}

#[test]
fn unprepared_class_gets_storage_appended() {
    let old = person(52, &[("count", "I", PRIVATE)]);
    let harness = Harness::new(&old);
    let new = person(52, &[("count", "I", PRIVATE), ("age", "I", PRIVATE)]);
    let outcome = harness.reconciler().reconcile(&harness.loaded, new).unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();
    assert_eq!(field_names(&output), ["count", DEFAULT_STORAGE_FIELD_NAME]);
    assert_eq!(
        outcome.schema.fields[1],
        FieldSchemaEntry::normal(
            DEFAULT_STORAGE_FIELD_NAME,
            DEFAULT_STORAGE_FIELD_DESCRIPTOR,
            FieldFlags::new(FieldFlags::ACC_PUBLIC | FieldFlags::ACC_TRANSIENT | FieldFlags::ACC_SYNTHETIC)
        )
    );
}

#[test]
fn fake_entries_are_not_redeclared() {
    let old = loaded(&[("count", "I", PRIVATE)]);
    let harness = Harness::new(&old);
    let schema = ClassSchema::from_class_file(&old).unwrap().with_field(FieldSchemaEntry::fake(
        "nickname",
        STRING,
        FieldFlags::new(PRIVATE),
        "org/hotfield/proxy/FieldProxy$9",
    ));
    let outcome = harness
        .reconciler()
        .reconcile(&schema, person(52, &[("count", "I", PRIVATE)]))
        .unwrap();
    let output = ClassFile::parse(&outcome.class_bytes).unwrap();
    assert_eq!(field_names(&output), ["count", DEFAULT_STORAGE_FIELD_NAME]);
    assert!(outcome.removed_fields.is_empty());
}

#[test]
fn unknown_loaded_field_aborts_without_side_effects() {
    let old = loaded(&[("count", "I", PRIVATE)]);
    let annotations = AnnotationStore::new();
    let rewriter = RecordingRewriter::new();
    let harness = Harness::new(&old);
    let reconciler = FieldReconciler::new(&harness.ctx, &annotations, &rewriter);

    let new = person(52, &[("count", "I", PRIVATE), ("age", "I", PRIVATE), ("TOTAL", "J", PRIVATE_STATIC)]);
    let err = reconciler.reconcile(&harness.loaded, new).unwrap_err();
    assert!(matches!(
        err,
        RedefineError::Lookup(LookupError::FieldNotFound { ref name, .. }) if name == "count"
    ));
    assert!(harness.store.is_empty());
    assert!(harness.ctx.proxies_of(OWNER).is_empty());
    assert!(rewriter.is_empty());
    assert!(!annotations.is_recorded(OWNER, "count", "I"));
}

#[test]
fn duplicate_declarations_are_rejected() {
    let harness = Harness::new(&loaded(&[]));
    let mut new = person(52, &[]);
    for _ in 0..2 {
        let field = FieldInfo::new(&mut new.cp, FieldFlags::new(PRIVATE), "age", "I").unwrap();
        new.fields.push(field);
    }
    let err = harness.reconciler().reconcile(&harness.loaded, new).unwrap_err();
    assert!(matches!(err, RedefineError::Duplicate { ref name, .. } if name == "age"));
}

#[test]
fn preparation_is_idempotent() {
    let config = RedefineConfig::default();
    let mut class = person(52, &[("count", "I", PRIVATE)]);
    assert!(prepare_for_redefinition(&mut class, &config).unwrap());
    assert!(!prepare_for_redefinition(&mut class, &config).unwrap());
    assert_eq!(field_names(&class), ["count", DEFAULT_STORAGE_FIELD_NAME]);

    let mut interface = ClassFile::new(
        52,
        ClassFlags::new(ClassFlags::ACC_PUBLIC | ClassFlags::ACC_INTERFACE | ClassFlags::ACC_ABSTRACT),
        "com/example/Api",
        "java/lang/Object",
    )
    .unwrap();
    assert!(!prepare_for_redefinition(&mut interface, &config).unwrap());
    assert!(interface.fields.is_empty());
}
