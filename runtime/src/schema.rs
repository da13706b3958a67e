use hotfield_classfile::ClassFile;
use hotfield_classfile::error::ClassFormatErr;
use hotfield_classfile::flags::FieldFlags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    /// Physically declared by the loaded class.
    Normal,
    /// Still declared by the loaded class as an inert shell, but gone from reflection.
    Removed,
    /// Reported reflectively but backed by a generated type.
    Fake { proxy_type: String },
}

impl MemberKind {
    pub fn is_normal(&self) -> bool {
        matches!(self, MemberKind::Normal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchemaEntry {
    pub name: String,
    pub descriptor: String,
    pub access_flags: FieldFlags,
    pub kind: MemberKind,
}

impl FieldSchemaEntry {
    pub fn normal(name: impl Into<String>, descriptor: impl Into<String>, access_flags: FieldFlags) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access_flags,
            kind: MemberKind::Normal,
        }
    }

    pub fn fake(
        name: impl Into<String>,
        descriptor: impl Into<String>,
        access_flags: FieldFlags,
        proxy_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access_flags,
            kind: MemberKind::Fake {
                proxy_type: proxy_type.into(),
            },
        }
    }

    /// The same field, kept declared after the class stopped declaring it.
    pub fn to_removed(&self) -> Self {
        Self {
            kind: MemberKind::Removed,
            ..self.clone()
        }
    }

    pub fn same_member(&self, name: &str, descriptor: &str) -> bool {
        self.name == name && self.descriptor == descriptor
    }
}

/// Ordered field table of a class as the host currently knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSchema {
    pub class_name: String,
    pub fields: Vec<FieldSchemaEntry>,
}

impl ClassSchema {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, entry: FieldSchemaEntry) -> Self {
        self.fields.push(entry);
        self
    }

    /// Every declared field of `class` as a `Normal` entry, in declaration order.
    pub fn from_class_file(class: &ClassFile) -> Result<Self, ClassFormatErr> {
        let fields = class
            .fields
            .iter()
            .map(|field| -> Result<FieldSchemaEntry, ClassFormatErr> {
                Ok(FieldSchemaEntry::normal(
                    field.name(&class.cp)?,
                    field.descriptor(&class.cp)?,
                    field.access_flags,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            class_name: class.name()?.to_string(),
            fields,
        })
    }

    pub fn find(&self, name: &str, descriptor: &str) -> Option<&FieldSchemaEntry> {
        self.fields.iter().find(|e| e.same_member(name, descriptor))
    }

    pub fn fake_fields(&self) -> impl Iterator<Item = &FieldSchemaEntry> {
        self.fields
            .iter()
            .filter(|e| matches!(e.kind, MemberKind::Fake { .. }))
    }

    /// Fields reflection reports: removed shells and the storage field are hidden.
    pub fn visible_fields<'a>(&'a self, storage_field_name: &'a str) -> impl Iterator<Item = &'a FieldSchemaEntry> {
        self.fields.iter().filter(move |e| match e.kind {
            MemberKind::Normal => e.name != storage_field_name,
            MemberKind::Removed => false,
            MemberKind::Fake { .. } => true,
        })
    }
}
