use crate::error::LookupError;
use dashmap::DashMap;
use hotfield_classfile::ClassFile;
use hotfield_classfile::attribute::HasAttributes;
use hotfield_classfile::attribute::annotation::Annotation;
use hotfield_classfile::error::ClassFormatErr;

/// Reflective annotation data for fields.
///
/// `field_annotations` answers with what the live runtime field carries, which is what
/// a redefined class must keep in its bytes. `record_field_annotations` stores what the
/// newest definition declares, so reflection can report it without changing the class.
pub trait AnnotationSource: Send + Sync {
    fn field_annotations(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Option<Vec<Annotation>>, LookupError>;

    fn record_field_annotations(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
        annotations: Option<Vec<Annotation>>,
    );
}

type MemberId = (String, String, String);

fn member_id(owner: &str, name: &str, descriptor: &str) -> MemberId {
    (owner.to_string(), name.to_string(), descriptor.to_string())
}

#[derive(Debug, Default)]
pub struct AnnotationStore {
    loaded: DashMap<MemberId, Option<Vec<Annotation>>>,
    recorded: DashMap<MemberId, Option<Vec<Annotation>>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every field of a loaded class with the annotations it was loaded with.
    pub fn seed_from_class(&self, class: &ClassFile) -> Result<(), ClassFormatErr> {
        let owner = class.name()?;
        for field in &class.fields {
            let annotations = field.visible_annotations(&class.cp)?;
            self.loaded.insert(
                member_id(owner, field.name(&class.cp)?, field.descriptor(&class.cp)?),
                annotations,
            );
        }
        Ok(())
    }

    pub fn recorded_annotations(&self, owner: &str, name: &str, descriptor: &str) -> Option<Vec<Annotation>> {
        self.recorded
            .get(&member_id(owner, name, descriptor))
            .and_then(|entry| entry.value().clone())
    }

    pub fn is_recorded(&self, owner: &str, name: &str, descriptor: &str) -> bool {
        self.recorded.contains_key(&member_id(owner, name, descriptor))
    }
}

impl AnnotationSource for AnnotationStore {
    fn field_annotations(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<Option<Vec<Annotation>>, LookupError> {
        self.loaded
            .get(&member_id(owner, name, descriptor))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LookupError::FieldNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })
    }

    fn record_field_annotations(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
        annotations: Option<Vec<Annotation>>,
    ) {
        self.recorded.insert(member_id(owner, name, descriptor), annotations);
    }
}
