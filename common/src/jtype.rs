use crate::error::TypeDescriptorErr;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl PrimitiveType {
    pub fn values() -> &'static [PrimitiveType] {
        &[
            PrimitiveType::Byte,
            PrimitiveType::Char,
            PrimitiveType::Double,
            PrimitiveType::Float,
            PrimitiveType::Int,
            PrimitiveType::Long,
            PrimitiveType::Short,
            PrimitiveType::Boolean,
        ]
    }

    pub const fn descriptor_char(self) -> char {
        match self {
            PrimitiveType::Byte => 'B',
            PrimitiveType::Char => 'C',
            PrimitiveType::Double => 'D',
            PrimitiveType::Float => 'F',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Short => 'S',
            PrimitiveType::Boolean => 'Z',
        }
    }

    pub const fn from_descriptor_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(PrimitiveType::Byte),
            'C' => Some(PrimitiveType::Char),
            'D' => Some(PrimitiveType::Double),
            'F' => Some(PrimitiveType::Float),
            'I' => Some(PrimitiveType::Int),
            'J' => Some(PrimitiveType::Long),
            'S' => Some(PrimitiveType::Short),
            'Z' => Some(PrimitiveType::Boolean),
            _ => None,
        }
    }

    /// Keyword used for the primitive in source code and in reflective class names.
    pub const fn java_name(self) -> &'static str {
        match self {
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Double => "double",
            PrimitiveType::Float => "float",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Short => "short",
            PrimitiveType::Boolean => "boolean",
        }
    }

    pub fn from_java_name(name: &str) -> Option<Self> {
        Self::values()
            .iter()
            .copied()
            .find(|p| p.java_name() == name)
    }

    /// Internal name of the wrapper class used when the value is boxed.
    pub const fn box_class(self) -> &'static str {
        match self {
            PrimitiveType::Byte => "java/lang/Byte",
            PrimitiveType::Char => "java/lang/Character",
            PrimitiveType::Double => "java/lang/Double",
            PrimitiveType::Float => "java/lang/Float",
            PrimitiveType::Int => "java/lang/Integer",
            PrimitiveType::Long => "java/lang/Long",
            PrimitiveType::Short => "java/lang/Short",
            PrimitiveType::Boolean => "java/lang/Boolean",
        }
    }

    pub const fn is_wide(self) -> bool {
        matches!(self, PrimitiveType::Long | PrimitiveType::Double)
    }

    pub const fn slot_width(self) -> u16 {
        if self.is_wide() { 2 } else { 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Primitive(PrimitiveType),
    /// Internal (slash separated) class name.
    Instance(String),
    Array(Box<JavaType>),
}

impl JavaType {
    /// Parses one field type from the front of `input` and returns it with the rest.
    pub fn parse_prefix(input: &str) -> Result<(JavaType, &str), TypeDescriptorErr> {
        let mut chars = input.chars();
        let tag = chars.next().ok_or(TypeDescriptorErr::UnexpectedEnd)?;
        let rest = chars.as_str();
        match tag {
            'L' => {
                let end = rest
                    .find(';')
                    .ok_or_else(|| TypeDescriptorErr::UnterminatedClassName(input.to_string()))?;
                if end == 0 {
                    return Err(TypeDescriptorErr::EmptyClassName);
                }
                Ok((JavaType::Instance(rest[..end].to_string()), &rest[end + 1..]))
            }
            '[' => {
                let (element, rest) = Self::parse_prefix(rest)?;
                Ok((JavaType::Array(Box::new(element)), rest))
            }
            other => PrimitiveType::from_descriptor_char(other)
                .map(|p| (JavaType::Primitive(p), rest))
                .ok_or(TypeDescriptorErr::InvalidType(other)),
        }
    }

    pub fn instance(internal_name: impl Into<String>) -> Self {
        JavaType::Instance(internal_name.into())
    }

    pub fn array_of(element: JavaType) -> Self {
        JavaType::Array(Box::new(element))
    }

    pub fn to_descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    pub(crate) fn write_descriptor(&self, out: &mut String) {
        match self {
            JavaType::Primitive(p) => out.push(p.descriptor_char()),
            JavaType::Instance(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            JavaType::Array(element) => {
                out.push('[');
                element.write_descriptor(out);
            }
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JavaType::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, JavaType::Primitive(p) if p.is_wide())
    }

    /// Number of local variable / operand stack slots a value of this type occupies.
    pub fn slot_width(&self) -> u16 {
        match self {
            JavaType::Primitive(p) => p.slot_width(),
            _ => 1,
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            JavaType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Name used by the verifier and by `CONSTANT_Class` entries: `java/lang/String`
    /// for instances, the full descriptor for arrays.
    pub fn class_entry_name(&self) -> Option<String> {
        match self {
            JavaType::Primitive(_) => None,
            JavaType::Instance(name) => Some(name.clone()),
            JavaType::Array(_) => Some(self.to_descriptor()),
        }
    }

    pub fn array_dimensions(&self) -> usize {
        match self {
            JavaType::Array(element) => 1 + element.array_dimensions(),
            _ => 0,
        }
    }

    /// Reflective class name, e.g. `java.lang.String`, `[Ljava.lang.String;`, `[I` or `int`.
    /// Array classes use the odd mixed format the host expects for array lookups.
    pub fn host_class_name(&self) -> String {
        match self {
            JavaType::Primitive(p) => p.java_name().to_string(),
            JavaType::Instance(name) => name.replace('/', "."),
            JavaType::Array(_) => self.to_descriptor().replace('/', "."),
        }
    }

    /// Inverse of [`JavaType::host_class_name`].
    pub fn from_host_class_name(name: &str) -> Result<Self, TypeDescriptorErr> {
        if let Some(p) = PrimitiveType::from_java_name(name) {
            return Ok(JavaType::Primitive(p));
        }
        if name.starts_with('[') {
            return JavaType::try_from(name.replace('.', "/").as_str());
        }
        if name.is_empty() {
            return Err(TypeDescriptorErr::EmptyClassName);
        }
        Ok(JavaType::Instance(name.replace('.', "/")))
    }
}

impl TryFrom<&str> for JavaType {
    type Error = TypeDescriptorErr;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (ty, rest) = Self::parse_prefix(value)?;
        if !rest.is_empty() {
            return Err(TypeDescriptorErr::TrailingCharacters(rest.to_string()));
        }
        Ok(ty)
    }
}

impl Display for JavaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JavaType::Primitive(p) => write!(f, "{}", p.java_name()),
            JavaType::Instance(name) => write!(f, "{}", name.replace('/', ".")),
            JavaType::Array(element) => write!(f, "{}[]", element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Type(JavaType),
}

impl ReturnType {
    pub fn to_descriptor(&self) -> String {
        match self {
            ReturnType::Void => "V".to_string(),
            ReturnType::Type(ty) => ty.to_descriptor(),
        }
    }

    pub fn slot_width(&self) -> u16 {
        match self {
            ReturnType::Void => 0,
            ReturnType::Type(ty) => ty.slot_width(),
        }
    }
}

impl Display for ReturnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnType::Void => write!(f, "void"),
            ReturnType::Type(ty) => write!(f, "{}", ty),
        }
    }
}

/// Single character descriptors are primitives, everything else is a reference.
pub fn is_primitive_descriptor(descriptor: &str) -> bool {
    descriptor.len() == 1
}

pub fn is_wide_descriptor(descriptor: &str) -> bool {
    matches!(descriptor, "J" | "D")
}

/// `Ljava/lang/Object;` to `java/lang/Object`.
pub fn internal_name_from_descriptor(descriptor: &str) -> Option<&str> {
    descriptor.strip_prefix('L')?.strip_suffix(';')
}

/// `java.lang.Object` to `Ljava/lang/Object;`.
pub fn descriptor_from_external_name(class_name: &str) -> String {
    format!("L{};", class_name.replace('.', "/"))
}
