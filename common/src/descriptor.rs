use crate::error::MethodDescriptorErr;
use crate::jtype::{JavaType, PrimitiveType, ReturnType};
use itertools::Itertools;
use std::fmt::Display;

/// Parsed form of `( ParameterDescriptor* ) ReturnDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<JavaType>,
    pub ret: ReturnType,
}

impl MethodDescriptor {
    pub fn new(params: Vec<JavaType>, ret: ReturnType) -> Self {
        Self { params, ret }
    }

    pub fn to_descriptor(&self) -> String {
        format!(
            "({}){}",
            self.params.iter().map(JavaType::to_descriptor).join(""),
            self.ret.to_descriptor()
        )
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Local variable slots taken by the parameters; long and double take two.
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(JavaType::slot_width).sum()
    }

    /// Slots needed to hold the receiver (when not static) and every parameter.
    pub fn max_locals(&self, is_static: bool) -> u16 {
        self.param_slots() + if is_static { 0 } else { 1 }
    }

    pub fn to_java_signature(&self, class_name: &str, method_name: &str) -> String {
        format!(
            "{} {}.{}({})",
            self.ret,
            class_name.replace('/', "."),
            method_name,
            self.params.iter().join(", ")
        )
    }

    /// Resolves every parameter type to a host class handle through `resolver`.
    pub fn resolve_params<R: ClassResolver>(&self, resolver: &R) -> Result<Vec<R::Class>, R::Error> {
        self.params.iter().map(|p| resolver.resolve(p)).collect()
    }

    pub fn resolve_return<R: ClassResolver>(&self, resolver: &R) -> Result<R::Class, R::Error> {
        match &self.ret {
            ReturnType::Void => Ok(resolver.void()),
            ReturnType::Type(ty) => resolver.resolve(ty),
        }
    }
}

impl TryFrom<&str> for MethodDescriptor {
    type Error = MethodDescriptorErr;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut rest = value
            .strip_prefix('(')
            .ok_or_else(|| MethodDescriptorErr::MissingOpeningParen(value.to_string()))?;
        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                return Err(MethodDescriptorErr::MissingClosingParen(value.to_string()));
            }
            let (param, after) = JavaType::parse_prefix(rest)?;
            params.push(param);
            rest = after;
        }
        let ret = match rest {
            "V" => ReturnType::Void,
            other => ReturnType::Type(
                JavaType::try_from(other)
                    .map_err(|_| MethodDescriptorErr::InvalidReturnType(value.to_string()))?,
            ),
        };
        Ok(Self { params, ret })
    }
}

impl Display for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_descriptor())
    }
}

/// Everything after the closing parenthesis.
pub fn return_descriptor(method_descriptor: &str) -> &str {
    method_descriptor
        .rfind(')')
        .map_or(method_descriptor, |pos| &method_descriptor[pos + 1..])
}

/// Everything up to and including the closing parenthesis.
pub fn argument_descriptor(method_descriptor: &str) -> &str {
    method_descriptor
        .rfind(')')
        .map_or(method_descriptor, |pos| &method_descriptor[..=pos])
}

/// Loader-scope capability used to turn descriptor types into host class handles.
pub trait ClassResolver {
    type Class;
    type Error;

    fn primitive(&self, primitive: PrimitiveType) -> Self::Class;

    fn void(&self) -> Self::Class;

    /// Loads a class by reflective name (`java.lang.String`, `[Ljava.lang.String;`, `[I`).
    fn load(&self, host_name: &str) -> Result<Self::Class, Self::Error>;

    fn resolve(&self, ty: &JavaType) -> Result<Self::Class, Self::Error> {
        match ty {
            JavaType::Primitive(p) => Ok(self.primitive(*p)),
            other => self.load(&other.host_class_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("()V", 0, 0)]
    #[case("(IJ)V", 2, 3)]
    #[case("(DLjava/lang/String;[J)I", 3, 4)]
    #[case("([[Ljava/lang/Object;ZBCSF)Ljava/lang/Object;", 6, 6)]
    fn counts_params_and_slots(#[case] desc: &str, #[case] count: usize, #[case] slots: u16) {
        let parsed = MethodDescriptor::try_from(desc).unwrap();
        assert_eq!(parsed.param_count(), count);
        assert_eq!(parsed.param_slots(), slots);
        assert_eq!(parsed.max_locals(false), slots + 1);
        assert_eq!(parsed.to_descriptor(), desc);
    }

    #[rstest]
    #[case("IV")]
    #[case("(I")]
    #[case("(I)")]
    #[case("(I)Q")]
    #[case("(Q)V")]
    fn rejects_malformed(#[case] desc: &str) {
        assert!(MethodDescriptor::try_from(desc).is_err());
    }

    #[test]
    fn splits_argument_and_return_parts() {
        let desc = "(ILjava/lang/String;)[J";
        assert_eq!(argument_descriptor(desc), "(ILjava/lang/String;)");
        assert_eq!(return_descriptor(desc), "[J");
    }

    #[test]
    fn renders_java_signature() {
        let desc = MethodDescriptor::try_from("(I[Ljava/lang/String;)Ljava/lang/Object;").unwrap();
        assert_eq!(
            desc.to_java_signature("com/example/Foo", "bar"),
            "java.lang.Object com.example.Foo.bar(int, java.lang.String[])"
        );
    }

    struct NameResolver;

    impl ClassResolver for NameResolver {
        type Class = String;
        type Error = String;

        fn primitive(&self, primitive: PrimitiveType) -> String {
            primitive.java_name().to_string()
        }

        fn void(&self) -> String {
            "void".to_string()
        }

        fn load(&self, host_name: &str) -> Result<String, String> {
            if host_name.contains("Missing") {
                Err(host_name.to_string())
            } else {
                Ok(host_name.to_string())
            }
        }
    }

    #[test]
    fn resolves_through_loader_scope() {
        let desc =
            MethodDescriptor::try_from("(I[Ljava/lang/String;Ljava/util/List;[[I)V").unwrap();
        assert_eq!(
            desc.resolve_params(&NameResolver).unwrap(),
            vec!["int", "[Ljava.lang.String;", "java.util.List", "[[I"]
        );
        assert_eq!(desc.resolve_return(&NameResolver).unwrap(), "void");

        let missing = MethodDescriptor::try_from("(Lcom/Missing;)V").unwrap();
        assert_eq!(
            missing.resolve_params(&NameResolver),
            Err("com.Missing".to_string())
        );
    }
}
