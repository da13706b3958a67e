use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptorErr {
    UnexpectedEnd,
    InvalidType(char),
    UnterminatedClassName(String),
    EmptyClassName,
    TrailingCharacters(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodDescriptorErr {
    MissingOpeningParen(String),
    MissingClosingParen(String),
    InvalidReturnType(String),
    Type(TypeDescriptorErr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    UnexpectedEof { position: usize, wanted: usize },
    InvalidModifiedUtf8 { position: usize },
}

impl From<TypeDescriptorErr> for MethodDescriptorErr {
    fn from(value: TypeDescriptorErr) -> Self {
        MethodDescriptorErr::Type(value)
    }
}

impl Display for TypeDescriptorErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for MethodDescriptorErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for CursorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CursorError::UnexpectedEof { position, wanted } => write!(
                f,
                "unexpected end of data at {position}, wanted {wanted} more byte(s)"
            ),
            CursorError::InvalidModifiedUtf8 { position } => {
                write!(f, "invalid modified UTF-8 sequence at byte {position}")
            }
        }
    }
}

impl std::error::Error for TypeDescriptorErr {}
impl std::error::Error for MethodDescriptorErr {}
impl std::error::Error for CursorError {}
