use lasso::Spur;
use std::fmt::Display;
use std::sync::Arc;

pub type Symbol = Spur;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub name: Symbol,
    pub desc: Symbol,
}

/// A field qualified by the class that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnedFieldKey {
    pub owner: Symbol,
    pub field: FieldKey,
}

/// Identifies the class loader a class and its generated proxies belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderScope(Arc<str>);

impl LoaderScope {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn bootstrap() -> Self {
        Self::new("bootstrap")
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for LoaderScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
