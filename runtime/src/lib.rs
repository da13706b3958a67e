//! Field schema reconciliation for hot class redefinition.
//!
//! A redefined class may only be accepted by the host when its field table keeps the
//! exact shape of the loaded class. [`reconcile::FieldReconciler`] rewrites a freshly
//! compiled class so it does: new static fields move to holder classes, new instance
//! fields move to a hidden per-instance `Object[]`, and removed fields stay behind as
//! inert shells.

pub mod annotations;
pub mod context;
pub mod error;
pub mod instrument;
pub mod keys;
pub mod proxy;
pub mod reconcile;
pub mod rewriter;
pub mod schema;
pub mod storage;

pub use context::RedefinitionContext;
pub use context::proxy_store::ProxyDefinitionStore;
pub use error::{LookupError, RedefineError};
pub use keys::LoaderScope;
pub use reconcile::{FieldReconciler, RedefinitionOutcome, prepare_for_redefinition};

pub const DEFAULT_STORAGE_FIELD_NAME: &str = "$hotfield_data";
pub const DEFAULT_STORAGE_FIELD_DESCRIPTOR: &str = "[Ljava/lang/Object;";

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "log-runtime-traces")]
        {
            tracing_log::log::debug!($($arg)*);
        }
    };
}

/// What to do with a field whose access flags changed in ways other than `static`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessChangePolicy {
    /// Handle the new field as added and keep the old one as a removed shell.
    #[default]
    TreatAsNew,
    Reject,
}

#[derive(Debug, Clone)]
pub struct RedefineConfig {
    pub storage_field_name: String,
    pub storage_field_descriptor: String,
    /// Internal-name prefix of generated instance accessor classes.
    pub proxy_name_prefix: String,
    /// Appended to the owner's name, followed by a counter, to name static holders.
    pub holder_name_suffix: String,
    pub access_change_policy: AccessChangePolicy,
}

impl Default for RedefineConfig {
    fn default() -> Self {
        Self {
            storage_field_name: DEFAULT_STORAGE_FIELD_NAME.to_string(),
            storage_field_descriptor: DEFAULT_STORAGE_FIELD_DESCRIPTOR.to_string(),
            proxy_name_prefix: "org/hotfield/proxy/FieldProxy$".to_string(),
            holder_name_suffix: "$StaticFieldHolder$".to_string(),
            access_change_policy: AccessChangePolicy::default(),
        }
    }
}
