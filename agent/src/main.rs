use clap::Parser;
use hotfield_classfile::ClassFile;
use hotfield_classfile::error::{ClassFormatErr, ConstructionErr};
use hotfield_runtime::annotations::AnnotationStore;
use hotfield_runtime::rewriter::RecordingRewriter;
use hotfield_runtime::schema::ClassSchema;
use hotfield_runtime::{
    AccessChangePolicy, FieldReconciler, LoaderScope, ProxyDefinitionStore, RedefineConfig, RedefineError,
    RedefinitionContext, RedefinitionOutcome, prepare_for_redefinition,
};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_log::log::debug;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    #[arg(
        short = 'b',
        long = "baseline",
        help = "Directory with the class files as they were first loaded"
    )]
    pub baseline: PathBuf,
    #[arg(
        short = 'u',
        long = "updated",
        help = "Directory with the recompiled class files to redefine with"
    )]
    pub updated: PathBuf,
    #[arg(
        short = 'o',
        long = "out",
        help = "Directory receiving redefined classes and generated holders/proxies"
    )]
    pub out: PathBuf,
    #[arg(
        short = 'l',
        long = "loader",
        default_value = "app",
        help = "Name of the loader scope the classes belong to"
    )]
    pub loader: String,
    #[arg(
        long = "reject-access-changes",
        help = "Fail instead of re-adding a field whose access flags changed"
    )]
    pub reject_access_changes: bool,
}

#[derive(Debug)]
enum DriverError {
    Io(std::io::Error),
    Walk(walkdir::Error),
    Format(ClassFormatErr),
    Construction(ConstructionErr),
    Redefine(RedefineError),
}

impl From<std::io::Error> for DriverError {
    fn from(value: std::io::Error) -> Self {
        DriverError::Io(value)
    }
}

impl From<walkdir::Error> for DriverError {
    fn from(value: walkdir::Error) -> Self {
        DriverError::Walk(value)
    }
}

impl From<ClassFormatErr> for DriverError {
    fn from(value: ClassFormatErr) -> Self {
        DriverError::Format(value)
    }
}

impl From<ConstructionErr> for DriverError {
    fn from(value: ConstructionErr) -> Self {
        DriverError::Construction(value)
    }
}

impl From<RedefineError> for DriverError {
    fn from(value: RedefineError) -> Self {
        DriverError::Redefine(value)
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Io(err) => write!(f, "{err}"),
            DriverError::Walk(err) => write!(f, "{err}"),
            DriverError::Format(err) => write!(f, "malformed class: {err}"),
            DriverError::Construction(err) => write!(f, "{err}"),
            DriverError::Redefine(err) => write!(f, "{err}"),
        }
    }
}

fn create_redefine_configuration(args: &Args) -> RedefineConfig {
    RedefineConfig {
        access_change_policy: if args.reject_access_changes {
            AccessChangePolicy::Reject
        } else {
            AccessChangePolicy::TreatAsNew
        },
        ..RedefineConfig::default()
    }
}

/// Class files under `root`, relative to it, in file-name order.
fn class_files(root: &Path) -> Result<Vec<PathBuf>, DriverError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let is_class = entry.path().extension().is_some_and(|ext| ext == "class");
        if entry.file_type().is_file()
            && is_class
            && let Ok(relative) = entry.path().strip_prefix(root)
        {
            found.push(relative.to_path_buf());
        }
    }
    Ok(found)
}

fn write_class(path: &Path, bytes: &[u8]) -> Result<(), DriverError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

struct Driver {
    ctx: RedefinitionContext,
    annotations: AnnotationStore,
    rewriter: RecordingRewriter,
}

impl Driver {
    fn new(args: &Args) -> Self {
        Self {
            ctx: RedefinitionContext::new(
                LoaderScope::new(&args.loader),
                create_redefine_configuration(args),
                Arc::new(ProxyDefinitionStore::new()),
            ),
            annotations: AnnotationStore::new(),
            rewriter: RecordingRewriter::new(),
        }
    }

    /// Redefines one class present in both builds. `None` when the baseline lacks it.
    fn redefine(&self, args: &Args, relative: &Path) -> Result<Option<RedefinitionOutcome>, DriverError> {
        let baseline = args.baseline.join(relative);
        if !baseline.is_file() {
            debug!("Skipping {}: not in the baseline", relative.display());
            return Ok(None);
        }
        let mut loaded = ClassFile::parse(&std::fs::read(&baseline)?)?;
        prepare_for_redefinition(&mut loaded, self.ctx.config())?;
        let schema = ClassSchema::from_class_file(&loaded)?;
        self.annotations.seed_from_class(&loaded)?;

        let updated = ClassFile::parse(&std::fs::read(args.updated.join(relative))?)?;
        let outcome =
            FieldReconciler::new(&self.ctx, &self.annotations, &self.rewriter).reconcile(&schema, updated)?;
        write_class(&args.out.join(relative), &outcome.class_bytes)?;
        Ok(Some(outcome))
    }

    fn write_generated(&self, out: &Path) -> Result<usize, DriverError> {
        let scope = self.ctx.scope();
        let names = self.ctx.store().names_in(scope);
        for name in &names {
            if let Some(bytes) = self.ctx.store().load(scope, name) {
                write_class(&out.join(format!("{name}.class")), &bytes)?;
            }
        }
        Ok(names.len())
    }
}

fn run(args: &Args) -> Result<bool, DriverError> {
    let driver = Driver::new(args);
    let mut failed = false;
    for relative in class_files(&args.updated)? {
        match driver.redefine(args, &relative) {
            Ok(Some(outcome)) => println!(
                "{}: {} added, {} static, {} removed",
                outcome.schema.class_name,
                outcome.added_fields.len(),
                outcome.static_redirects.len(),
                outcome.removed_fields.len()
            ),
            Ok(None) => {}
            Err(e) => {
                eprintln!("{}: {}", relative.display(), e);
                failed = true;
            }
        }
    }
    let generated = driver.write_generated(&args.out)?;
    debug!("Wrote {generated} generated classes to {}", args.out.display());
    Ok(!failed)
}

#[hotpath::main]
fn main() {
    #[cfg(feature = "log-runtime-traces")]
    hotfield_common::utils::telemetry::init_tracing();
    let args = Args::parse();
    debug!("Provided command line arguments: {:?}", args);

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
