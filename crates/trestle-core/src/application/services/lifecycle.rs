//! Command lifecycle - a fixed four step driver.
//!
//! 1. validate the host environment
//! 2. split the raw invocation into positional arguments and an options record
//! 3. [`Command::init`]
//! 4. [`Command::exec`]
//!
//! Steps run strictly in order and the first failure ends the run. The
//! driver takes the command by value, so a partially run command can never
//! be driven again.

use std::sync::Arc;

use semver::Version;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::{
    application::{
        ApplicationError,
        ports::RuntimeProbe,
        services::dispatcher::{CommandDispatcher, DispatchOutcome, DispatchOverrides},
    },
    domain::{CommandContext, DomainError},
    error::{TrestleError, TrestleResult},
};

/// Oldest runtime accepted by default.
pub const DEFAULT_MIN_RUNTIME: Version = Version::new(12, 0, 0);

/// A unit of work the lifecycle can drive.
pub trait Command {
    type Output;

    /// Take the normalized invocation. Must not perform I/O.
    fn init(&mut self, arguments: Vec<Value>, options: Map<String, Value>) -> TrestleResult<()>;

    /// Do the actual work.
    fn exec(&mut self) -> TrestleResult<Self::Output>;
}

/// Drives commands through the four steps.
pub struct Lifecycle {
    probe: Arc<dyn RuntimeProbe>,
    min_version: Version,
}

impl Lifecycle {
    pub fn new(probe: Arc<dyn RuntimeProbe>) -> Self {
        Self {
            probe,
            min_version: DEFAULT_MIN_RUNTIME,
        }
    }

    pub fn with_min_version(mut self, min_version: Version) -> Self {
        self.min_version = min_version;
        self
    }

    /// Run `command` with a raw invocation whose last element is the
    /// options record.
    #[instrument(skip_all)]
    pub fn run<C: Command>(
        &self,
        mut command: C,
        invocation: Vec<Value>,
    ) -> TrestleResult<C::Output> {
        self.validate_environment()
            .inspect_err(aborted("validate-environment"))?;
        let (arguments, options) =
            normalize_arguments(invocation).inspect_err(aborted("normalize-arguments"))?;
        command.init(arguments, options).inspect_err(aborted("init"))?;
        command.exec().inspect_err(aborted("exec"))
    }

    /// Reject runtimes older than the configured minimum.
    pub fn validate_environment(&self) -> TrestleResult<()> {
        match self.probe.version()? {
            Some(found) if found < self.min_version => Err(ApplicationError::UnsupportedRuntime {
                found,
                minimum: self.min_version.clone(),
            }
            .into()),
            Some(found) => {
                debug!(runtime = %found, "Runtime version accepted");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn aborted(step: &'static str) -> impl Fn(&TrestleError) {
    move |e| debug!(step, error = %e, "Lifecycle aborted")
}

/// Split a raw invocation: the last element is the options record, the
/// rest are positional arguments.
pub fn normalize_arguments(
    mut invocation: Vec<Value>,
) -> TrestleResult<(Vec<Value>, Map<String, Value>)> {
    match invocation.pop() {
        Some(Value::Object(options)) => Ok((invocation, options)),
        Some(other) => Err(DomainError::InvalidInvocation(format!(
            "the last element must be an options record, got {other}"
        ))
        .into()),
        None => Err(DomainError::InvalidInvocation("the invocation is empty".into()).into()),
    }
}

// ── dispatch command ─────────────────────────────────────────────────────────

/// Runs one bound command through the dispatcher.
pub struct DispatchCommand<'a> {
    dispatcher: &'a CommandDispatcher,
    name: String,
    overrides: DispatchOverrides,
    context: CommandContext,
}

impl<'a> DispatchCommand<'a> {
    pub fn new(
        dispatcher: &'a CommandDispatcher,
        name: impl Into<String>,
        overrides: DispatchOverrides,
    ) -> Self {
        Self {
            dispatcher,
            name: name.into(),
            overrides,
            context: CommandContext::default(),
        }
    }
}

impl Command for DispatchCommand<'_> {
    type Output = DispatchOutcome;

    fn init(&mut self, arguments: Vec<Value>, options: Map<String, Value>) -> TrestleResult<()> {
        self.context = CommandContext::from_parts(&arguments, &options)?;
        Ok(())
    }

    fn exec(&mut self) -> TrestleResult<DispatchOutcome> {
        self.dispatcher.dispatch(&self.name, &self.context, &self.overrides)
    }
}
