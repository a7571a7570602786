//! How an entry point is turned into a command line.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

/// Inline program `node -e` runs: load the entry named by the second to
/// last argument and call its export with the parsed context from the last.
pub const NODE_BOOTSTRAP: &str = r#"
const [entry, raw] = process.argv.slice(-2);
Promise.resolve()
  .then(() => {
    const mod = require(entry);
    const run = typeof mod === 'function' ? mod : mod && mod.default;
    if (typeof run !== 'function') {
      throw new Error(entry + ' does not export a function');
    }
    return run.call(null, JSON.parse(raw));
  })
  .catch((err) => {
    console.error(err && err.stack ? err.stack : String(err));
    process.exitCode = 1;
  });
"#;

/// The interpreter dispatched entry points run under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    /// `node -e <bootstrap> -- <entry> <context>`; the entry exports a function.
    Node { program: String },
    /// `<program> <entry> <context>`; the entry reads the context from argv.
    Script { program: String },
}

impl Runtime {
    pub fn node() -> Self {
        Self::Node {
            program: "node".into(),
        }
    }

    pub fn script(program: impl Into<String>) -> Self {
        Self::Script {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        match self {
            Self::Node { program } | Self::Script { program } => program,
        }
    }

    /// Whether the runtime reports a version worth checking.
    pub fn is_versioned(&self) -> bool {
        matches!(self, Self::Node { .. })
    }

    /// Command line running `entry` with `context_json`.
    ///
    /// Runtimes are real executables and are started without a shell on
    /// every platform, so the context reaches the child byte for byte.
    pub fn command(&self, entry: &Path, context_json: &str) -> Command {
        let mut command = Command::new(self.program());
        if let Self::Node { .. } = self {
            command.args(["-e", NODE_BOOTSTRAP, "--"]);
        }
        command.arg(entry).arg(OsStr::new(context_json));
        command
    }

    /// Command line asking the runtime for its version.
    pub fn version_command(&self) -> Command {
        let mut command = Command::new(self.program());
        command.arg("--version");
        command
    }
}
