//! Child process adapters: the spawn primitive and the runtime probe.

mod launcher;
mod runtime;

use std::ffi::OsStr;
use std::process::Command;

pub use launcher::ChildProcessLauncher;
pub use runtime::{NODE_BOOTSTRAP, Runtime};

/// Build a command for a script shim such as `npm`.
///
/// On Windows `npm` is a `.cmd` file that only the shell can run, so the
/// command is wrapped as `cmd /c <program> <args>`; elsewhere it runs
/// directly. Arguments go through `cmd` parsing, so only pass values
/// without shell metacharacters.
pub fn platform_command<I, S>(program: &str, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/c").arg(program).args(args);
        command
    } else {
        let mut command = Command::new(program);
        command.args(args);
        command
    }
}
