//! Package manager adapters.
//!
//! | Adapter         | Versions from                    | Fetch                              |
//! |-----------------|----------------------------------|------------------------------------|
//! | `NpmCli`        | `npm view <name> versions`       | `npm install --prefix <dest>`      |
//! | `LocalRegistry` | subdirectories of `<root>/<name>`| recursive copy of `<name>/<ver>/`  |

mod local;
mod npm;

pub use local::LocalRegistry;
pub use npm::{DEFAULT_REGISTRY_URL, NpmCli};
