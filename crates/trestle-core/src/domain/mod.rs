// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Trestle.
//!
//! Pure values and pure functions: version requests and resolution, cache
//! addressing, per-dispatch package state, the command context that crosses
//! the process boundary, and the command → package registry.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No I/O**: No filesystem, network, or process calls
//! - **Deterministic**: identical inputs give identical outputs
//! - **Owned values**: nothing holds a reference back into the front end
//!
pub mod cache_key;
pub mod context;
pub mod error;
pub mod package;
pub mod registry;
pub mod version;

pub use cache_key::CacheKey;
pub use context::{CommandContext, parse_trailing_args};
pub use error::{DomainError, ErrorCategory};
pub use package::{Package, PackageLocation, PackageName};
pub use registry::{CommandBinding, CommandRegistry};
pub use version::{VersionRequest, VersionResolver, parse_version_loose};
