//! Is a newer compatible release of the tool itself published?

use std::sync::Arc;

use semver::Version;
use tracing::{debug, instrument};

use crate::{
    application::ports::PackageManager,
    domain::{PackageName, VersionResolver},
    error::TrestleResult,
};

/// A newer compatible release exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    pub package: PackageName,
    pub current: Version,
    pub latest: Version,
}

pub struct SelfUpdateCheck {
    manager: Arc<dyn PackageManager>,
    package: PackageName,
}

impl SelfUpdateCheck {
    pub fn new(manager: Arc<dyn PackageManager>, package: PackageName) -> Self {
        Self { manager, package }
    }

    /// Compare `current` against the highest `^current` release.
    #[instrument(skip_all, fields(package = %self.package, current = %current))]
    pub fn check(&self, current: &Version) -> TrestleResult<Option<UpdateNotice>> {
        let versions = self.manager.list_versions(&self.package)?;
        let notice = VersionResolver::compatible(current, &versions)
            .filter(|latest| latest > current)
            .map(|latest| UpdateNotice {
                package: self.package.clone(),
                current: current.clone(),
                latest,
            });
        debug!(newer = notice.is_some(), "Self-update check finished");
        Ok(notice)
    }
}
