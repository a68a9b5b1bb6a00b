//! Ref name classification.
//!
//! Refs are slash-separated names. Bundle refs look like
//! `app/<id>/<arch>/<branch>` or `runtime/<id>/<arch>/<branch>`; catalog refs
//! look like `appstream2/<arch>` (current) or `appstream/<arch>` (legacy).

use serde::{Deserialize, Serialize};

const APP_PREFIXES: &[&str] = &["app/", "application/"];
const RUNTIME_PREFIX: &str = "runtime/";
const CATALOG_PREFIX: &str = "appstream2/";
const LEGACY_CATALOG_PREFIX: &str = "appstream/";

/// What a ref points at, derived from its first path segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefKind {
    Application,
    Runtime,
    Catalog,
    LegacyCatalog,
    Other,
}

impl RefKind {
    /// Classify a ref by its prefix.
    pub fn classify(name: &str) -> Self {
        if APP_PREFIXES.iter().any(|p| name.starts_with(p)) {
            RefKind::Application
        } else if name.starts_with(RUNTIME_PREFIX) {
            RefKind::Runtime
        } else if name.starts_with(CATALOG_PREFIX) {
            RefKind::Catalog
        } else if name.starts_with(LEGACY_CATALOG_PREFIX) {
            RefKind::LegacyCatalog
        } else {
            RefKind::Other
        }
    }

    /// Applications and runtimes, which carry an id/arch/branch triple.
    pub fn is_bundle(self) -> bool {
        matches!(self, RefKind::Application | RefKind::Runtime)
    }

    /// The ref name prefix for catalog refs of the current format.
    pub fn catalog_ref(arch: &str) -> String {
        format!("{CATALOG_PREFIX}{arch}")
    }
}

/// The id segment (second field) of a bundle ref.
pub fn bundle_id(name: &str) -> Option<&str> {
    if !RefKind::classify(name).is_bundle() {
        return None;
    }
    name.split('/').nth(1).filter(|s| !s.is_empty())
}

/// The architecture a ref belongs to, if its kind carries one.
pub fn arch(name: &str) -> Option<&str> {
    let field = match RefKind::classify(name) {
        RefKind::Application | RefKind::Runtime => 2,
        RefKind::Catalog | RefKind::LegacyCatalog => 1,
        RefKind::Other => return None,
    };
    name.split('/').nth(field).filter(|s| !s.is_empty())
}

/// The branch (fourth field) of a bundle ref.
pub fn branch(name: &str) -> Option<&str> {
    if !RefKind::classify(name).is_bundle() {
        return None;
    }
    name.split('/').nth(3).filter(|s| !s.is_empty())
}
