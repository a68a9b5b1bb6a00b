//! Which refs are candidates for static deltas.

use glob::Pattern;
use tracing::debug;

use brepo_types::refs::bundle_id;
use brepo_types::RefKind;

use crate::error::{DeltaError, DeltaResult};

/// Decides whether a ref is left out of delta generation.
///
/// - Applications and runtimes are skipped when a pattern matches their id
///   segment (`app/<id>/<arch>/<branch>`). Arch and branch are never matched.
/// - Current-format catalog refs are never skipped.
/// - Legacy catalog refs and unknown kinds are always skipped.
#[derive(Clone, Debug, Default)]
pub struct RefFilter {
    patterns: Vec<Pattern>,
}

impl RefFilter {
    /// A filter that skips only by ref kind.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns<I, S>(patterns: I) -> DeltaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).map_err(|e| DeltaError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<DeltaResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn should_skip(&self, refname: &str) -> bool {
        let skip = match RefKind::classify(refname) {
            RefKind::Application | RefKind::Runtime => {
                let id = bundle_id(refname).unwrap_or_default();
                self.patterns.iter().any(|p| p.matches(id))
            }
            RefKind::Catalog => false,
            RefKind::LegacyCatalog | RefKind::Other => true,
        };
        if skip {
            debug!(refname, "ref excluded from static deltas");
        }
        skip
    }
}
