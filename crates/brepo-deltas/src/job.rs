use std::fmt;

use brepo_store::delta::{PARAM_INLINE_PARTS, PARAM_MIN_FALLBACK_SIZE};
use brepo_types::{CommitId, DeltaName, DeltaParams, DeltaProfile, RefKind};

/// One static delta to generate on behalf of a ref.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeltaJob {
    pub refname: String,
    pub from: Option<CommitId>,
    pub to: CommitId,
    pub params: DeltaParams,
}

impl DeltaJob {
    /// Build a job with the parameters every generated delta uses.
    pub fn new(refname: impl Into<String>, from: Option<CommitId>, to: CommitId) -> Self {
        let refname = refname.into();
        let mut params =
            DeltaParams::new(DeltaProfile::Major).with(PARAM_MIN_FALLBACK_SIZE, 1);
        if RefKind::classify(&refname) == RefKind::Catalog {
            params = params.with(PARAM_INLINE_PARTS, true);
        }
        Self {
            refname,
            from,
            to,
            params,
        }
    }

    pub fn name(&self) -> DeltaName {
        DeltaName {
            from: self.from,
            to: self.to,
        }
    }
}

/// `ref (from-to)` with 10-character hash prefixes, used in progress lines
/// and to prefix worker errors.
impl fmt::Display for DeltaJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from {
            Some(from) => write!(
                f,
                "{} ({}-{})",
                self.refname,
                from.short_hex(),
                self.to.short_hex()
            ),
            None => write!(f, "{} ({})", self.refname, self.to.short_hex()),
        }
    }
}
