use std::fmt;

use tracing::info;

use brepo_store::{ObjectStore, PruneOptions, PruneStats};

use crate::error::{UpdateError, UpdateResult};

/// Counters of a prune, displayed as the human-readable summary line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PruneSummary {
    pub stats: PruneStats,
    pub dry_run: bool,
}

impl fmt::Display for PruneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "Would delete" } else { "Deleted" };
        write!(
            f,
            "Total objects: {}, {verb} {} objects, {} freed",
            self.stats.objects_total,
            self.stats.objects_pruned,
            format_size(self.stats.bytes_freed)
        )
    }
}

/// Prune objects not reachable from a ref within `options.depth`.
pub fn run_prune<S>(store: &S, options: &PruneOptions) -> UpdateResult<PruneSummary>
where
    S: ObjectStore + ?Sized,
{
    info!(depth = options.depth, dry_run = options.dry_run, "Pruning repository");
    let stats = store.prune(options).map_err(UpdateError::Prune)?;
    let summary = PruneSummary {
        stats,
        dry_run: options.dry_run,
    };
    info!("{summary}");
    Ok(summary)
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["kB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} bytes");
    }
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit + 1 < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
