//! Single-delta worker mode.

use tracing::info;

use brepo_deltas::DeltaJob;
use brepo_store::ObjectStore;
use brepo_types::DeltaName;

use crate::error::{UpdateError, UpdateResult};
use crate::options::WorkerRequest;

/// Generate exactly the delta named by `request`.
pub fn generate_single_delta<S>(store: &S, request: &WorkerRequest) -> UpdateResult<DeltaName>
where
    S: ObjectStore + ?Sized,
{
    let job = DeltaJob::new(request.refname.as_str(), request.from, request.to);
    info!("Generating delta: {job}");
    store
        .generate_delta(job.from.as_ref(), &job.to, &job.params)
        .map_err(|source| UpdateError::Worker {
            job: job.to_string(),
            source,
        })?;
    Ok(job.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brepo_store::{InMemoryRepository, RepoEvent};
    use brepo_types::CommitId;

    #[test]
    fn generates_requested_delta_only() {
        let repo = InMemoryRepository::new();
        let a = repo.commit(None, 1, "v1").unwrap();
        let b = repo.commit(Some(a), 2, "v2").unwrap();
        let request = WorkerRequest { refname: "appstream2/x86_64".into(), from: Some(a), to: b };

        let name = generate_single_delta(&repo, &request).unwrap();
        assert_eq!(name, DeltaName::incremental(a, b));
        let events = repo.events();
        assert_eq!(events.len(), 1);
        let RepoEvent::DeltaGenerated { params, .. } = &events[0] else {
            panic!("unexpected event {:?}", events[0]);
        };
        assert_eq!(params.get("min-fallback-size"), Some("1"));
        assert_eq!(params.get("inline-parts"), Some("true"));
    }

    #[test]
    fn failure_names_the_job() {
        let repo = InMemoryRepository::new();
        let missing = CommitId::from_hash([0xab; 32]);
        let request = WorkerRequest { refname: "app/x/a/s".into(), from: None, to: missing };
        let err = generate_single_delta(&repo, &request).unwrap_err();
        assert!(err.to_string().starts_with("app/x/a/s (ababababab): "));
    }
}
