use std::collections::BTreeSet;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;

use brepo_store::{ConfigKey, DirTree, FsRepository, ObjectAccess, ObjectStore, RepoConfig};
use brepo_types::{CommitId, CommitRecord, DeltaName};

const REF: &str = "app/org.example.Tool/x86_64/stable";

struct Fixture {
    _dir: tempfile::TempDir,
    repo: FsRepository,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FsRepository::init(dir.path().join("repo")).expect("init repo");
        Self { _dir: dir, repo }
    }

    fn path(&self) -> &Path {
        self.repo.path()
    }

    fn commit(&self, parent: Option<CommitId>, n: u64) -> CommitId {
        let file = self.repo.write_file(format!("build {n}").as_bytes()).unwrap();
        let runtime = self.repo.write_file(b"shared runtime").unwrap();
        let tree = self
            .repo
            .write_dirtree(&DirTree::new().with_file("app", file).with_file("runtime", runtime))
            .unwrap();
        let mut record = CommitRecord::new(parent, n, format!("build {n}"));
        record.root_tree = Some(tree);
        self.repo.write_commit(&record).unwrap()
    }

    fn chain(&self, n: usize) -> Vec<CommitId> {
        let mut out: Vec<CommitId> = Vec::new();
        for i in 0..n {
            let parent = out.last().copied();
            out.push(self.commit(parent, i as u64 + 1));
        }
        out
    }

    fn point(&self, refname: &str, target: CommitId) {
        self.repo.set_ref(refname, Some(&target)).unwrap();
    }

    fn deltas(&self) -> BTreeSet<DeltaName> {
        self.repo.list_deltas().unwrap().into_iter().collect()
    }

    fn update(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        cargo_bin_cmd!("brepo")
            .arg("update-repo")
            .args(args)
            .arg(self.path())
            .assert()
    }
}

fn names(items: &[DeltaName]) -> BTreeSet<DeltaName> {
    items.iter().copied().collect()
}

#[test]
fn deltas_follow_the_ref_across_runs() {
    let fx = Fixture::new();
    let c = fx.chain(5);
    let (b, cc, d, e) = (c[1], c[2], c[3], c[4]);
    let args = ["--generate-static-deltas", "--no-update-appstream", "--jobs=2"];

    fx.point(REF, cc);
    fx.update(&args).success();
    assert_eq!(fx.deltas(), names(&[DeltaName::full(cc), DeltaName::incremental(b, cc)]));

    fx.point(REF, d);
    fx.update(&args).success();
    let after_advance = names(&[
        DeltaName::full(cc),
        DeltaName::incremental(b, cc),
        DeltaName::full(d),
        DeltaName::incremental(cc, d),
    ]);
    assert_eq!(fx.deltas(), after_advance);

    let superblock = fx.repo.delta_superblock(&DeltaName::full(d)).unwrap();
    fx.update(&args).success();
    assert_eq!(fx.deltas(), after_advance);
    assert_eq!(fx.repo.delta_superblock(&DeltaName::full(d)).unwrap(), superblock);

    fx.point(REF, e);
    fx.update(&args).success();
    assert_eq!(
        fx.deltas(),
        names(&[
            DeltaName::full(d),
            DeltaName::incremental(cc, d),
            DeltaName::full(e),
            DeltaName::incremental(d, e),
        ])
    );
}

#[test]
fn ignored_and_legacy_refs_get_no_deltas() {
    let fx = Fixture::new();
    let c = fx.chain(2);
    let other = fx.commit(None, 99);
    fx.point(REF, c[1]);
    fx.point("app/org.other.Tool/x86_64/stable", other);
    fx.point("appstream/x86_64", c[0]);

    fx.update(&[
        "--generate-static-deltas",
        "--no-update-appstream",
        "--static-delta-ignore-ref=org.example.*",
    ])
    .success();
    assert_eq!(fx.deltas(), names(&[DeltaName::full(other)]));
}

#[test]
fn catalog_is_committed_and_deltaed() {
    let fx = Fixture::new();
    let c = fx.chain(1);
    fx.point(REF, c[0]);

    fx.update(&["--generate-static-deltas"]).success();
    let refs = fx.repo.list_refs().unwrap();
    let catalog = refs["appstream2/x86_64"];
    assert!(fx.deltas().contains(&DeltaName::full(catalog)));
    assert!(fx.path().join("summary").exists());
    assert!(fx.path().join("summary.idx").exists());
}

#[test]
fn collection_id_cannot_change() {
    let fx = Fixture::new();
    fx.repo
        .set_scalar(&ConfigKey::CollectionId, Some("org.example.A"))
        .unwrap();
    let c = fx.chain(2);
    fx.point(REF, c[1]);

    let assert = fx
        .update(&[
            "--collection-id=org.example.B",
            "--title=Changed",
            "--generate-static-deltas",
        ])
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("collection ID"), "stderr: {stderr}");
    assert!(fx.deltas().is_empty());
    assert!(!fx.path().join("summary").exists());
    assert_eq!(fx.repo.collection_id().unwrap().as_deref(), Some("org.example.A"));
    assert_eq!(fx.repo.get_scalar(&ConfigKey::Title).unwrap(), None);
}

#[test]
fn metadata_is_written() {
    let fx = Fixture::new();
    fx.update(&[
        "--title=Example Apps",
        "--collection-id=org.example.Apps",
        "--authenticator-option=realm=example",
        "--no-update-appstream",
    ])
    .success();
    assert_eq!(fx.repo.get_scalar(&ConfigKey::Title).unwrap().as_deref(), Some("Example Apps"));
    assert_eq!(fx.repo.collection_id().unwrap().as_deref(), Some("org.example.Apps"));
    assert_eq!(
        fx.repo
            .get_scalar(&ConfigKey::AuthenticatorOption("realm".into()))
            .unwrap()
            .as_deref(),
        Some("example")
    );

    fx.update(&["--title=", "--no-update-appstream"]).success();
    assert_eq!(fx.repo.get_scalar(&ConfigKey::Title).unwrap(), None);
}

#[test]
fn prune_keeps_tips_and_history_within_depth() {
    let fx = Fixture::new();
    let c = fx.chain(3);
    fx.point(REF, c[2]);
    let orphan = fx.repo.write_file(b"nobody points here").unwrap();

    let assert = fx
        .update(&["--no-update-appstream", "--prune", "--prune-depth=-1"])
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Deleted 1 objects"), "stdout: {stdout}");
    assert!(fx.repo.read_object(brepo_store::ObjectKind::File, &orphan).is_err());
    for commit in &c {
        assert!(fx.repo.load_commit(commit).is_ok());
    }

    fx.update(&["--no-update-appstream", "--prune-dry-run", "--prune-depth=0"])
        .success();
    assert!(fx.repo.load_commit(&c[0]).is_ok());

    fx.update(&["--no-update-appstream", "--prune", "--prune-depth=0"])
        .success();
    assert!(fx.repo.load_commit(&c[2]).is_ok());
    assert!(fx.repo.load_commit(&c[1]).is_err());
    assert!(fx.repo.load_commit(&c[0]).is_err());
}

#[test]
fn worker_mode_generates_one_delta() {
    let fx = Fixture::new();
    let c = fx.chain(2);
    let to = c[1].to_hex();
    let from = c[0].to_hex();

    fx.update(&[
        "--generate-static-delta-ref",
        REF,
        "--generate-static-delta-to",
        &to,
        "--generate-static-delta-from",
        &from,
    ])
    .success();
    assert_eq!(fx.deltas(), names(&[DeltaName::incremental(c[0], c[1])]));
    assert!(!fx.path().join("summary").exists());
}

#[test]
fn worker_failure_names_the_ref() {
    let fx = Fixture::new();
    let missing = CommitId::from_hash([0x42; 32]);
    let assert = fx
        .update(&[
            "--generate-static-delta-ref",
            REF,
            "--generate-static-delta-to",
            &missing.to_hex(),
        ])
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(
        stderr.contains(&format!("{REF} ({})", missing.short_hex())),
        "stderr: {stderr}"
    );
}

#[test]
fn failed_worker_does_not_fail_the_run() {
    let fx = Fixture::new();
    let good = fx.commit(None, 1);
    let mut broken = CommitRecord::new(None, 2, "tree missing");
    broken.root_tree = Some(brepo_types::ObjectId::from_hash([0x42; 32]));
    let broken = fx.repo.write_commit(&broken).unwrap();
    fx.point(REF, good);
    fx.point("app/org.example.Broken/x86_64/stable", broken);

    let assert = fx
        .update(&["--generate-static-deltas", "--no-update-appstream"])
        .success();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(
        stderr.contains(&format!("app/org.example.Broken/x86_64/stable ({})", broken.short_hex())),
        "stderr: {stderr}"
    );
    assert_eq!(fx.deltas(), names(&[DeltaName::full(good)]));
    assert!(fx.path().join("summary").exists());
}

#[test]
fn missing_repository_fails() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("brepo")
        .args(["update-repo"])
        .arg(dir.path().join("absent"))
        .assert()
        .failure();
}
