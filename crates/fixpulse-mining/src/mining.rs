//! Git history extraction via git2.
//!
//! Walks every commit reachable from HEAD (or a branch) oldest-first and
//! records, for each tracked source file a commit touches, the change tally
//! that commit introduced. Files are followed across renames so that each
//! entity keeps a single identity for its whole life. Identity is resolved
//! against each commit's own first parent, so deletions on one branch do not
//! leak into another; the live set comes from the tip tree.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use fixpulse_core::{ChangeKind, ChangeTally, FixPulseError, MiningConfig};
use git2::{
    Delta, DiffFindOptions, DiffOptions, ObjectType, Oid, Patch, Repository, Sort, TreeWalkMode,
    TreeWalkResult,
};

/// Raw commit data extracted from git history.
///
/// # Examples
///
/// ```
/// use fixpulse_mining::mining::CommitRecord;
///
/// let record = CommitRecord {
///     id: "3f2a9c1d".into(),
///     author: "alice@example.com".into(),
///     timestamp: 1_700_000_000,
///     message: "fix: null check in parser".into(),
///     is_merge: false,
///     touches: vec![],
/// };
/// assert_eq!(record.author, "alice@example.com");
/// ```
#[derive(Debug, Clone)]
pub struct CommitRecord {
    /// Full commit id.
    pub id: String,
    /// Author identity: lower-cased e-mail, or the name when no e-mail is set.
    pub author: String,
    /// Unix timestamp of the commit.
    pub timestamp: i64,
    /// Full commit message.
    pub message: String,
    /// Whether the commit has more than one parent.
    pub is_merge: bool,
    /// Tracked entities this commit changed, each with a non-empty tally.
    pub touches: Vec<EntityTouch>,
}

/// A change to one tracked entity within a commit.
///
/// # Examples
///
/// ```
/// use fixpulse_core::{ChangeKind, ChangeTally};
/// use fixpulse_mining::mining::{ChangeStatus, EntityTouch};
///
/// let mut tally = ChangeTally::new();
/// tally.record(ChangeKind::Insert, 10);
/// let touch = EntityTouch {
///     entity: "src/Main.java".into(),
///     path: "src/Main.java".into(),
///     status: ChangeStatus::Added,
///     tally,
/// };
/// assert_eq!(touch.tally.total(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct EntityTouch {
    /// Entity id (the path the file was first tracked under).
    pub entity: String,
    /// Path of the file in this commit.
    pub path: String,
    /// Type of change.
    pub status: ChangeStatus,
    /// Changes relative to the first parent.
    pub tally: ChangeTally,
}

/// Status of a file change within a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeStatus {
    /// New file.
    Added,
    /// Existing file modified.
    Modified,
    /// File removed.
    Deleted,
    /// File renamed from another path.
    Renamed {
        /// Original path before rename.
        from: String,
    },
}

/// Options for history mining.
///
/// # Examples
///
/// ```
/// use fixpulse_mining::mining::MiningOptions;
///
/// let opts = MiningOptions::default();
/// assert_eq!(opts.extensions, vec!["java".to_string()]);
/// assert_eq!(opts.max_files_per_commit, 200);
/// ```
#[derive(Debug, Clone)]
pub struct MiningOptions {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Tracked file extensions, without the dot.
    pub extensions: Vec<String>,
    /// Bulk commits touching more tracked files than this produce no versions.
    pub max_files_per_commit: usize,
}

impl Default for MiningOptions {
    fn default() -> Self {
        Self::from(&MiningConfig::default())
    }
}

impl From<&MiningConfig> for MiningOptions {
    fn from(config: &MiningConfig) -> Self {
        Self {
            branch: config.branch.clone(),
            extensions: config.extensions.clone(),
            max_files_per_commit: config.max_files_per_commit,
        }
    }
}

impl MiningOptions {
    fn tracks(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Everything extracted from one history walk.
#[derive(Debug, Clone, Default)]
pub struct RepoHistory {
    /// Commits oldest-first.
    pub commits: Vec<CommitRecord>,
    /// Entities that still exist at the walked tip.
    pub live_entities: HashSet<String>,
    /// Bulk commits whose touches were dropped.
    pub skipped_commits: usize,
}

/// Mine commit history from a git repository.
///
/// Merge commits are recorded (they count towards author totals and may be
/// classified) but produce no touches, since their changes were already
/// recorded on the merged branch.
///
/// # Errors
///
/// Returns [`FixPulseError::Git`] if the repository cannot be opened or walked.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use fixpulse_mining::mining::{mine_history, MiningOptions};
///
/// let history = mine_history(Path::new("."), &MiningOptions::default()).unwrap();
/// for c in &history.commits {
///     println!("{}: {} touches", &c.id[..8], c.touches.len());
/// }
/// ```
pub fn mine_history(
    repo_path: &Path,
    options: &MiningOptions,
) -> Result<RepoHistory, FixPulseError> {
    let repo = Repository::open(repo_path)
        .map_err(|e| FixPulseError::Git(format!("failed to open repository: {e}")))?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| FixPulseError::Git(format!("failed to create revwalk: {e}")))?;

    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)
        .map_err(|e| FixPulseError::Git(format!("failed to set walk order: {e}")))?;

    let tip = resolve_tip(&repo, options)?;
    revwalk
        .push(tip.id())
        .map_err(|e| FixPulseError::Git(format!("failed to push tip: {e}")))?;

    let commits = revwalk
        .map(|oid_result| {
            let oid =
                oid_result.map_err(|e| FixPulseError::Git(format!("revwalk error: {e}")))?;
            repo.find_commit(oid)
                .map_err(|e| FixPulseError::Git(format!("failed to find commit: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut lineage = Lineage::new(&commits);
    let mut ids = EntityIds::default();
    let mut history = RepoHistory::default();

    for commit in &commits {
        let is_merge = commit.parent_count() > 1;
        let mut paths = match commit.parent_id(0) {
            Ok(parent) => lineage.inherit(parent),
            Err(_) => PathEntities::default(),
        };
        let changes = extract_file_changes(&repo, commit, options)?;
        let mut touches = Vec::new();

        if is_merge {
            let side_parents: Vec<Oid> = commit.parent_ids().skip(1).collect();
            {
                let sides: Vec<&PathEntities> = side_parents
                    .iter()
                    .filter_map(|oid| lineage.state(*oid))
                    .collect();
                for change in &changes {
                    paths.adopt(&change.path, &change.status, &sides, &mut ids);
                }
            }
            for oid in side_parents {
                lineage.release(oid);
            }
        } else {
            let bulk = changes.len() > options.max_files_per_commit;
            if bulk {
                history.skipped_commits += 1;
            }
            for change in changes {
                let entity = paths.apply(&change.path, &change.status, &mut ids);
                if !bulk && !change.tally.is_empty() {
                    touches.push(EntityTouch {
                        entity,
                        path: change.path,
                        status: change.status,
                        tally: change.tally,
                    });
                }
            }
        }

        let author = commit.author();
        let identity = match author.email() {
            Some(email) if !email.trim().is_empty() => email.trim().to_lowercase(),
            _ => author.name().unwrap_or("unknown").to_string(),
        };

        history.commits.push(CommitRecord {
            id: commit.id().to_string(),
            author: identity,
            timestamp: commit.time().seconds(),
            message: commit.message().unwrap_or("").to_string(),
            is_merge,
            touches,
        });
        lineage.record(commit.id(), paths);
    }

    let no_paths = PathEntities::default();
    let tip_paths = lineage.state(tip.id()).unwrap_or(&no_paths);
    history.live_entities = live_entities(&tip, tip_paths, options)?;
    Ok(history)
}

fn resolve_tip<'r>(
    repo: &'r Repository,
    options: &MiningOptions,
) -> Result<git2::Commit<'r>, FixPulseError> {
    match options.branch {
        Some(ref branch) => repo
            .resolve_reference_from_short_name(branch)
            .and_then(|reference| reference.peel_to_commit())
            .map_err(|e| FixPulseError::Git(format!("failed to resolve branch '{branch}': {e}"))),
        None => repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| FixPulseError::Git(format!("failed to resolve HEAD: {e}"))),
    }
}

/// Entities of the tracked files present in the tip tree.
fn live_entities(
    tip: &git2::Commit<'_>,
    paths: &PathEntities,
    options: &MiningOptions,
) -> Result<HashSet<String>, FixPulseError> {
    let tree = tip
        .tree()
        .map_err(|e| FixPulseError::Git(format!("failed to get tip tree: {e}")))?;

    let mut live = HashSet::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            if let Some(name) = entry.name() {
                let path = format!("{root}{name}");
                if options.tracks(&path) {
                    if let Some(entity) = paths.entity(&path) {
                        live.insert(entity.to_string());
                    }
                }
            }
        }
        TreeWalkResult::Ok
    })
    .map_err(|e| FixPulseError::Git(format!("failed to walk tip tree: {e}")))?;

    Ok(live)
}

/// A tracked file change before entity resolution.
struct FileChange {
    path: String,
    status: ChangeStatus,
    tally: ChangeTally,
}

fn extract_file_changes(
    repo: &Repository,
    commit: &git2::Commit,
    options: &MiningOptions,
) -> Result<Vec<FileChange>, FixPulseError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| FixPulseError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| FixPulseError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| FixPulseError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    diff_opts.ignore_filemode(true);
    let mut diff = repo
        .diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&commit_tree),
            Some(&mut diff_opts),
        )
        .map_err(|e| FixPulseError::Git(format!("failed to compute diff: {e}")))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| FixPulseError::Git(format!("failed to find renames: {e}")))?;

    let mut changes = Vec::new();

    for (idx, delta) in diff.deltas().enumerate() {
        let new_path = path_string(delta.new_file().path());
        let old_path = path_string(delta.old_file().path());

        let status = match delta.status() {
            Delta::Added | Delta::Copied => {
                if !options.tracks(&new_path) {
                    continue;
                }
                ChangeStatus::Added
            }
            Delta::Deleted => {
                if !options.tracks(&old_path) {
                    continue;
                }
                ChangeStatus::Deleted
            }
            Delta::Renamed => match (options.tracks(&old_path), options.tracks(&new_path)) {
                (true, true) => ChangeStatus::Renamed { from: old_path.clone() },
                (false, true) => ChangeStatus::Added,
                (true, false) => ChangeStatus::Deleted,
                (false, false) => continue,
            },
            Delta::Modified => {
                if !options.tracks(&new_path) {
                    continue;
                }
                ChangeStatus::Modified
            }
            _ => continue,
        };

        let path = if status == ChangeStatus::Deleted {
            old_path
        } else {
            new_path
        };
        if path.is_empty() {
            continue;
        }

        let mut tally = ChangeTally::new();
        if matches!(status, ChangeStatus::Renamed { .. }) {
            tally.record(ChangeKind::Move, 1);
        }
        tally_patch(&diff, idx, &mut tally)?;

        changes.push(FileChange {
            path,
            status,
            tally,
        });
    }

    Ok(changes)
}

/// Count hunk lines of one delta: paired removed/added lines are updates,
/// the surplus on either side are inserts or deletes.
fn tally_patch(
    diff: &git2::Diff<'_>,
    idx: usize,
    tally: &mut ChangeTally,
) -> Result<(), FixPulseError> {
    let Some(patch) = Patch::from_diff(diff, idx)
        .map_err(|e| FixPulseError::Git(format!("failed to build patch: {e}")))?
    else {
        return Ok(());
    };

    for hunk_idx in 0..patch.num_hunks() {
        let line_count = patch
            .num_lines_in_hunk(hunk_idx)
            .map_err(|e| FixPulseError::Git(format!("failed to read hunk: {e}")))?;
        let mut added = 0u64;
        let mut removed = 0u64;
        for line_idx in 0..line_count {
            let line = patch
                .line_in_hunk(hunk_idx, line_idx)
                .map_err(|e| FixPulseError::Git(format!("failed to read hunk line: {e}")))?;
            match line.origin() {
                '+' => added += 1,
                '-' => removed += 1,
                _ => {}
            }
        }
        let updated = added.min(removed);
        tally.record(ChangeKind::Update, updated);
        tally.record(ChangeKind::Insert, added - updated);
        tally.record(ChangeKind::Delete, removed - updated);
    }

    Ok(())
}

fn path_string(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Hands out entity ids; an id is never reused once given.
#[derive(Debug, Default)]
struct EntityIds {
    used: HashSet<String>,
}

impl EntityIds {
    /// First free id for `path`: the path itself, then `path#2`, `path#3`, ...
    fn fresh(&mut self, path: &str) -> String {
        let mut candidate = path.to_string();
        let mut n = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{path}#{n}");
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Tracked paths and their entity ids as of one commit.
#[derive(Debug, Clone, Default)]
struct PathEntities {
    by_path: HashMap<String, String>,
}

impl PathEntities {
    fn entity(&self, path: &str) -> Option<&str> {
        self.by_path.get(path).map(String::as_str)
    }

    /// Resolve the entity for a change on this line of history and update
    /// the path mapping.
    fn apply(&mut self, path: &str, status: &ChangeStatus, ids: &mut EntityIds) -> String {
        match status {
            ChangeStatus::Added => {
                let entity = ids.fresh(path);
                self.by_path.insert(path.to_string(), entity.clone());
                entity
            }
            ChangeStatus::Modified => match self.by_path.get(path) {
                Some(entity) => entity.clone(),
                None => {
                    let entity = ids.fresh(path);
                    self.by_path.insert(path.to_string(), entity.clone());
                    entity
                }
            },
            ChangeStatus::Deleted => self
                .by_path
                .remove(path)
                .unwrap_or_else(|| ids.fresh(path)),
            ChangeStatus::Renamed { from } => {
                let entity = self
                    .by_path
                    .remove(from)
                    .unwrap_or_else(|| ids.fresh(from));
                self.by_path.insert(path.to_string(), entity.clone());
                entity
            }
        }
    }

    /// Apply a merge commit's change against its first parent. Paths brought
    /// in from a merged branch keep the entity they had on that branch.
    fn adopt(
        &mut self,
        path: &str,
        status: &ChangeStatus,
        sides: &[&PathEntities],
        ids: &mut EntityIds,
    ) {
        let from_side = || sides.iter().find_map(|side| side.entity(path).map(String::from));
        let entity = match status {
            ChangeStatus::Deleted => {
                self.by_path.remove(path);
                return;
            }
            ChangeStatus::Added => from_side(),
            ChangeStatus::Modified => self.by_path.get(path).cloned().or_else(from_side),
            ChangeStatus::Renamed { from } => {
                let moved = self.by_path.remove(from);
                from_side().or(moved)
            }
        };
        let entity = entity.unwrap_or_else(|| ids.fresh(path));
        self.by_path.insert(path.to_string(), entity);
    }
}

/// Per-commit path mappings for the commits whose children are still to
/// be walked. Requires parents to be walked before their children.
#[derive(Debug, Default)]
struct Lineage {
    states: HashMap<Oid, PathEntities>,
    pending_children: HashMap<Oid, usize>,
}

impl Lineage {
    fn new(commits: &[git2::Commit<'_>]) -> Self {
        let mut pending_children: HashMap<Oid, usize> = HashMap::new();
        for commit in commits {
            for parent in commit.parent_ids() {
                *pending_children.entry(parent).or_default() += 1;
            }
        }
        Self {
            states: HashMap::new(),
            pending_children,
        }
    }

    fn state(&self, oid: Oid) -> Option<&PathEntities> {
        self.states.get(&oid)
    }

    fn record(&mut self, oid: Oid, paths: PathEntities) {
        self.states.insert(oid, paths);
    }

    /// Mapping of `parent` for one of its children. The last child takes
    /// it without a copy.
    fn inherit(&mut self, parent: Oid) -> PathEntities {
        if self.finish_child(parent) {
            self.states.remove(&parent).unwrap_or_default()
        } else {
            self.states.get(&parent).cloned().unwrap_or_default()
        }
    }

    /// A child has read `parent`'s mapping without inheriting it.
    fn release(&mut self, parent: Oid) {
        if self.finish_child(parent) {
            self.states.remove(&parent);
        }
    }

    /// Count one child of `parent` as walked; `true` when none remain.
    fn finish_child(&mut self, parent: Oid) -> bool {
        match self.pending_children.get_mut(&parent) {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mining_options_defaults_are_correct() {
        let opts = MiningOptions::default();
        assert_eq!(opts.max_files_per_commit, 200);
        assert_eq!(opts.extensions, vec!["java"]);
        assert!(opts.branch.is_none());
    }

    #[test]
    fn options_track_by_extension_case_insensitively() {
        let opts = MiningOptions {
            extensions: vec!["java".into(), "rs".into()],
            ..MiningOptions::default()
        };
        assert!(opts.tracks("src/Main.java"));
        assert!(opts.tracks("src/lib.RS"));
        assert!(!opts.tracks("README.md"));
        assert!(!opts.tracks("Makefile"));
    }

    #[test]
    fn path_entities_follow_renames() {
        let mut ids = EntityIds::default();
        let mut paths = PathEntities::default();
        let id = paths.apply("a/Foo.java", &ChangeStatus::Added, &mut ids);
        let renamed = paths.apply(
            "b/Foo.java",
            &ChangeStatus::Renamed {
                from: "a/Foo.java".into(),
            },
            &mut ids,
        );
        assert_eq!(id, renamed);
        assert_eq!(paths.apply("b/Foo.java", &ChangeStatus::Modified, &mut ids), id);
        assert_eq!(paths.entity("b/Foo.java"), Some(id.as_str()));
        assert_eq!(paths.entity("a/Foo.java"), None);
    }

    #[test]
    fn reused_paths_get_a_fresh_id() {
        let mut ids = EntityIds::default();
        let mut paths = PathEntities::default();
        let first = paths.apply("Foo.java", &ChangeStatus::Added, &mut ids);
        paths.apply(
            "Bar.java",
            &ChangeStatus::Renamed {
                from: "Foo.java".into(),
            },
            &mut ids,
        );
        let second = paths.apply("Foo.java", &ChangeStatus::Added, &mut ids);
        assert_eq!(first, "Foo.java");
        assert_eq!(second, "Foo.java#2");
    }

    #[test]
    fn deletion_on_one_line_leaves_the_other_intact() {
        let mut ids = EntityIds::default();
        let mut base = PathEntities::default();
        let id = base.apply("Foo.java", &ChangeStatus::Added, &mut ids);

        let mut side = base.clone();
        side.apply("Foo.java", &ChangeStatus::Deleted, &mut ids);
        assert_eq!(side.entity("Foo.java"), None);

        assert_eq!(base.apply("Foo.java", &ChangeStatus::Modified, &mut ids), id);
    }

    #[test]
    fn merges_adopt_entities_from_the_merged_branch() {
        let mut ids = EntityIds::default();
        let mut side = PathEntities::default();
        let bar = side.apply("Bar.java", &ChangeStatus::Added, &mut ids);
        let mut main = PathEntities::default();
        let foo = main.apply("Foo.java", &ChangeStatus::Added, &mut ids);

        main.adopt("Bar.java", &ChangeStatus::Added, &[&side], &mut ids);
        main.adopt("Foo.java", &ChangeStatus::Modified, &[&side], &mut ids);
        assert_eq!(main.entity("Bar.java"), Some(bar.as_str()));
        assert_eq!(main.entity("Foo.java"), Some(foo.as_str()));

        main.adopt("Foo.java", &ChangeStatus::Deleted, &[&side], &mut ids);
        assert_eq!(main.entity("Foo.java"), None);
    }

    #[test]
    fn lineage_keeps_state_until_last_child() {
        let parent = Oid::from_str("0123456789abcdef0123456789abcdef01234567").unwrap();
        let mut lineage = Lineage::default();
        lineage.pending_children.insert(parent, 2);

        let mut ids = EntityIds::default();
        let mut paths = PathEntities::default();
        paths.apply("Foo.java", &ChangeStatus::Added, &mut ids);
        lineage.record(parent, paths);

        let first = lineage.inherit(parent);
        assert_eq!(first.entity("Foo.java"), Some("Foo.java"));
        assert!(lineage.state(parent).is_some());

        lineage.release(parent);
        assert!(lineage.state(parent).is_none());
    }
}
