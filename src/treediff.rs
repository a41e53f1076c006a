//! Recursive comparison of two directory trees, in the spirit of `diff -Nru expected got`.

use std::collections::{ BTreeMap, BTreeSet };
use std::fmt;
use std::path::{ Path, PathBuf };

use similar::TextDiff;
use wax::{ Glob, LinkBehavior, WalkBehavior };

use crate::error::{ HarnessError, HarnessResult };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Expected,
    Got,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Expected => "expected",
            Side::Got => "got",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeDifference {
    /// Present on one side only. Descendants of such a directory are not listed separately.
    OnlyIn { side: Side, path: PathBuf },
    /// A file on one side, a directory on the other.
    KindMismatch { path: PathBuf },
    /// Both files exist but their bytes differ; `diff` is unified for UTF-8 text.
    ContentMismatch { path: PathBuf, diff: String },
}

impl TreeDifference {
    pub fn path(&self) -> &Path {
        match self {
            Self::OnlyIn { path, .. } | Self::KindMismatch { path } | Self::ContentMismatch { path, .. } => path,
        }
    }
}

impl fmt::Display for TreeDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnlyIn { side, path } => write!(f, "Only in {side}: {}", path.display()),
            Self::KindMismatch { path } => write!(f, "File type differs: {}", path.display()),
            Self::ContentMismatch { diff, .. } => f.write_str(diff),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Dir,
}

/// Every path under `root`, relative to it. Symlinks are followed (as `diff -r` does), so a linked
/// directory is compared by its contents.
fn collect_tree(root: &Path) -> HarnessResult<BTreeMap<PathBuf, Kind>> {
    if !root.is_dir() {
        return Err(
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: not a directory", root.display())
            ).into()
        );
    }
    let mut entries = BTreeMap::new();
    let behavior = WalkBehavior { link: LinkBehavior::ReadTarget, ..WalkBehavior::default() };
    for entry in Glob::new("**/*")?.walk_with_behavior(root, behavior) {
        let entry = entry?;
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let kind = if path.is_dir() { Kind::Dir } else { Kind::File };
        entries.insert(rel.to_path_buf(), kind);
    }
    Ok(entries)
}

fn compare_files(expected: &Path, got: &Path, rel: &Path) -> HarnessResult<Option<String>> {
    let a = std::fs::read(expected)?;
    let b = std::fs::read(got)?;
    if a == b {
        return Ok(None);
    }
    let diff = match (std::str::from_utf8(&a), std::str::from_utf8(&b)) {
        (Ok(a), Ok(b)) => {
            let old = format!("expected/{}", rel.display());
            let new = format!("got/{}", rel.display());
            TextDiff::from_lines(a, b).unified_diff().context_radius(3).header(&old, &new).to_string()
        }
        _ => format!("Binary files expected/{0} and got/{0} differ\n", rel.display()),
    };
    Ok(Some(diff))
}

/// Compare `expected` against `got` and list every difference, ordered by path.
pub fn diff_trees(expected: &Path, got: &Path) -> HarnessResult<Vec<TreeDifference>> {
    let left = collect_tree(expected)?;
    let right = collect_tree(got)?;
    let paths: BTreeSet<&PathBuf> = left.keys().chain(right.keys()).collect();

    let mut differences = Vec::new();
    let mut only_dirs: Vec<&Path> = Vec::new();
    for rel in paths {
        if only_dirs.iter().any(|dir| rel.starts_with(dir)) {
            continue;
        }
        match (left.get(rel), right.get(rel)) {
            (Some(kind), None) | (None, Some(kind)) => {
                let side = if left.contains_key(rel) { Side::Expected } else { Side::Got };
                if *kind == Kind::Dir {
                    only_dirs.push(rel);
                }
                differences.push(TreeDifference::OnlyIn { side, path: rel.clone() });
            }
            (Some(a), Some(b)) if a != b => {
                if *a == Kind::Dir || *b == Kind::Dir {
                    only_dirs.push(rel);
                }
                differences.push(TreeDifference::KindMismatch { path: rel.clone() });
            }
            (Some(Kind::File), Some(Kind::File)) => {
                if let Some(diff) = compare_files(&expected.join(rel), &got.join(rel), rel)? {
                    differences.push(TreeDifference::ContentMismatch { path: rel.clone(), diff });
                }
            }
            _ => {}
        }
    }
    Ok(differences)
}

/// `Ok(())` when the trees are identical, otherwise a `TreeMismatch` with the full report.
pub fn assert_dirs_equal(expected: &Path, got: &Path) -> HarnessResult<()> {
    let differences = diff_trees(expected, got)?;
    if differences.is_empty() {
        return Ok(());
    }
    let report = differences
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    log::warn!("{} differences between {} and {}", differences.len(), expected.display(), got.display());
    Err(HarnessError::TreeMismatch(report))
}
