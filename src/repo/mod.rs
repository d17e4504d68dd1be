//! Read-only view of the repository being built
//!
//! Platforms probe the repository only through [`SourceRepo`]; the generator
//! never mutates it. [`LocalSourceRepo`] serves a directory through any
//! [`FileSystem`], which lets tests run against [`crate::fs::MockFileSystem`].

use crate::fs::{FileSystem, RealFileSystem};
use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Directories never descended into while enumerating files.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "__pycache__", ".venv", "bin", "obj"];

pub trait SourceRepo: Send + Sync {
    fn root_path(&self) -> &Path;

    /// True when the file at `root/segments...` exists.
    fn file_exists(&self, segments: &[&str]) -> bool;

    /// Files whose name matches `pattern` (`*` and `?` wildcards), relative
    /// paths sorted for stable iteration.
    fn enumerate_files(&self, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>>;

    fn read_file(&self, segments: &[&str]) -> Result<String>;

    fn read_all_lines(&self, segments: &[&str]) -> Result<Vec<String>> {
        Ok(self
            .read_file(segments)?
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Commit the working tree is checked out at, if it is a git repository.
    fn commit_id(&self) -> Option<String>;
}

pub struct LocalSourceRepo {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl LocalSourceRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fs(root, Arc::new(RealFileSystem::new()))
    }

    pub fn with_fs(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    fn path_of(&self, segments: &[&str]) -> PathBuf {
        segments
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn walk(
        &self,
        dir: &Path,
        matcher: &Regex,
        recursive: bool,
        found: &mut Vec<PathBuf>,
    ) -> Result<()> {
        for entry in self.fs.read_dir(dir)? {
            if entry.is_dir() {
                if recursive && !SKIPPED_DIRS.contains(&entry.name.as_str()) {
                    self.walk(&entry.path, matcher, recursive, found)?;
                }
            } else if matcher.is_match(&entry.name) {
                let relative = entry
                    .path
                    .strip_prefix(&self.root)
                    .map(Path::to_path_buf)
                    .unwrap_or(entry.path);
                found.push(relative);
            }
        }
        Ok(())
    }

    fn resolve_ref(&self, reference: &str) -> Option<String> {
        let git_dir = self.root.join(".git");

        if let Ok(loose) = self.fs.read_to_string(&git_dir.join(reference)) {
            let hash = loose.trim();
            if !hash.is_empty() {
                return Some(hash.to_string());
            }
        }

        let packed = self.fs.read_to_string(&git_dir.join("packed-refs")).ok()?;
        packed
            .lines()
            .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
            .find_map(|line| {
                let (hash, name) = line.split_once(' ')?;
                (name.trim() == reference).then(|| hash.to_string())
            })
    }
}

impl SourceRepo for LocalSourceRepo {
    fn root_path(&self) -> &Path {
        &self.root
    }

    fn file_exists(&self, segments: &[&str]) -> bool {
        self.fs.is_file(&self.path_of(segments))
    }

    fn enumerate_files(&self, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
        let matcher = glob_to_regex(pattern)?;
        let mut found = Vec::new();
        self.walk(&self.root, &matcher, recursive, &mut found)?;
        found.sort();
        trace!(pattern, count = found.len(), "Enumerated repository files");
        Ok(found)
    }

    fn read_file(&self, segments: &[&str]) -> Result<String> {
        self.fs.read_to_string(&self.path_of(segments))
    }

    fn commit_id(&self) -> Option<String> {
        let head = self.fs.read_to_string(&self.root.join(".git").join("HEAD")).ok()?;
        let head = head.trim();

        match head.strip_prefix("ref:") {
            Some(reference) => self.resolve_ref(reference.trim()),
            None if !head.is_empty() => Some(head.to_string()),
            None => None,
        }
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).with_context(|| format!("Invalid file pattern '{}'", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    fn mock_repo() -> LocalSourceRepo {
        let fs = MockFileSystem::with_root(PathBuf::from("/repo"));
        fs.add_file("app.csproj", "<Project />");
        fs.add_file("src/Lib/Lib.csproj", "<Project />");
        fs.add_file("src/Lib/Class1.cs", "");
        fs.add_file("node_modules/pkg/pkg.csproj", "");
        fs.add_file("requirements.txt", "flask\nrequests\n");
        LocalSourceRepo::with_fs("/repo", Arc::new(fs))
    }

    #[test]
    fn test_file_exists_with_segments() {
        let repo = mock_repo();
        assert!(repo.file_exists(&["requirements.txt"]));
        assert!(repo.file_exists(&["src", "Lib", "Class1.cs"]));
        assert!(!repo.file_exists(&["src", "Lib"]));
        assert!(!repo.file_exists(&["package.json"]));
    }

    #[test]
    fn test_enumerate_files_top_level_only() {
        let repo = mock_repo();
        let files = repo.enumerate_files("*.csproj", false).unwrap();
        assert_eq!(files, vec![PathBuf::from("app.csproj")]);
    }

    #[test]
    fn test_enumerate_files_recursive_skips_vendored_dirs() {
        let repo = mock_repo();
        let files = repo.enumerate_files("*.csproj", true).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("app.csproj"),
                PathBuf::from("src/Lib/Lib.csproj")
            ]
        );
    }

    #[test]
    fn test_read_all_lines() {
        let repo = mock_repo();
        let lines = repo.read_all_lines(&["requirements.txt"]).unwrap();
        assert_eq!(lines, vec!["flask", "requests"]);
    }

    #[test]
    fn test_commit_id_follows_loose_ref() {
        let fs = MockFileSystem::with_root(PathBuf::from("/repo"));
        fs.add_file(".git/HEAD", "ref: refs/heads/main\n");
        fs.add_file(".git/refs/heads/main", "0123abcd\n");
        let repo = LocalSourceRepo::with_fs("/repo", Arc::new(fs));
        assert_eq!(repo.commit_id(), Some("0123abcd".to_string()));
    }

    #[test]
    fn test_commit_id_from_packed_refs() {
        let fs = MockFileSystem::with_root(PathBuf::from("/repo"));
        fs.add_file(".git/HEAD", "ref: refs/heads/main\n");
        fs.add_file(
            ".git/packed-refs",
            "# pack-refs with: peeled fully-peeled sorted\nfeedbeef refs/heads/main\n",
        );
        let repo = LocalSourceRepo::with_fs("/repo", Arc::new(fs));
        assert_eq!(repo.commit_id(), Some("feedbeef".to_string()));
    }

    #[test]
    fn test_commit_id_detached_and_missing() {
        let fs = MockFileSystem::with_root(PathBuf::from("/repo"));
        fs.add_file(".git/HEAD", "cafebabe\n");
        let repo = LocalSourceRepo::with_fs("/repo", Arc::new(fs));
        assert_eq!(repo.commit_id(), Some("cafebabe".to_string()));

        let repo = LocalSourceRepo::with_fs(
            "/repo",
            Arc::new(MockFileSystem::with_root(PathBuf::from("/repo"))),
        );
        assert_eq!(repo.commit_id(), None);
    }

    #[test]
    fn test_glob_to_regex() {
        let re = glob_to_regex("*.csproj").unwrap();
        assert!(re.is_match("App.csproj"));
        assert!(!re.is_match("App.csproj.user"));
        let re = glob_to_regex("runtime.tx?").unwrap();
        assert!(re.is_match("runtime.txt"));
    }
}
