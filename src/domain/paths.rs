//! # Project Paths
//!
//! The sandbox boundary. Every user- or model-supplied path goes through
//! [`ProjectRoot::resolve`] before it touches the filesystem, and every resolved
//! path is turned back into a shadow-state key with [`ProjectRoot::relative`].

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::domain::types::ToolError;

/// Directory (relative to the project root) that receives uploaded files.
pub const UPLOADS_DIR: &str = "uploads";

/// The single sandboxed directory all file operations are confined to.
#[derive(Debug, Clone)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    /// Creates the directory if needed and pins its canonical form.
    pub fn open(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolves a root-relative path to a canonical absolute path inside the root.
    ///
    /// Leading separators are stripped, so `/foo` means `<root>/foo`. Absolute
    /// paths that already point inside the root are taken as they are, which
    /// keeps `resolve(resolve(p)) == resolve(p)`. Targets that do not exist yet
    /// are resolved through their deepest existing ancestor.
    pub fn resolve(&self, input: &str) -> Result<PathBuf, ToolError> {
        let raw = Path::new(input);
        let joined = if raw.is_absolute() && raw.starts_with(&self.root) {
            raw.to_path_buf()
        } else {
            let trimmed = input.trim_start_matches(['/', '\\']);
            self.root.join(trimmed)
        };

        let resolved = canonicalize_lenient(&joined)
            .map_err(|e| ToolError::InvalidInput(format!("Invalid path '{}': {}", input, e)))?;

        if resolved == self.root || resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            tracing::warn!(path = %input, resolved = %resolved.display(), "Rejected path outside project root");
            Err(ToolError::PathEscape(input.to_string()))
        }
    }

    /// Converts a resolved path into the forward-slash key used by the shadow state.
    /// The root itself maps to an empty string.
    pub fn relative(&self, resolved: &Path) -> Result<String, ToolError> {
        let rel = resolved
            .strip_prefix(&self.root)
            .map_err(|_| ToolError::PathEscape(resolved.display().to_string()))?;
        Ok(normalize_key(rel))
    }

    /// `resolve` followed by `relative`.
    pub fn locate(&self, input: &str) -> Result<(PathBuf, String), ToolError> {
        let resolved = self.resolve(input)?;
        let key = self.relative(&resolved)?;
        Ok((resolved, key))
    }
}

/// Joins the normal components of a relative path with `/`.
pub fn normalize_key(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parent key of a shadow-state key (`""` for top-level entries).
pub fn parent_key(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..idx],
        None => "",
    }
}

/// Canonicalizes `path`, tolerating a missing tail.
///
/// `.` and `..` are folded lexically first; then the deepest existing ancestor
/// is canonicalized (following symlinks) and the missing components are
/// re-appended.
fn canonicalize_lenient(path: &Path) -> std::io::Result<PathBuf> {
    let mut lexical = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other.as_os_str()),
        }
    }

    let mut current = lexical.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        match current.canonicalize() {
            Ok(canonical) => {
                let mut full = canonical;
                for part in missing.iter().rev() {
                    full.push(part);
                }
                return Ok(full);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (current.parent(), current.file_name()) else {
                    return Err(e);
                };
                missing.push(name.to_owned());
                current = parent;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ProjectRoot) {
        let tmp = TempDir::new().unwrap();
        let root = ProjectRoot::open(tmp.path().join("projects")).unwrap();
        (tmp, root)
    }

    #[test]
    fn empty_and_dot_resolve_to_root() {
        let (_tmp, root) = fixture();
        assert_eq!(root.resolve("").unwrap(), root.path());
        assert_eq!(root.resolve(".").unwrap(), root.path());
        assert_eq!(root.relative(root.path()).unwrap(), "");
    }

    #[test]
    fn parent_segments_that_escape_are_rejected() {
        let (_tmp, root) = fixture();
        for input in ["..", "../x", "a/../../x", "/../etc/passwd", "a/b/../../../.."] {
            assert!(
                matches!(root.resolve(input), Err(ToolError::PathEscape(_))),
                "expected escape for {input}"
            );
        }
    }

    #[test]
    fn parent_segments_inside_root_are_folded() {
        let (_tmp, root) = fixture();
        let resolved = root.resolve("a/b/../c.txt").unwrap();
        assert_eq!(resolved, root.path().join("a/c.txt"));
        assert_eq!(root.relative(&resolved).unwrap(), "a/c.txt");
    }

    #[test]
    fn leading_separator_is_root_relative() {
        let (_tmp, root) = fixture();
        assert_eq!(root.resolve("/etc/passwd").unwrap(), root.path().join("etc/passwd"));
        assert_eq!(root.resolve("//app/main.py").unwrap(), root.path().join("app/main.py"));
    }

    #[test]
    fn resolve_is_idempotent() {
        let (_tmp, root) = fixture();
        std::fs::create_dir_all(root.path().join("app/src")).unwrap();
        for input in ["app", "app/src/main.rs", "new/dir/file.txt", "", "/x/./y"] {
            let once = root.resolve(input).unwrap();
            let twice = root.resolve(once.to_str().unwrap()).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_is_rejected() {
        let (tmp, root) = fixture();
        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("link")).unwrap();

        assert!(matches!(root.resolve("link"), Err(ToolError::PathEscape(_))));
        assert!(matches!(root.resolve("link/secret.txt"), Err(ToolError::PathEscape(_))));
    }

    #[test]
    fn sibling_with_common_prefix_is_not_inside() {
        let (tmp, root) = fixture();
        std::fs::create_dir_all(tmp.path().join("projects-evil")).unwrap();
        assert!(matches!(
            root.resolve("../projects-evil/x"),
            Err(ToolError::PathEscape(_))
        ));
    }

    #[test]
    fn parent_key_splits_on_last_slash() {
        assert_eq!(parent_key("a/b/c.txt"), "a/b");
        assert_eq!(parent_key("c.txt"), "");
    }
}
