//! Document enumeration and reading.
//!
//! [`VaultSource`] is the capability the sync engine reads documents
//! through. [`FsVault`] implements it over a directory on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::instrument;
use vaultmirror_core::{DocumentRef, Error, Result};
use walkdir::{DirEntry, WalkDir};

/// Read access to the documents of a vault
#[async_trait]
pub trait VaultSource: Send + Sync {
    /// All mirrored documents ordered by path, skipping any path equal to or
    /// below one of `excluded_prefixes`
    async fn enumerate_documents(&self, excluded_prefixes: &[String]) -> Result<Vec<DocumentRef>>;

    /// Full text of a document
    async fn read_content(&self, doc: &DocumentRef) -> Result<String>;
}

/// Whether a vault-relative path is excluded by an exact or `prefix/` match
pub fn is_excluded(path: &str, excluded_prefixes: &[String]) -> bool {
    excluded_prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_matches('/');
        !prefix.is_empty()
            && (path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/')))
    })
}

/// Whether a file name carries one of the allowed extensions (`.md` form)
pub fn has_allowed_extension(path: &Path, allowed_extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    allowed_extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Vault backed by a local directory
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    allowed_extensions: Vec<String>,
}

impl FsVault {
    /// Vault rooted at `root`, mirroring files with the given extensions
    pub fn new(root: impl Into<PathBuf>, allowed_extensions: Vec<String>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::invalid_path(format!(
                "Vault root is not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root,
            allowed_extensions,
        })
    }

    /// Root directory of the vault
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vault-relative `/`-separated path of an absolute path under the root
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            segments.push(component.as_os_str().to_str()?);
        }
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        }
    }

    fn scan(&self, excluded_prefixes: &[String]) -> Result<Vec<DocumentRef>> {
        let mut documents = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.skip_entry(entry, excluded_prefixes));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(Error::io(std::io::Error::other(e))),
                Err(e) => {
                    log::warn!("Skipping unreadable vault entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file()
                || !has_allowed_extension(entry.path(), &self.allowed_extensions)
            {
                continue;
            }

            let Some(relative) = self.relative_path(entry.path()) else {
                log::warn!("Skipping non UTF-8 path: {}", entry.path().display());
                continue;
            };

            // Editors replace files while saving; a vanished entry is skipped
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    log::warn!("Skipping {}: {}", relative, e);
                    continue;
                }
            };
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64);

            documents.push(DocumentRef::from_path(relative, modified, metadata.len()));
        }

        documents.sort();
        Ok(documents)
    }

    fn skip_entry(&self, entry: &DirEntry, excluded_prefixes: &[String]) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        match self.relative_path(entry.path()) {
            Some(relative) => is_excluded(&relative, excluded_prefixes),
            None => true,
        }
    }
}

#[async_trait]
impl VaultSource for FsVault {
    #[instrument(skip(self, excluded_prefixes), fields(root = ?self.root), name = "vault_enumerate")]
    async fn enumerate_documents(&self, excluded_prefixes: &[String]) -> Result<Vec<DocumentRef>> {
        let vault = self.clone();
        let excluded = excluded_prefixes.to_vec();
        let documents = tokio::task::spawn_blocking(move || vault.scan(&excluded))
            .await
            .map_err(|e| Error::other(format!("Vault scan task failed: {}", e)))??;

        log::debug!("Enumerated {} documents", documents.len());
        Ok(documents)
    }

    async fn read_content(&self, doc: &DocumentRef) -> Result<String> {
        let full_path = self.root.join(&doc.path);
        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::file_not_found(full_path))
            }
            Err(e) => Err(Error::io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn prefixes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn create_vault() -> (TempDir, FsVault) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("Projects/Alpha")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::create_dir_all(root.join("Archive")).unwrap();
        fs::write(root.join("Home.md"), "# Home").unwrap();
        fs::write(root.join("Projects/Alpha/Plan.md"), "plan").unwrap();
        fs::write(root.join("Projects/Notes.md"), "notes").unwrap();
        fs::write(root.join("Projects/image.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join(".obsidian/workspace.md"), "x").unwrap();
        fs::write(root.join("Archive/Old.md"), "old").unwrap();
        fs::write(root.join("Archived.md"), "kept").unwrap();

        let vault = FsVault::new(root, vec![".md".to_string()]).unwrap();
        (temp_dir, vault)
    }

    #[test]
    fn test_is_excluded() {
        let excluded = prefixes(&[".obsidian", "Archive/"]);
        assert!(is_excluded(".obsidian", &excluded));
        assert!(is_excluded(".obsidian/workspace.md", &excluded));
        assert!(is_excluded("Archive/Old.md", &excluded));
        assert!(!is_excluded("Archived.md", &excluded));
        assert!(!is_excluded("Notes/.obsidian.md", &excluded));
        assert!(!is_excluded("anything", &prefixes(&[""])));
    }

    #[test]
    fn test_allowed_extension() {
        let allowed = prefixes(&[".md"]);
        assert!(has_allowed_extension(Path::new("a/b.md"), &allowed));
        assert!(has_allowed_extension(Path::new("a/b.MD"), &allowed));
        assert!(!has_allowed_extension(Path::new("a/b.png"), &allowed));
        assert!(!has_allowed_extension(Path::new("README"), &allowed));
    }

    #[tokio::test]
    async fn test_enumerate_sorted_and_filtered() {
        let (_temp_dir, vault) = create_vault();
        let docs = vault
            .enumerate_documents(&prefixes(&[".obsidian", "Archive"]))
            .await
            .unwrap();

        let paths: Vec<&str> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Archived.md",
                "Home.md",
                "Projects/Alpha/Plan.md",
                "Projects/Notes.md"
            ]
        );

        let plan = &docs[2];
        assert_eq!(plan.display_name, "Plan");
        assert_eq!(plan.parent_path, "Projects/Alpha");
        assert_eq!(plan.size, 4);
        assert!(plan.modified_at_millis.is_some());
    }

    #[tokio::test]
    async fn test_read_content() {
        let (_temp_dir, vault) = create_vault();
        let doc = DocumentRef::from_path("Projects/Notes.md", None, 0);
        assert_eq!(vault.read_content(&doc).await.unwrap(), "notes");

        let missing = DocumentRef::from_path("Nope.md", None, 0);
        assert!(matches!(
            vault.read_content(&missing).await,
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let result = FsVault::new("/definitely/not/a/vault", vec![".md".to_string()]);
        assert!(result.is_err());
    }
}
