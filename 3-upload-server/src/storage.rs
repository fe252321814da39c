use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};

use tokio::fs::File;

pub const DEFAULT_EXTENSIONS: &[&str] = &["txt", "pdf", "png", "jpg", "jpeg", "gif", "docx"];

/// A directory that accepts files whose extension is on an allow-list.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    allowed: HashSet<String>,
}

impl UploadStore {
    /// Creates `dir` if needed. Extensions are matched case-insensitively.
    pub async fn open<I, S>(dir: impl Into<PathBuf>, allowed: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        let allowed = allowed
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Ok(Self { dir, allowed })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn accepts(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => self.allowed.contains(&ext.to_ascii_lowercase()),
            None => false,
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn create(&self, name: &str) -> io::Result<File> {
        File::create(self.path_for(name)).await
    }

    /// Removes a partially written file; a missing file is not an error.
    pub async fn discard(&self, name: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// Reduces a client-supplied filename to its last path component, so uploads
/// can never land outside the store's directory.
pub fn sanitize_filename(raw: &str) -> Option<&str> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extension_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::open(dir.path(), DEFAULT_EXTENSIONS).await.unwrap();

        assert!(store.accepts("notes.txt"));
        assert!(store.accepts("photo.JPEG"));
        assert!(store.accepts("archive.tar.docx"));
        assert!(!store.accepts("run.exe"));
        assert!(!store.accepts("txt"));
        assert!(!store.accepts("trailing."));
    }

    #[tokio::test]
    async fn custom_extensions_are_normalised() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::open(dir.path(), [".CSV", "", "md"]).await.unwrap();

        assert!(store.accepts("table.csv"));
        assert!(store.accepts("README.md"));
        assert!(!store.accepts("notes.txt"));
    }

    #[tokio::test]
    async fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("uploads");

        let store = UploadStore::open(&nested, DEFAULT_EXTENSIONS).await.unwrap();

        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[tokio::test]
    async fn discard_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::open(dir.path(), DEFAULT_EXTENSIONS).await.unwrap();

        store.discard("never-written.txt").await.unwrap();
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("report.pdf"), Some("report.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd.txt"), Some("passwd.txt"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\cat.png"), Some("cat.png"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
    }
}
