//! Atomic temp+rename disk writes shared by the thumbnail and cache
//! workers (§4.7, §4.8): never leaves a half-written rendition visible at
//! its final path.

use std::path::Path;

use uuid::Uuid;

pub async fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let temp_path = dest.with_extension(format!("tmp-{}", Uuid::new_v4()));
    tokio::fs::write(&temp_path, bytes).await?;
    tokio::fs::rename(&temp_path, dest).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_file_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("deeper").join("out.jpg");

        write_atomic(&dest, b"hello").await.unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jpg");

        write_atomic(&dest, b"data").await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![dest.file_name().unwrap().to_owned()]);
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.jpg");

        write_atomic(&dest, b"first").await.unwrap();
        write_atomic(&dest, b"second").await.unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"second");
    }
}
