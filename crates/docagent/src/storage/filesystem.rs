use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::store::FileStore;
use crate::error::StoreError;

const FILES_DIR: &str = "files";
const OUTPUTS_DIR: &str = "outputs";

/// Rejects names that could escape the project directory.
fn validate_name(name: &str) -> Result<(), StoreError> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name refers to a directory")
    } else if name.contains('/') || name.contains('\\') {
        Some("name contains a path separator")
    } else if name.contains('\0') {
        Some("name contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Filesystem-backed project store.
///
/// Layout: `<root>/<project>/files/<file id>` for inputs and
/// `<root>/<project>/outputs/<file name>` for generated outputs.
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project_id: &str) -> Result<PathBuf, StoreError> {
        validate_name(project_id)?;
        Ok(self.root.join(project_id))
    }

    async fn ensure_directory(&self, path: &Path) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StoreError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Writes with exclusive creation, falling back to numbered variants
    /// (`name_2.ext`, `name_3.ext`, ...) so existing outputs are never clobbered.
    async fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let (base, ext) = match filename.rfind('.') {
            Some(dot_pos) if dot_pos > 0 => (&filename[..dot_pos], Some(&filename[dot_pos..])),
            _ => (filename, None),
        };

        for counter in 1..=1000 {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };
            let try_path = dir_path.join(&try_filename);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .await
                        .map_err(|e| StoreError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    file.flush().await.map_err(|e| StoreError::WriteFile {
                        path: try_path.clone(),
                        source: e,
                    })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StoreError::WriteFile {
                        path: try_path,
                        source: e,
                    })
                }
            }
        }

        Err(StoreError::WriteFile {
            path: dir_path.join(filename),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "no free output name after 1000 attempts",
            ),
        })
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    async fn read_file(&self, project_id: &str, file_id: &str) -> Result<Vec<u8>, StoreError> {
        validate_name(file_id)?;
        let path = self.project_dir(project_id)?.join(FILES_DIR).join(file_id);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                project_id: project_id.to_string(),
                file_id: file_id.to_string(),
            }),
            Err(e) => Err(StoreError::ReadFile { path, source: e }),
        }
    }

    async fn write_output(
        &self,
        project_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<PathBuf, StoreError> {
        validate_name(file_name)?;
        let dir_path = self.project_dir(project_id)?.join(OUTPUTS_DIR);
        self.ensure_directory(&dir_path).await?;
        self.store_with_atomic_creation(&dir_path, file_name, content)
            .await
    }

    async fn check_project(&self, project_id: &str) -> Result<(), StoreError> {
        let dir = self.project_dir(project_id)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(StoreError::ProjectUnavailable(project_id.to_string())),
        }
    }
}
