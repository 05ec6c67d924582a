use starhaul_game::GameStorage;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("save name `{0}` may only contain letters, digits, `-` and `_`")]
    InvalidName(String),
    #[error("failed to create save directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to delete {}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One `<name>.json` file per save slot under a root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn slot_path(&self, save_name: &str) -> Result<PathBuf, StorageError> {
        let valid = !save_name.is_empty()
            && save_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidName(save_name.to_string()));
        }
        Ok(self.root.join(format!("{save_name}.json")))
    }
}

impl GameStorage for FileStorage {
    type Error = StorageError;

    fn save_game(&self, save_name: &str, document: &str) -> Result<(), Self::Error> {
        let path = self.slot_path(save_name)?;
        fs::create_dir_all(&self.root).map_err(|source| StorageError::CreateDir {
            path: self.root.clone(),
            source,
        })?;
        // stage beside the slot, then swap in
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, document)
            .and_then(|()| fs::rename(&staging, &path))
            .map_err(|source| StorageError::Write { path, source })
    }

    fn load_game(&self, save_name: &str) -> Result<Option<String>, Self::Error> {
        let path = self.slot_path(save_name)?;
        match fs::read_to_string(&path) {
            Ok(document) => Ok(Some(document)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        let path = self.slot_path(save_name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Delete { path, source }),
        }
    }
}
