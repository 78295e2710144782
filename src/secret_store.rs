use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Key the Gemini credential is stored under.
pub const API_KEY_SECRET: &str = "GEMINI_API_KEY";

/// Environment variables checked for the credential, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// A small JSON-file store for API keys.
///
/// Lives at `~/.chia/secrets.json` unless opened with [`SecretStore::at`].
#[derive(Debug, Serialize, Deserialize)]
pub struct SecretStore {
    /// Map of secret keys to their values
    secrets: HashMap<String, String>,
    /// Path to the secrets file
    file_path: PathBuf,
}

impl SecretStore {
    /// Opens the store in the user's home directory, creating the folder if needed.
    pub fn new() -> io::Result<Self> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not find home directory")
        })?;
        Self::at(home_dir.join(".chia").join("secrets.json"))
    }

    /// Opens the store backed by `file_path`.
    pub fn at(file_path: impl Into<PathBuf>) -> io::Result<Self> {
        let file_path = file_path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut store = SecretStore {
            secrets: HashMap::new(),
            file_path,
        };

        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn load(&mut self) -> io::Result<()> {
        match File::open(&self.file_path) {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents)?;
                self.secrets = serde_json::from_str(&contents).map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("unreadable secrets file {}: {e}", self.file_path.display()),
                    )
                })?;
                Ok(())
            }
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn save(&self) -> io::Result<()> {
        let contents = serde_json::to_string_pretty(&self.secrets)?;
        let mut file = File::create(&self.file_path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// Sets a secret value for the given key and saves the file.
    pub fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.secrets.insert(key.to_string(), value.to_string());
        self.save()
    }

    /// Retrieves a secret value for the given key
    pub fn get(&self, key: &str) -> Option<&String> {
        self.secrets.get(key)
    }

    /// Deletes a secret with the given key and saves the file.
    pub fn delete(&mut self, key: &str) -> io::Result<()> {
        self.secrets.remove(key);
        self.save()
    }
}

/// Finds the Gemini credential.
///
/// An explicit key wins, then the secret store, then [`API_KEY_ENV_VARS`].
/// Blank values are skipped.
pub fn resolve_api_key(explicit: Option<String>, store: Option<&SecretStore>) -> Option<String> {
    explicit
        .into_iter()
        .chain(store.and_then(|s| s.get(API_KEY_SECRET).cloned()))
        .chain(API_KEY_ENV_VARS.iter().filter_map(|name| std::env::var(name).ok()))
        .find(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("secrets.json");

        let mut store = SecretStore::at(&path).unwrap();
        store.set(API_KEY_SECRET, "abc").unwrap();

        let reopened = SecretStore::at(&path).unwrap();
        assert_eq!(reopened.get(API_KEY_SECRET).map(String::as_str), Some("abc"));

        let mut store = reopened;
        store.delete(API_KEY_SECRET).unwrap();
        assert!(SecretStore::at(&path).unwrap().get(API_KEY_SECRET).is_none());
    }

    #[test]
    fn corrupt_file_is_refused_and_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        let original = r#"{"OPENAI": "sk-keep-me",}"#;
        fs::write(&path, original).unwrap();

        let err = SecretStore::at(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn explicit_key_wins_over_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SecretStore::at(dir.path().join("secrets.json")).unwrap();
        store.set(API_KEY_SECRET, "from-store").unwrap();

        assert_eq!(
            resolve_api_key(Some("flag".into()), Some(&store)).as_deref(),
            Some("flag")
        );
        assert_eq!(
            resolve_api_key(Some("  ".into()), Some(&store)).as_deref(),
            Some("from-store")
        );
    }
}
