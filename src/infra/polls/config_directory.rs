use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::polls::{ConfigError, ConfigFile, ConfigSource};

const CONFIG_EXTENSIONS: [&str; 2] = ["yml", "yaml"];
/// Template files such as `example.yml` are never mounted.
const EXAMPLE_PREFIX: &str = "example";

/// Directory of `<guild_id>.yml` files, one per guild.
pub struct ConfigDirectory {
    path: PathBuf,
}

impl ConfigDirectory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.location(),
            source,
        }
    }
}

/// Whether `file_name` is a guild config rather than a template or stray file.
fn is_config_file(file_name: &str) -> bool {
    let has_config_extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext));

    has_config_extension && !file_name.starts_with(EXAMPLE_PREFIX)
}

#[async_trait]
impl ConfigSource for ConfigDirectory {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn load_files(&self) -> Result<Vec<ConfigFile>, ConfigError> {
        let mut entries = fs::read_dir(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.io_error(e))? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !is_config_file(&file_name) {
                continue;
            }

            let file_type = entry.file_type().await.map_err(|e| self.io_error(e))?;
            if !file_type.is_file() {
                continue;
            }

            let contents = fs::read_to_string(entry.path())
                .await
                .map_err(|e| self.io_error(e))?;

            // GUILD_ID.yml or GUILD_ID.yaml
            let guild_id = file_name
                .split('.')
                .next()
                .unwrap_or_default()
                .to_string();

            files.push(ConfigFile { guild_id, contents });
        }

        // read_dir order is platform dependent
        files.sort_by(|a, b| a.guild_id.cmp(&b.guild_id));
        Ok(files)
    }
}
