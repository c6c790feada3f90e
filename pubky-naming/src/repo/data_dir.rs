use std::path::{Path, PathBuf};

use pkarr::Keypair;

use super::{NodeConfig, DEFAULT_CONFIG};

/// The data directory of a naming node.
///
/// Holds `config.toml`, the node `secret`, the `keystore/` of named keys
/// and the `blocks/` of locally stored content.
///
/// It will be expanded to the home directory if it starts with "~".
#[derive(Debug, Clone)]
pub struct DataDir {
    expanded_path: PathBuf,
}

impl DataDir {
    /// Creates a new data directory.
    pub fn new(path: PathBuf) -> Self {
        Self {
            expanded_path: Self::expand_home_dir(path),
        }
    }

    /// Expands the data directory to the home directory if it starts with "~".
    fn expand_home_dir(path: PathBuf) -> PathBuf {
        let Some(raw) = path.to_str() else {
            // Not valid utf-8 so it can't be expanded.
            return path;
        };
        match (raw.strip_prefix("~/"), dirs::home_dir()) {
            (Some(without_home), Some(home)) => home.join(without_home),
            _ => path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.expanded_path
    }

    /// Makes sure the data directory and its sub directories exist.
    pub fn ensure_data_dir_exists_and_is_accessible(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.expanded_path)?;
        std::fs::create_dir_all(self.keystore_dir())?;
        std::fs::create_dir_all(self.blocks_dir())?;
        Ok(())
    }

    pub fn config_file_path(&self) -> PathBuf {
        self.expanded_path.join("config.toml")
    }

    pub fn secret_file_path(&self) -> PathBuf {
        self.expanded_path.join("secret")
    }

    pub fn keystore_dir(&self) -> PathBuf {
        self.expanded_path.join("keystore")
    }

    pub fn blocks_dir(&self) -> PathBuf {
        self.expanded_path.join("blocks")
    }

    /// Reads the config file from the data directory.
    /// Writes the default config first if there is none yet.
    pub fn read_or_create_config_file(&self) -> anyhow::Result<NodeConfig> {
        let config_file_path = self.config_file_path();
        if !config_file_path.exists() {
            std::fs::write(&config_file_path, DEFAULT_CONFIG)?;
            tracing::info!("Wrote default config to {}", config_file_path.display());
        }
        Ok(NodeConfig::from_file(config_file_path)?)
    }

    /// Reads the node keypair from the hex encoded secret file.
    /// Generates and persists a new one if the file doesn't exist.
    pub fn read_or_create_keypair(&self) -> anyhow::Result<Keypair> {
        let secret_file_path = self.secret_file_path();
        if !secret_file_path.exists() {
            let keypair = Keypair::random();
            std::fs::write(&secret_file_path, hex::encode(keypair.secret_key()))?;
            restrict_permissions(&secret_file_path)?;
            tracing::info!(
                "Generated node key {} in {}",
                keypair.public_key(),
                secret_file_path.display()
            );
            return Ok(keypair);
        }

        let raw = std::fs::read_to_string(&secret_file_path)?;
        let bytes = hex::decode(raw.trim())?;
        let secret: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            anyhow::anyhow!(
                "secret file {} must hold 32 bytes, found {}",
                secret_file_path.display(),
                bytes.len()
            )
        })?;
        Ok(Keypair::from_secret_key(&secret))
    }
}

impl Default for DataDir {
    fn default() -> Self {
        Self::new(PathBuf::from("~/.pubky-naming"))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
