use crate::infrastructure::config::{ensure_default_configs, load_app_config, AppConfig};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "config";
const STATE_DIR: &str = "state";
const LOGS_DIR: &str = "logs";
const BACKUPS_DIR: &str = "backups";
const DATABASE_FILE: &str = "slate.sqlite";

/// A prepared on-disk workspace with its validated configuration.
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: AppConfig,
    pub logs_dir: PathBuf,
    pub backups_dir: PathBuf,
    pub database_path: PathBuf,
}

/// Creates the workspace layout if missing, writes default config on first
/// run and makes sure the key-value table exists. Safe to call repeatedly.
pub fn bootstrap_workspace(root: &Path) -> Result<Workspace, InfraError> {
    for dir in [CONFIG_DIR, STATE_DIR, LOGS_DIR, BACKUPS_DIR] {
        fs::create_dir_all(root.join(dir))?;
    }

    let config_dir = root.join(CONFIG_DIR);
    ensure_default_configs(&config_dir)?;
    let config = load_app_config(&config_dir)?;

    let database_path = root.join(STATE_DIR).join(DATABASE_FILE);
    initialize_database(&database_path)?;

    Ok(Workspace {
        root: root.to_path_buf(),
        config,
        logs_dir: root.join(LOGS_DIR),
        backups_dir: root.join(BACKUPS_DIR),
        database_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::state::test_support::TempWorkspace;

    #[test]
    fn bootstrap_lays_out_workspace_and_is_repeatable() {
        let temp = TempWorkspace::new();

        let first = bootstrap_workspace(&temp.path).expect("first bootstrap");
        for dir in [CONFIG_DIR, STATE_DIR, LOGS_DIR, BACKUPS_DIR] {
            assert!(temp.path.join(dir).is_dir(), "{dir} missing");
        }
        assert!(first.database_path.is_file());
        assert_eq!(first.config, AppConfig::default());

        let second = bootstrap_workspace(&temp.path).expect("second bootstrap");
        assert_eq!(second.database_path, first.database_path);
        assert_eq!(second.backups_dir, temp.path.join(BACKUPS_DIR));
    }

    #[test]
    fn bootstrap_refuses_invalid_config() {
        let temp = TempWorkspace::new();
        fs::create_dir_all(temp.path.join(CONFIG_DIR)).expect("config dir");
        fs::write(
            temp.path.join(CONFIG_DIR).join("app.json"),
            r#"{"schema": 2}"#,
        )
        .expect("write config");

        assert!(matches!(
            bootstrap_workspace(&temp.path),
            Err(InfraError::InvalidConfig(_))
        ));
        assert!(!temp.path.join(STATE_DIR).join(DATABASE_FILE).exists());
    }
}
