//! Shared application context for CLI commands.

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::history::HistoryDb;
use crate::installer::Installer;
use crate::manifest::ManifestStore;
use crate::security::PatternScanner;

/// Everything a command handler needs: resolved config plus the long-lived
/// handles (history database, scanner). Built once in `main`.
pub struct AppContext {
    pub config: Config,
    pub history: HistoryDb,
    pub scanner: PatternScanner,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.state_root)?;
        let history = HistoryDb::open(&config.history_db_path())?;
        Ok(Self {
            config,
            history,
            scanner: PatternScanner,
        })
    }

    pub fn installer(&self) -> Result<Installer<'_>> {
        Installer::new(&self.config, &self.history, &self.scanner)
    }

    #[must_use]
    pub fn manifest_store(&self) -> ManifestStore {
        ManifestStore::new(self.config.manifest_path()).with_lock_timings(
            self.config.lock_wait(),
            self.config.lock_stale(),
            self.config.lock_poll(),
        )
    }
}
