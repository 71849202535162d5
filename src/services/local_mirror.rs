//! Local mirror of the remote spreadsheet
//!
//! `<data_dir>/pedidos.json` holds both tables as header-first grids under the keys
//! "Pedidos" and "Itens". Before every rewrite the current file is copied into
//! `<data_dir>/backup/`, which keeps only the most recent backups.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::models::config::BackupInfo;
use crate::models::order::{columns, Order, OrderItem};
use crate::models::sheet::{grid_with_header, parse_records, Grid};

const MIRROR_FILE: &str = "pedidos.json";
const BACKUP_DIR: &str = "backup";
const BACKUP_PREFIX: &str = "pedidos_backup_";
const BACKUP_EXTENSION: &str = ".json";

/// Number of backups kept after each new one
pub const KEEP_BACKUPS: usize = 10;

#[derive(Debug)]
pub enum MirrorError {
    Io(String),
    Parse(String),
    BackupNotFound(String),
    InvalidBackupName(String),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::Io(msg) => write!(f, "Local file error: {}", msg),
            MirrorError::Parse(msg) => write!(f, "Local file is corrupt: {}", msg),
            MirrorError::BackupNotFound(name) => write!(f, "Backup not found: {}", name),
            MirrorError::InvalidBackupName(name) => write!(f, "Invalid backup name: {}", name),
        }
    }
}

impl std::error::Error for MirrorError {}

impl From<std::io::Error> for MirrorError {
    fn from(e: std::io::Error) -> Self {
        MirrorError::Io(e.to_string())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MirrorFile {
    #[serde(rename = "Pedidos", default)]
    orders: Grid,
    #[serde(rename = "Itens", default)]
    items: Grid,
}

#[derive(Debug, Clone)]
pub struct LocalMirror {
    file: PathBuf,
    backup_dir: PathBuf,
}

impl LocalMirror {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            file: data_dir.join(MIRROR_FILE),
            backup_dir: data_dir.join(BACKUP_DIR),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file
    }

    /// Create the data and backup directories
    pub async fn init(&self) -> Result<(), MirrorError> {
        fs::create_dir_all(&self.backup_dir).await?;
        Ok(())
    }

    /// Copy the current mirror into the backup directory and prune old backups.
    /// Returns `None` when there is no mirror yet.
    pub async fn backup(&self) -> Result<Option<PathBuf>, MirrorError> {
        if !fs::try_exists(&self.file).await? {
            return Ok(None);
        }

        fs::create_dir_all(&self.backup_dir).await?;

        // Names have millisecond resolution; never overwrite an existing backup
        let mut path = self.next_backup_path();
        while fs::try_exists(&path).await? {
            tokio::time::sleep(Duration::from_millis(1)).await;
            path = self.next_backup_path();
        }
        fs::copy(&self.file, &path).await?;
        tracing::debug!("Backed up {} to {}", self.file.display(), path.display());

        self.prune().await?;
        Ok(Some(path))
    }

    fn next_backup_path(&self) -> PathBuf {
        self.backup_dir.join(format!(
            "{}{}{}",
            BACKUP_PREFIX,
            Local::now().format("%Y%m%d_%H%M%S_%3f"),
            BACKUP_EXTENSION
        ))
    }

    /// Backup file names, oldest first (the timestamped names sort chronologically)
    async fn backup_names(&self) -> Result<Vec<String>, MirrorError> {
        if !fs::try_exists(&self.backup_dir).await? {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.backup_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_backup_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn prune(&self) -> Result<(), MirrorError> {
        let names = self.backup_names().await?;
        if names.len() <= KEEP_BACKUPS {
            return Ok(());
        }

        let excess = names.len() - KEEP_BACKUPS;
        for name in &names[..excess] {
            fs::remove_file(self.backup_dir.join(name)).await?;
            tracing::debug!("Removed old backup {}", name);
        }
        Ok(())
    }

    /// Newest first
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, MirrorError> {
        let mut backups = Vec::new();
        for name in self.backup_names().await?.into_iter().rev() {
            let size_bytes = fs::metadata(self.backup_dir.join(&name)).await?.len();
            backups.push(BackupInfo { name, size_bytes });
        }
        Ok(backups)
    }

    /// Rewrite the mirror with both tables
    pub async fn persist(&self, orders: &[Order], items: &[OrderItem]) -> Result<(), MirrorError> {
        let contents = MirrorFile {
            orders: grid_with_header(&columns::ORDER_HEADERS, orders.iter().map(Order::to_row)),
            items: grid_with_header(&columns::ITEM_HEADERS, items.iter().map(OrderItem::to_row)),
        };
        let raw = serde_json::to_vec_pretty(&contents).map_err(|e| MirrorError::Parse(e.to_string()))?;

        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a crash never leaves a half-written mirror
        let tmp = self.file.with_extension("json.tmp");
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, &self.file).await?;

        tracing::debug!(
            "Saved {} orders and {} items to {}",
            orders.len(),
            items.len(),
            self.file.display()
        );
        Ok(())
    }

    /// Both tables of the mirror; empty when the file does not exist
    pub async fn load(&self) -> Result<(Vec<Order>, Vec<OrderItem>), MirrorError> {
        if !fs::try_exists(&self.file).await? {
            return Ok((Vec::new(), Vec::new()));
        }
        read_tables(&self.file).await
    }

    /// Replace the mirror with a backup. The current mirror is backed up first, so a
    /// restore can itself be undone.
    pub async fn restore(&self, name: &str) -> Result<(Vec<Order>, Vec<OrderItem>), MirrorError> {
        if !is_backup_name(name) || name.contains(['/', '\\']) || name.contains("..") {
            return Err(MirrorError::InvalidBackupName(name.to_string()));
        }

        let source = self.backup_dir.join(name);
        if !fs::try_exists(&source).await? {
            return Err(MirrorError::BackupNotFound(name.to_string()));
        }

        // Held in memory: backing up the current mirror may prune `source` itself
        let raw = fs::read(&source).await?;
        let tables = parse_tables(&raw)?;

        self.backup().await?;
        let tmp = self.file.with_extension("json.tmp");
        fs::write(&tmp, &raw).await?;
        fs::rename(&tmp, &self.file).await?;
        tracing::info!("Restored {} from backup {}", self.file.display(), name);

        Ok(tables)
    }
}

fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_EXTENSION)
}

async fn read_tables(path: &Path) -> Result<(Vec<Order>, Vec<OrderItem>), MirrorError> {
    let raw = fs::read(path).await?;
    parse_tables(&raw)
}

fn parse_tables(raw: &[u8]) -> Result<(Vec<Order>, Vec<OrderItem>), MirrorError> {
    let contents: MirrorFile = serde_json::from_slice(raw).map_err(|e| MirrorError::Parse(e.to_string()))?;

    let orders = parse_records(&contents.orders, MIRROR_FILE, Order::from_record)
        .map_err(|e| MirrorError::Parse(e.to_string()))?;
    let items = parse_records(&contents.items, MIRROR_FILE, OrderItem::from_record)
        .map_err(|e| MirrorError::Parse(e.to_string()))?;

    Ok((orders, items))
}
