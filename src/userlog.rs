/// Append-only CSV file for user records pushed by the collector.
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::USER_LOG_HEADER;
use crate::error::{KioskError, Result};
use crate::peripherals::DurableLog;

#[derive(Debug)]
pub struct CsvLog {
    path: PathBuf,
    file: File,
}

impl CsvLog {
    /// Open `path` for appending, writing the column header first if the
    /// file does not exist yet or is empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| KioskError::peripheral("user log", e))?;
        let len = file
            .metadata()
            .map_err(|e| KioskError::peripheral("user log", e))?
            .len();
        if len == 0 {
            log::info!("Creating user log {}", path.display());
            writeln!(file, "{USER_LOG_HEADER}")
                .and_then(|_| file.flush())
                .map_err(|e| KioskError::peripheral("user log", e))?;
        }
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableLog for CsvLog {
    fn append(&mut self, line: &str) -> Result<()> {
        writeln!(self.file, "{line}")
            .and_then(|_| self.file.flush())
            .map_err(|e| KioskError::peripheral("user log", e))?;
        log::info!("Stored record in {}", self.path.display());
        Ok(())
    }
}
