//! Atomic model file writer.
//!
//! Writes go to a uniquely named temp file next to the destination; the
//! file is flushed, fsynced and renamed into place on `finalize`. Until
//! then the destination is untouched, and a dropped writer removes its
//! temp file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Error as IoError, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Temp-file-then-rename writer for a single model file.
pub struct ModelFileWriter {
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl ModelFileWriter {
    /// Opens a temp file in the destination's directory.
    pub fn create(final_path: &Path) -> IoResult<Self> {
        let dir = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file_name = final_path
            .file_name()
            .ok_or_else(|| IoError::new(ErrorKind::InvalidInput, "model path has no file name"))?
            .to_string_lossy();
        let temp_path = dir.join(format!(".{file_name}.tmp.{}", Uuid::new_v4()));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;

        Ok(Self {
            temp_path: Some(temp_path),
            final_path: final_path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
        })
    }

    /// The buffered writer over the temp file.
    pub fn writer(&mut self) -> IoResult<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| IoError::new(ErrorKind::Other, "writer already consumed"))
    }

    /// Flush, fsync, rename. After this returns the file is durable and
    /// complete at its final path.
    pub fn finalize(mut self) -> IoResult<PathBuf> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| IoError::new(ErrorKind::Other, "writer already consumed"))?;
        let temp_path = self
            .temp_path
            .take()
            .ok_or_else(|| IoError::new(ErrorKind::Other, "temp_path already consumed"))?;

        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        if let Err(e) = fs::rename(&temp_path, &self.final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(self.final_path.clone())
    }

    #[cfg(test)]
    fn temp_path(&self) -> Option<&Path> {
        self.temp_path.as_deref()
    }
}

impl Drop for ModelFileWriter {
    fn drop(&mut self) {
        self.writer.take();
        if let Some(ref temp_path) = self.temp_path {
            if temp_path.exists() {
                let _ = fs::remove_file(temp_path);
            }
        }
    }
}
