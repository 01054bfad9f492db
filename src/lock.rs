//! Per-logger ownership, so two xc-sync processes never interleave requests
//! on the same device. Other loggers stay available.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Held for as long as the process talks to one logger.
/// The lock file is removed when dropped.
#[derive(Debug)]
pub struct Lock {
    _file: File,
    path: PathBuf,
}

impl Lock {
    /// File name used for the logger at `vendor_id:product_id`
    pub fn file_name(vendor_id: u16, product_id: u16) -> String {
        format!("xc-sync-{vendor_id:04x}-{product_id:04x}.lock")
    }

    /// Claim the logger at `vendor_id:product_id`, failing immediately if
    /// another process owns it.
    pub fn acquire(dir: &Path, vendor_id: u16, product_id: u16) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(vendor_id, product_id));

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock().is_err() {
            let mut owner = String::new();
            file.read_to_string(&mut owner).ok();
            let owner = owner.trim();
            let owner = if owner.is_empty() { "another process" } else { owner };
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("logger {vendor_id:04x}:{product_id:04x} is in use by pid {owner}"),
            ));
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { _file: file, path })
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("xc-sync-lock-{name}-{}", std::process::id()))
    }

    #[test]
    fn one_owner_per_logger() {
        let dir = scratch("owner");
        let lock = Lock::acquire(&dir, 0x10c4, 0x8468).unwrap();
        let err = Lock::acquire(&dir, 0x10c4, 0x8468).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(err.to_string().contains("10c4:8468"));

        // a second logger is not blocked
        let other = Lock::acquire(&dir, 0x10c4, 0x8469).unwrap();
        drop(other);
        drop(lock);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn released_on_drop() {
        let dir = scratch("drop");
        let lock = Lock::acquire(&dir, 0x10c4, 0x8468).unwrap();
        let path = dir.join(Lock::file_name(0x10c4, 0x8468));
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            std::process::id().to_string()
        );
        drop(lock);
        assert!(!path.exists());
        assert!(Lock::acquire(&dir, 0x10c4, 0x8468).is_ok());
        let _ = fs::remove_dir_all(&dir);
    }
}
