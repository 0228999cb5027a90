//! # Disk Overflow Tier
//!
//! One file per overflowed key under a configured directory. Each file
//! holds a single-entry JSON object `{"key": "value"}`. Writes go
//! through a temp file + rename so a reader never observes a partial
//! record (the corrected rule from the LRU design notes — the
//! original Python implementation wrote the file in place).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value as Json;

/// Directory-backed overflow store, addressed by key.
pub struct DiskOverflow {
    dir: PathBuf,
}

impl DiskOverflow {
    /// Opens (creating if missing) the overflow directory.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(DiskOverflow { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Writes `(key, value)` atomically: write to a sibling temp file,
    /// then rename over the final path. Concurrent readers see either
    /// the old file or the fully-written new one, never a partial one.
    pub fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let final_path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{key}.json.tmp"));

        let record: Json = serde_json::json!({ key: value });
        fs::write(&tmp_path, serde_json::to_vec(&record)?)?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Reads the value for `key`, or `Ok(None)` if no overflow record
    /// exists. Any I/O or parse failure is returned as an error; the
    /// cache engine maps such errors to a miss per the error-handling
    /// design.
    pub fn read(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => {
                let record: Json = serde_json::from_slice(&bytes)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
                Ok(record.get(key).and_then(Json::as_str).map(str::to_string))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Removes any overflow record for `key`. Missing files are not
    /// an error — callers purge unconditionally before every `put`.
    pub fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let disk = DiskOverflow::new(tmp.path()).unwrap();
        disk.write("alpha", "1").unwrap();
        assert_eq!(disk.read("alpha").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn read_missing_key_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let disk = DiskOverflow::new(tmp.path()).unwrap();
        assert_eq!(disk.read("ghost").unwrap(), None);
    }

    #[test]
    fn remove_then_read_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let disk = DiskOverflow::new(tmp.path()).unwrap();
        disk.write("alpha", "1").unwrap();
        disk.remove("alpha").unwrap();
        assert_eq!(disk.read("alpha").unwrap(), None);
    }

    #[test]
    fn remove_of_missing_key_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let disk = DiskOverflow::new(tmp.path()).unwrap();
        assert!(disk.remove("ghost").is_ok());
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let disk = DiskOverflow::new(tmp.path()).unwrap();
        disk.write("alpha", "1").unwrap();
        let mut names: Vec<_> = fs::read_dir(disk.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["alpha.json".to_string()]);
    }
}
