use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::store::{error::StoreError, tables::Tables};

const SNAPSHOT_VERSION: u64 = 1;

/// Versioned JSON snapshot of every table, replaced atomically on save.
#[derive(Debug, Clone)]
pub(crate) struct TableSnapshot {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedTables {
    version: u64,
    tables: Tables,
}

#[derive(Serialize)]
struct PersistedTablesRef<'a> {
    version: u64,
    tables: &'a Tables,
}

fn backend(message: String) -> StoreError {
    StoreError::Backend(message)
}

impl TableSnapshot {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn load(&self) -> Result<Option<Tables>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(backend(format!(
                    "failed to read store snapshot '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let parsed: PersistedTables = serde_json::from_str(&content).map_err(|err| {
            backend(format!(
                "failed to parse store snapshot '{}': {err}",
                self.path.display()
            ))
        })?;
        if parsed.version != SNAPSHOT_VERSION {
            return Err(backend(format!(
                "unsupported store snapshot version {} at '{}'",
                parsed.version,
                self.path.display()
            )));
        }

        Ok(Some(parsed.tables))
    }

    pub(crate) fn save(&self, tables: &Tables) -> Result<(), StoreError> {
        let parent = self.path.parent().ok_or_else(|| {
            backend(format!(
                "store snapshot path '{}' has no parent",
                self.path.display()
            ))
        })?;
        fs::create_dir_all(parent).map_err(|err| {
            backend(format!(
                "failed to create store directory '{}': {err}",
                parent.display()
            ))
        })?;

        let persisted = PersistedTablesRef {
            version: SNAPSHOT_VERSION,
            tables,
        };

        let tmp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&tmp_path).map_err(|err| {
            backend(format!(
                "failed to create store temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(&file);
            serde_json::to_writer(&mut writer, &persisted).map_err(|err| {
                backend(format!(
                    "failed to serialize store snapshot '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.write_all(b"\n").and_then(|_| writer.flush()).map_err(|err| {
                backend(format!(
                    "failed to flush store snapshot '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }
        file.sync_all().map_err(|err| {
            backend(format!(
                "failed to sync store temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            backend(format!(
                "failed to replace store snapshot '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })?;

        if let Ok(parent_file) = fs::File::open(parent) {
            let _ = parent_file.sync_all();
        }

        Ok(())
    }
}
