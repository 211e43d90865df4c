//! Catalog of animation scripts found in the animations directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::descriptor::Descriptor;
use crate::error::AnimError;
use crate::probe::{probe, DEFAULT_INFO_TIMEOUT};
use crate::session::Session;

/// Descriptors by id, rebuilt wholesale on every scan
pub struct Registry {
    dir: PathBuf,
    info_timeout: Duration,
    scripts: HashMap<Uuid, Descriptor>,
}

impl Registry {
    /// Empty registry for `dir`; call [`Registry::scan`] to populate it.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            info_timeout: DEFAULT_INFO_TIMEOUT,
            scripts: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, info_timeout: Duration) -> Self {
        self.info_timeout = info_timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replace the catalog with the scripts currently in the directory.
    ///
    /// Candidates that fail to probe, and later candidates repeating an id
    /// already seen, are skipped. Returns the number of scripts loaded.
    pub fn scan(&mut self) -> usize {
        self.scripts.clear();

        let candidates = match executables(&self.dir) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Cannot read animations from {}: {e}", self.dir.display());
                return 0;
            }
        };

        for path in candidates {
            match probe(&path, self.info_timeout) {
                Ok(desc) => {
                    if self.scripts.contains_key(&desc.id) {
                        debug!("Skipping {}: duplicate id {}", path.display(), desc.id);
                        continue;
                    }
                    self.scripts.insert(desc.id, desc);
                }
                Err(e) => warn!("Skipping {}: {e}", path.display()),
            }
        }
        self.resolve_name_collisions();

        info!(
            "Loaded {} animations from {}",
            self.scripts.len(),
            self.dir.display()
        );
        self.scripts.len()
    }

    /// Add a descriptor without probing. Returns false if the id is taken.
    pub fn register(&mut self, desc: Descriptor) -> bool {
        if self.scripts.contains_key(&desc.id) {
            return false;
        }
        self.scripts.insert(desc.id, desc);
        self.resolve_name_collisions();
        true
    }

    /// All descriptors ordered by display name.
    pub fn list(&self) -> Vec<&Descriptor> {
        let mut list: Vec<&Descriptor> = self.scripts.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        list
    }

    pub fn get(&self, id: &Uuid) -> Option<&Descriptor> {
        self.scripts.get(id)
    }

    /// Look up by id (any uuid notation) or by display name, ignoring case.
    pub fn find(&self, query: &str) -> Option<&Descriptor> {
        if let Ok(id) = Uuid::parse_str(query.trim()) {
            return self.get(&id);
        }
        self.list()
            .into_iter()
            .find(|desc| desc.name.eq_ignore_ascii_case(query.trim()))
    }

    /// A fresh, uninitialized session for the script with this id.
    pub fn copy(&self, id: &Uuid) -> Result<Session, AnimError> {
        self.get(id)
            .cloned()
            .map(Session::new)
            .ok_or_else(|| AnimError::NotFound(id.braced().to_string()))
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Append the uppercase id to every name shared by more than one script.
    fn resolve_name_collisions(&mut self) {
        let mut by_name: HashMap<String, Vec<Uuid>> = HashMap::new();
        for desc in self.scripts.values() {
            by_name.entry(desc.name.clone()).or_default().push(desc.id);
        }
        for ids in by_name.into_values().filter(|ids| ids.len() > 1) {
            for id in ids {
                if let Some(desc) = self.scripts.get_mut(&id) {
                    desc.name = format!("{} {}", desc.name, desc.id_string());
                }
            }
        }
    }
}

/// Regular files in `dir` that can be executed, sorted by path.
fn executables(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_file() && is_executable(&metadata) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    true
}
