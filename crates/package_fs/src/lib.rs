use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

/// A directory entry's name and whether it is itself a directory. Enough
/// for the walker to recurse without ever touching `std::fs::Metadata`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryKind {
    pub name: String,
    pub is_dir: bool,
}

/// Everything the locator and walker need from a filesystem. Production
/// code is handed the real rooted tree; tests build an in-memory one so
/// the whole package graph can be constructed without touching disk.
pub trait PackageFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryKind>>;
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn exists(&self, path: &Path) -> bool;
}

/// Thin wrapper over `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl PackageFs for OsFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryKind>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type()?.is_dir();
            entries.push(DirEntryKind { name, is_dir });
        }
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// An in-memory tree built from a flat path→bytes map. Directories are
/// never stored explicitly: any path that is a strict prefix of a file's
/// path is implicitly a directory, and a genuinely empty directory cannot
/// be represented.
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files<I, P, B>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<PathBuf>,
        B: Into<Vec<u8>>,
    {
        let files = files
            .into_iter()
            .map(|(p, b)| (p.into(), b.into()))
            .collect();
        Self { files }
    }

    pub fn insert<P: Into<PathBuf>, B: Into<Vec<u8>>>(&mut self, path: P, bytes: B) {
        self.files.insert(path.into(), bytes.into());
    }

    fn is_known_dir(&self, dir: &Path) -> bool {
        dir.as_os_str().is_empty() || self.files.keys().any(|p| p.starts_with(dir) && p != dir)
    }
}

impl PackageFs for MemoryFs {
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryKind>> {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();

        for path in self.files.keys() {
            let Ok(rel) = path.strip_prefix(dir) else {
                continue;
            };

            let mut components = rel.components();
            let Some(first) = components.next() else {
                continue;
            };

            let name = first.as_os_str().to_string_lossy().to_string();
            let is_dir = components.next().is_some();

            if seen.insert(name.clone()) {
                entries.push(DirEntryKind { name, is_dir });
            }
        }

        if entries.is_empty() && !self.is_known_dir(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such directory", dir.display()),
            ));
        }

        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file", path.display())))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.files.keys().any(|p| p.starts_with(path))
    }
}
