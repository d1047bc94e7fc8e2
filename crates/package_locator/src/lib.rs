use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use manifest::parse_manifest;
use package_fs::PackageFs;
use path_trie::PathTrie;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub import_path: String,
    pub dir: PathBuf,
    pub vendor_dir: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum LocateError {
    #[error("reading main module manifest: {0}")]
    Io(#[from] io::Error),
    #[error("malformed main module manifest: {0}")]
    Manifest(#[from] manifest::ManifestError),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("package not found")]
pub struct PackageNotFound;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("directory is not under any known module")]
pub struct Unimplemented;

/// Parameters fixed before construction; mirrors the relevant slice of the
/// driver's `Environment`.
pub struct LocatorConfig<'a> {
    pub module_manifest_path: &'a Path,
    pub toolchain_root: &'a Path,
    pub dep_cache: &'a Path,
    pub vendor_mode: bool,
}

/// Resolves package identifiers to directories and back, across the main
/// module, the toolchain's standard library, the two vendor trees, and the
/// dependency cache.
pub struct Locator {
    modules: HashMap<String, Module>,
    indices: HashMap<PathBuf, PathTrie>,
}

const VENDOR_DIR_NAME: &str = "vendor";

impl Locator {
    pub fn new(fs: &dyn PackageFs, config: LocatorConfig) -> Result<Self, LocateError> {
        let manifest_bytes = fs.read_file(config.module_manifest_path)?;
        let manifest = parse_manifest(&manifest_bytes)?;

        let main_module_dir = config
            .module_manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let manifest_file_name = config
            .module_manifest_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let toolchain_src = config.toolchain_root.join("src");
        let toolchain_vendor = toolchain_src.join(VENDOR_DIR_NAME);
        let main_vendor = main_module_dir.join(VENDOR_DIR_NAME);
        let dep_cache = config.dep_cache.to_path_buf();

        let ((toolchain_src_trie, toolchain_vendor_trie), (main_vendor_trie, dep_cache_trie)) =
            rayon::join(
                || {
                    rayon::join(
                        || build_index(fs, &toolchain_src, true, &manifest_file_name),
                        || build_index(fs, &toolchain_vendor, false, &manifest_file_name),
                    )
                },
                || {
                    rayon::join(
                        || build_index(fs, &main_vendor, false, &manifest_file_name),
                        || {
                            if config.vendor_mode {
                                Ok(PathTrie::new())
                            } else {
                                build_index(fs, &dep_cache, false, &manifest_file_name)
                            }
                        },
                    )
                },
            );

        let mut indices = HashMap::new();
        indices.insert(toolchain_src, toolchain_src_trie?);
        indices.insert(toolchain_vendor, toolchain_vendor_trie?);
        indices.insert(main_vendor, main_vendor_trie?);
        indices.insert(dep_cache, dep_cache_trie?);

        let mut modules = HashMap::new();
        modules.insert(
            manifest.module_path.clone(),
            Module {
                import_path: manifest.module_path,
                dir: main_module_dir.clone(),
                vendor_dir: Some(main_module_dir.join(VENDOR_DIR_NAME)),
            },
        );

        Ok(Self { modules, indices })
    }

    pub fn get_package_id(&self, dir: &Path) -> Result<String, Unimplemented> {
        for module in self.modules.values() {
            let Ok(suffix) = dir.strip_prefix(&module.dir) else {
                continue;
            };

            if suffix.as_os_str().is_empty() {
                return Ok(module.import_path.clone());
            }

            return Ok(format!(
                "{}/{}",
                module.import_path,
                suffix.to_string_lossy()
            ));
        }

        Err(Unimplemented)
    }

    pub fn get_path(&self, id: &str) -> Result<PathBuf, PackageNotFound> {
        for module in self.modules.values() {
            if let Some(rest) = strip_id_prefix(id, &module.import_path) {
                return Ok(if rest.is_empty() {
                    module.dir.clone()
                } else {
                    module.dir.join(rest)
                });
            }
        }

        for (root, trie) in &self.indices {
            let segments: Vec<&str> = id.split('/').collect();
            if trie.contains(&segments) {
                let dir = segments.iter().fold(root.clone(), |acc, s| acc.join(s));
                return Ok(dir);
            }
        }

        Err(PackageNotFound)
    }
}

/// `id` matches `prefix` only at a `/` boundary (or exactly); this guards
/// against `example.com/mfoo` spuriously matching module `example.com/m`.
fn strip_id_prefix<'a>(id: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = id.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix('/')
}

fn build_index(
    fs: &dyn PackageFs,
    root: &Path,
    deep: bool,
    manifest_file_name: &str,
) -> io::Result<PathTrie> {
    let mut trie = PathTrie::new();

    if !fs.exists(root) {
        return Ok(trie);
    }

    let mut segments = Vec::new();
    walk(fs, root, &mut segments, deep, manifest_file_name, &mut trie)?;
    Ok(trie)
}

fn walk(
    fs: &dyn PackageFs,
    dir: &Path,
    segments: &mut Vec<String>,
    deep: bool,
    manifest_file_name: &str,
    trie: &mut PathTrie,
) -> io::Result<()> {
    let entries = fs.read_dir(dir)?;

    for entry in entries {
        if !entry.is_dir {
            continue;
        }

        if !deep && entry.name == VENDOR_DIR_NAME {
            continue;
        }

        segments.push(entry.name.clone());

        if deep || segments.len() <= 2 {
            trie.insert(segments);

            let child_dir = dir.join(&entry.name);
            let nested_module_boundary =
                !deep && !manifest_file_name.is_empty() && fs.exists(&child_dir.join(manifest_file_name));

            if !nested_module_boundary {
                walk(fs, &child_dir, segments, deep, manifest_file_name, trie)?;
            }
        }

        segments.pop();
    }

    Ok(())
}
