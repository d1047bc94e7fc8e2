use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use build_constraint::Evaluator;
use logger::Logger;
use multi_err::MultiErr;
use package_fs::PackageFs;
use package_locator::Locator;
use source_header::parse_header;

const BUILTIN_PACKAGE_ID: &str = "builtin";
const C_PSEUDO_PACKAGE: &str = "C";

#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    #[error("reading directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A recoverable condition the walker logged and swallowed, surfaced so
/// callers (and tests asserting the closure property) don't have to parse
/// log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkDiagnostic {
    PatternDirectoryMissing { pattern: String },
    PackageNotFound { import: String },
    MalformedSource { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub dir: PathBuf,
    pub go_files: Vec<PathBuf>,
    pub compiled_go_files: Vec<PathBuf>,
    pub ignored_files: Vec<PathBuf>,
    pub imports: HashMap<String, String>,
    pub dep_only: bool,
    /// Per-package recoverable problems (currently: dangling import edges),
    /// mirrors spec.md §3's "optional error list" on Package.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    File(PathBuf),
    Recursive(String),
    Exact(String),
}

pub fn parse_pattern(raw: &str) -> Pattern {
    if let Some(rest) = raw.strip_prefix("file=") {
        return Pattern::File(PathBuf::from(rest));
    }
    if let Some(rest) = raw.strip_suffix("/...") {
        return Pattern::Recursive(rest.to_string());
    }
    Pattern::Exact(raw.to_string())
}

/// The subset of the driver's environment the walker needs: where the
/// toolchain lives (for the testdata/internal visibility rule), which
/// directories the user scoped the request to, and the active build tags.
pub struct Environment {
    pub toolchain_root: PathBuf,
    pub targets: Vec<PathBuf>,
    pub tags: HashSet<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub include_test_packages: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include_test_packages: false,
        }
    }
}

pub struct WalkOutput {
    pub packages: HashMap<String, Package>,
    pub roots: Vec<String>,
}

struct FileEntry {
    path: PathBuf,
    header: source_header::SourceHeader,
}

pub struct Walker<'a, L: Logger> {
    fs: &'a dyn PackageFs,
    locator: &'a Locator,
    evaluator: &'a Evaluator<L>,
    environment: Environment,
    options: WalkOptions,
    logger: L,
    cache: RefCell<HashMap<String, Package>>,
    known_dirs: RefCell<HashSet<PathBuf>>,
    root_order: RefCell<Vec<String>>,
    diagnostics: RefCell<MultiErr<WalkDiagnostic>>,
}

impl<'a, L: Logger> Walker<'a, L> {
    pub fn new(
        fs: &'a dyn PackageFs,
        locator: &'a Locator,
        evaluator: &'a Evaluator<L>,
        environment: Environment,
        options: WalkOptions,
        logger: L,
    ) -> Self {
        Self {
            fs,
            locator,
            evaluator,
            environment,
            options,
            logger,
            cache: RefCell::new(HashMap::new()),
            known_dirs: RefCell::new(HashSet::new()),
            root_order: RefCell::new(Vec::new()),
            diagnostics: RefCell::new(MultiErr::new()),
        }
    }

    pub fn run(
        self,
        patterns: &[String],
    ) -> Result<(WalkOutput, MultiErr<WalkDiagnostic>), WalkError> {
        for raw in patterns {
            match parse_pattern(raw) {
                Pattern::File(file) => {
                    let dir = file.parent().unwrap_or(Path::new("")).to_path_buf();
                    let id = match self.locator.get_package_id(&dir) {
                        Ok(id) => id,
                        Err(_) => dir.to_string_lossy().to_string(),
                    };
                    self.parse_dir(&id, &dir)?;
                }
                Pattern::Recursive(prefix) => {
                    self.parse_recursive(raw, &prefix)?;
                }
                Pattern::Exact(id) => match self.locator.get_path(&id) {
                    Ok(dir) => self.parse_dir(&id, &dir)?,
                    Err(_) => {
                        self.logger
                            .warn(format!("cannot locate package for pattern {raw:?}"));
                        self.diagnostics
                            .borrow_mut()
                            .add_single(WalkDiagnostic::PatternDirectoryMissing {
                                pattern: raw.clone(),
                            });
                    }
                },
            }
        }

        let builtin_dir = self.environment.toolchain_root.join("src").join("builtin");
        if self.fs.exists(&builtin_dir) {
            self.parse_dir(BUILTIN_PACKAGE_ID, &builtin_dir)?;
        }

        let mut roots = self.root_order.into_inner();
        roots.push(BUILTIN_PACKAGE_ID.to_string());

        let output = WalkOutput {
            packages: self.cache.into_inner(),
            roots,
        };

        Ok((output, self.diagnostics.into_inner()))
    }

    fn parse_recursive(&self, pattern: &str, prefix: &str) -> Result<(), WalkError> {
        let dir = match self.locator.get_path(prefix) {
            Ok(dir) => dir,
            Err(_) => {
                self.logger
                    .warn(format!("cannot locate package for pattern {pattern:?}"));
                self.diagnostics
                    .borrow_mut()
                    .add_single(WalkDiagnostic::PatternDirectoryMissing {
                        pattern: pattern.to_string(),
                    });
                return Ok(());
            }
        };

        self.parse_tree(prefix, &dir)
    }

    fn parse_tree(&self, id: &str, dir: &Path) -> Result<(), WalkError> {
        self.parse_dir(id, dir)?;

        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };

        for entry in entries {
            if !entry.is_dir {
                continue;
            }

            let child_dir = dir.join(&entry.name);
            if !self.allowed_by_targets(&child_dir) {
                continue;
            }

            let child_id = if id.is_empty() {
                entry.name.clone()
            } else {
                format!("{id}/{}", entry.name)
            };

            self.parse_tree(&child_id, &child_dir)?;
        }

        Ok(())
    }

    fn allowed_by_targets(&self, dir: &Path) -> bool {
        if self.environment.targets.is_empty() {
            return true;
        }
        self.environment
            .targets
            .iter()
            .any(|target| dir.starts_with(target))
    }

    fn is_under_excluded_toolchain_subtree(&self, dir: &Path) -> bool {
        if !dir.starts_with(&self.environment.toolchain_root) {
            return false;
        }
        dir.components().any(|c| {
            let s = c.as_os_str().to_string_lossy();
            s == "testdata" || s == "internal"
        })
    }

    fn parse_dir(&self, id: &str, dir: &Path) -> Result<(), WalkError> {
        {
            let mut known = self.known_dirs.borrow_mut();
            if known.contains(dir) {
                return Ok(());
            }
            known.insert(dir.to_path_buf());
        }

        if self.is_under_excluded_toolchain_subtree(dir) {
            return Ok(());
        }

        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.logger
                    .warn(format!("directory not resolved: {}", dir.display()));
                self.diagnostics
                    .borrow_mut()
                    .add_single(WalkDiagnostic::PatternDirectoryMissing {
                        pattern: id.to_string(),
                    });
                return Ok(());
            }
            Err(source) => {
                return Err(WalkError::Io {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut by_package: HashMap<String, Vec<FileEntry>> = HashMap::new();

        for entry in entries {
            if entry.is_dir {
                continue;
            }

            let file_path = dir.join(&entry.name);
            let bytes = match self.fs.read_file(&file_path) {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };

            let header = match parse_header(&bytes) {
                Ok(header) => header,
                Err(_) => {
                    self.diagnostics
                        .borrow_mut()
                        .add_single(WalkDiagnostic::MalformedSource {
                            path: file_path.clone(),
                        });
                    continue;
                }
            };

            by_package
                .entry(header.package_name.clone())
                .or_default()
                .push(FileEntry {
                    path: file_path,
                    header,
                });
        }

        for (name, files) in by_package {
            let is_test_package = name.ends_with("_test");
            if is_test_package && !self.options.include_test_packages {
                continue;
            }

            let mut go_files = Vec::new();
            let mut compiled_go_files = Vec::new();
            let mut ignored_files = Vec::new();
            let mut flat_imports: HashMap<String, String> = HashMap::new();

            for file in &files {
                let excluded = file
                    .header
                    .build_directives
                    .iter()
                    .any(|directive| !self.evaluator.eval(directive, &self.environment.tags));

                if excluded {
                    ignored_files.push(file.path.clone());
                    continue;
                }

                go_files.push(file.path.clone());
                compiled_go_files.push(file.path.clone());
                for import in &file.header.imports {
                    flat_imports.insert(import.clone(), import.clone());
                }
            }

            // A sub-package none of whose files survive build-constraint
            // filtering doesn't exist, per spec.md §8 Scenario 5.
            if compiled_go_files.is_empty() {
                continue;
            }

            let mut errors = Vec::new();

            for import in flat_imports.keys() {
                if import == C_PSEUDO_PACKAGE {
                    continue;
                }

                match self.locator.get_path(import) {
                    Ok(import_dir) => {
                        self.parse_dir(import, &import_dir)?;
                    }
                    Err(_) => {
                        self.logger
                            .warn(format!("package not found: {import}"));
                        self.diagnostics
                            .borrow_mut()
                            .add_single(WalkDiagnostic::PackageNotFound {
                                import: import.clone(),
                            });
                        errors.push(format!("could not find import: {import}"));
                    }
                }
            }

            let final_id = if is_test_package {
                format!("{id}_test")
            } else {
                id.to_string()
            };

            let dep_only = !self.allowed_by_targets(dir);
            if !dep_only {
                self.root_order.borrow_mut().push(final_id.clone());
            }

            self.cache.borrow_mut().insert(
                final_id.clone(),
                Package {
                    id: final_id,
                    name,
                    dir: dir.to_path_buf(),
                    go_files,
                    compiled_go_files,
                    ignored_files,
                    imports: flat_imports,
                    dep_only,
                    errors,
                },
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use logger::VecLogger;
    use package_fs::MemoryFs;
    use package_locator::{LocatorConfig, Locator};
    use pretty_assertions::assert_eq;

    fn tags(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn simple_graph_closes_over_imports() {
        let fs = MemoryFs::from_files([
            ("main/go.mod", b"module example.com/m\n".to_vec()),
            (
                "main/a/a.go",
                b"package a\n\nimport \"example.com/m/b\"\n".to_vec(),
            ),
            ("main/b/b.go", b"package b\n".to_vec()),
        ]);

        let locator = Locator::new(
            &fs,
            LocatorConfig {
                module_manifest_path: Path::new("main/go.mod"),
                toolchain_root: Path::new("toolchain"),
                dep_cache: Path::new("depcache"),
                vendor_mode: false,
            },
        )
        .unwrap();

        let logger = VecLogger::new();
        let evaluator = Evaluator::new(&logger);
        let environment = Environment {
            toolchain_root: PathBuf::from("toolchain"),
            targets: Vec::new(),
            tags: tags(&["linux"]),
        };

        let walker = Walker::new(
            &fs,
            &locator,
            &evaluator,
            environment,
            WalkOptions::default(),
            &logger,
        );

        let (output, diagnostics) = walker
            .run(&["example.com/m/...".to_string()])
            .unwrap();
        let diagnostics: Vec<WalkDiagnostic> = diagnostics.into();
        assert!(diagnostics.is_empty());

        let a = output.packages.get("example.com/m/a").unwrap();
        assert_eq!(
            a.imports.get("example.com/m/b"),
            Some(&"example.com/m/b".to_string())
        );
        assert!(!a.dep_only);

        let b = output.packages.get("example.com/m/b").unwrap();
        assert!(!b.dep_only);

        assert!(output.roots.contains(&"example.com/m/a".to_string()));
        assert!(output.roots.contains(&"example.com/m/b".to_string()));
        assert!(output.roots.contains(&"builtin".to_string()));
    }

    #[test]
    fn build_tag_exclusion_moves_file_to_ignored_when_a_sibling_still_contributes() {
        let fs = MemoryFs::from_files([
            ("main/go.mod", b"module example.com/m\n".to_vec()),
            (
                "main/a/a_linux.go",
                b"//go:build linux\n\npackage a\n".to_vec(),
            ),
            ("main/a/a_other.go", b"package a\n".to_vec()),
        ]);

        let locator = Locator::new(
            &fs,
            LocatorConfig {
                module_manifest_path: Path::new("main/go.mod"),
                toolchain_root: Path::new("toolchain"),
                dep_cache: Path::new("depcache"),
                vendor_mode: false,
            },
        )
        .unwrap();

        let logger = VecLogger::new();
        let evaluator = Evaluator::new(&logger);
        let environment = Environment {
            toolchain_root: PathBuf::from("toolchain"),
            targets: Vec::new(),
            tags: tags(&["darwin"]),
        };

        let walker = Walker::new(
            &fs,
            &locator,
            &evaluator,
            environment,
            WalkOptions::default(),
            &logger,
        );

        let (output, _) = walker.run(&["example.com/m/a".to_string()]).unwrap();
        let a = output.packages.get("example.com/m/a").unwrap();
        assert_eq!(a.compiled_go_files, vec![PathBuf::from("main/a/a_other.go")]);
        assert_eq!(a.go_files, vec![PathBuf::from("main/a/a_other.go")]);
        assert_eq!(a.ignored_files, vec![PathBuf::from("main/a/a_linux.go")]);
    }

    #[test]
    fn package_with_every_file_excluded_does_not_appear() {
        let fs = MemoryFs::from_files([
            ("main/go.mod", b"module example.com/m\n".to_vec()),
            (
                "main/a/a.go",
                b"//go:build linux\n\npackage a\n".to_vec(),
            ),
        ]);

        let locator = Locator::new(
            &fs,
            LocatorConfig {
                module_manifest_path: Path::new("main/go.mod"),
                toolchain_root: Path::new("toolchain"),
                dep_cache: Path::new("depcache"),
                vendor_mode: false,
            },
        )
        .unwrap();

        let logger = VecLogger::new();
        let evaluator = Evaluator::new(&logger);
        let environment = Environment {
            toolchain_root: PathBuf::from("toolchain"),
            targets: Vec::new(),
            tags: tags(&["darwin"]),
        };

        let walker = Walker::new(
            &fs,
            &locator,
            &evaluator,
            environment,
            WalkOptions::default(),
            &logger,
        );

        let (output, _) = walker.run(&["example.com/m/a".to_string()]).unwrap();
        assert!(!output.packages.contains_key("example.com/m/a"));
        assert!(!output.roots.contains(&"example.com/m/a".to_string()));
    }

    #[test]
    fn unresolvable_import_leaves_dangling_edge() {
        let fs = MemoryFs::from_files([
            ("main/go.mod", b"module example.com/m\n".to_vec()),
            (
                "main/a/a.go",
                b"package a\n\nimport \"example.com/missing\"\n".to_vec(),
            ),
        ]);

        let locator = Locator::new(
            &fs,
            LocatorConfig {
                module_manifest_path: Path::new("main/go.mod"),
                toolchain_root: Path::new("toolchain"),
                dep_cache: Path::new("depcache"),
                vendor_mode: false,
            },
        )
        .unwrap();

        let logger = VecLogger::new();
        let evaluator = Evaluator::new(&logger);
        let environment = Environment {
            toolchain_root: PathBuf::from("toolchain"),
            targets: Vec::new(),
            tags: tags(&["linux"]),
        };

        let walker = Walker::new(
            &fs,
            &locator,
            &evaluator,
            environment,
            WalkOptions::default(),
            &logger,
        );

        let (output, diagnostics) = walker.run(&["example.com/m/a".to_string()]).unwrap();
        let a = output.packages.get("example.com/m/a").unwrap();
        assert_eq!(
            a.imports.get("example.com/missing"),
            Some(&"example.com/missing".to_string())
        );
        assert!(!output.packages.contains_key("example.com/missing"));
        assert_eq!(
            a.errors,
            vec!["could not find import: example.com/missing".to_string()]
        );

        let diagnostics: Vec<WalkDiagnostic> = diagnostics.into();
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, WalkDiagnostic::PackageNotFound { import } if import == "example.com/missing")));
    }

    #[test]
    fn test_suffix_packages_are_dropped_by_default() {
        let fs = MemoryFs::from_files([
            ("main/go.mod", b"module example.com/m\n".to_vec()),
            ("main/a/a.go", b"package a\n".to_vec()),
            ("main/a/a_x_test.go", b"package a_test\n".to_vec()),
        ]);

        let locator = Locator::new(
            &fs,
            LocatorConfig {
                module_manifest_path: Path::new("main/go.mod"),
                toolchain_root: Path::new("toolchain"),
                dep_cache: Path::new("depcache"),
                vendor_mode: false,
            },
        )
        .unwrap();

        let logger = VecLogger::new();
        let evaluator = Evaluator::new(&logger);
        let environment = Environment {
            toolchain_root: PathBuf::from("toolchain"),
            targets: Vec::new(),
            tags: tags(&["linux"]),
        };

        let walker = Walker::new(
            &fs,
            &locator,
            &evaluator,
            environment,
            WalkOptions::default(),
            &logger,
        );

        let (output, _) = walker.run(&["example.com/m/a".to_string()]).unwrap();
        assert!(output.packages.contains_key("example.com/m/a"));
        assert!(!output.packages.contains_key("example.com/m/a_test"));
    }

    #[test]
    fn missing_pattern_directory_is_logged_and_skipped() {
        let fs = MemoryFs::from_files([("main/go.mod", b"module example.com/m\n".to_vec())]);

        let locator = Locator::new(
            &fs,
            LocatorConfig {
                module_manifest_path: Path::new("main/go.mod"),
                toolchain_root: Path::new("toolchain"),
                dep_cache: Path::new("depcache"),
                vendor_mode: false,
            },
        )
        .unwrap();

        let logger = VecLogger::new();
        let evaluator = Evaluator::new(&logger);
        let environment = Environment {
            toolchain_root: PathBuf::from("toolchain"),
            targets: Vec::new(),
            tags: tags(&["linux"]),
        };

        let walker = Walker::new(
            &fs,
            &locator,
            &evaluator,
            environment,
            WalkOptions::default(),
            &logger,
        );

        let (output, diagnostics) = walker
            .run(&["example.com/missing".to_string()])
            .unwrap();
        assert!(output.packages.is_empty());
        let diagnostics: Vec<WalkDiagnostic> = diagnostics.into();
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, WalkDiagnostic::PatternDirectoryMissing { .. })));
    }

    #[test]
    fn walking_twice_yields_structurally_identical_output() {
        let fs = MemoryFs::from_files([
            ("main/go.mod", b"module example.com/m\n".to_vec()),
            (
                "main/a/a.go",
                b"package a\n\nimport \"example.com/m/b\"\n".to_vec(),
            ),
            ("main/b/b.go", b"package b\n".to_vec()),
        ]);

        let run_once = || {
            let locator = Locator::new(
                &fs,
                LocatorConfig {
                    module_manifest_path: Path::new("main/go.mod"),
                    toolchain_root: Path::new("toolchain"),
                    dep_cache: Path::new("depcache"),
                    vendor_mode: false,
                },
            )
            .unwrap();

            let logger = VecLogger::new();
            let evaluator = Evaluator::new(&logger);
            let environment = Environment {
                toolchain_root: PathBuf::from("toolchain"),
                targets: Vec::new(),
                tags: tags(&["linux"]),
            };

            let walker = Walker::new(
                &fs,
                &locator,
                &evaluator,
                environment,
                WalkOptions::default(),
                &logger,
            );

            walker.run(&["example.com/m/...".to_string()]).unwrap().0
        };

        let first = run_once();
        let second = run_once();

        let mut first_ids: Vec<&String> = first.packages.keys().collect();
        let mut second_ids: Vec<&String> = second.packages.keys().collect();
        first_ids.sort();
        second_ids.sort();
        assert_eq!(first_ids, second_ids);

        for id in first_ids {
            assert_eq!(first.packages.get(id), second.packages.get(id));
        }

        let mut first_roots = first.roots.clone();
        let mut second_roots = second.roots.clone();
        first_roots.sort();
        second_roots.sort();
        assert_eq!(first_roots, second_roots);
    }
}
