//! Fixture loading from a test-data directory.
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   personalities/<dir>/base.json        one base personality per directory
//!   extensions/<personality>/<ext>.json  extension for one personality
//!   extensions/<ext>.json                extension for every personality
//!   scenarios/*.json                     tagged scenarios
//!   generic_scenarios/*.json             more tagged scenarios
//! ```
//!
//! Extension registry keys are file stems. A missing `personalities/`
//! directory, or no scenario directory at all, is fatal; individual bad
//! files are logged and skipped.

use std::path::{Path, PathBuf};

use crate::error::{HarnessError, Result};
use crate::persona::{BasePersonality, MemoryFact, PersonalityComposer, PersonalityExtension};
use crate::scenario::Scenario;

pub const PERSONALITIES_DIR: &str = "personalities";
pub const EXTENSIONS_DIR: &str = "extensions";
pub const SCENARIO_DIRS: [&str; 2] = ["scenarios", "generic_scenarios"];
pub const BASE_FILE: &str = "base.json";

/// Everything a matrix run needs.
#[derive(Debug, Clone, Default)]
pub struct FixtureSet {
    pub composer: PersonalityComposer,
    pub scenarios: Vec<Scenario>,
}

/// Reads a fixture tree into a [`FixtureSet`].
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    root: PathBuf,
}

/// Directory entries sorted by path.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)
        .map_err(|e| HarnessError::fixture(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| HarnessError::fixture(dir, e))?;
    paths.sort();
    Ok(paths)
}

fn is_json(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Warn about facts missing required fields; they are kept.
fn check_facts(path: &Path, facts: &[MemoryFact]) {
    for (index, fact) in facts.iter().enumerate() {
        if let Err(e) = fact.validate() {
            log::warn!("{} memory fact #{}: {}", path.display(), index, e);
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| HarnessError::fixture(path, e))
}

impl FixtureLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load personalities, extensions and scenarios.
    pub fn load(&self) -> Result<FixtureSet> {
        let mut composer = PersonalityComposer::new();
        let bases = self.load_personalities(&mut composer)?;
        let extensions = self.load_extensions(&mut composer)?;
        let scenarios = self.load_scenarios()?;

        log::info!(
            "Loaded {} personalities, {} extension registrations, {} scenarios from {}",
            bases,
            extensions,
            scenarios.len(),
            self.root.display()
        );

        Ok(FixtureSet {
            composer,
            scenarios,
        })
    }

    /// Returns the number of bases registered.
    fn load_personalities(&self, composer: &mut PersonalityComposer) -> Result<usize> {
        let dir = self.root.join(PERSONALITIES_DIR);
        if !dir.is_dir() {
            return Err(HarnessError::fixture(&dir, "personalities directory not found"));
        }

        let mut count = 0;
        for entry in sorted_entries(&dir)? {
            if !entry.is_dir() {
                continue;
            }
            let base_file = entry.join(BASE_FILE);
            if !base_file.is_file() {
                log::debug!("No {} in {}", BASE_FILE, entry.display());
                continue;
            }
            let loaded = read(&base_file)
                .and_then(|json| BasePersonality::from_json(&json))
                .and_then(|base| {
                    check_facts(&base_file, &base.memory_facts);
                    composer.register_base(base)
                });
            match loaded {
                Ok(()) => count += 1,
                Err(e) => log::warn!("Skipping personality {}: {}", base_file.display(), e),
            }
        }
        Ok(count)
    }

    /// Returns the number of (personality, extension) registrations.
    fn load_extensions(&self, composer: &mut PersonalityComposer) -> Result<usize> {
        let dir = self.root.join(EXTENSIONS_DIR);
        if !dir.is_dir() {
            log::info!("No extensions directory at {}", dir.display());
            return Ok(0);
        }

        let bases: Vec<String> = composer.base_names().map(str::to_string).collect();
        let mut count = 0;

        for entry in sorted_entries(&dir)? {
            if entry.is_dir() {
                let Some(personality) = entry.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if composer.base(personality).is_none() {
                    log::warn!(
                        "Skipping extensions for unknown personality '{}'",
                        personality
                    );
                    continue;
                }
                for file in sorted_entries(&entry)?.into_iter().filter(|p| is_json(p)) {
                    if let Some((key, ext)) = load_extension(&file) {
                        composer.register_extension_as(personality, &key, ext)?;
                        count += 1;
                    }
                }
            } else if is_json(&entry) {
                if let Some((key, ext)) = load_extension(&entry) {
                    for base in &bases {
                        composer.register_extension_as(base, &key, ext.clone())?;
                        count += 1;
                    }
                }
            }
        }
        Ok(count)
    }

    fn load_scenarios(&self) -> Result<Vec<Scenario>> {
        let dirs: Vec<PathBuf> = SCENARIO_DIRS
            .iter()
            .map(|d| self.root.join(d))
            .filter(|d| d.is_dir())
            .collect();
        if dirs.is_empty() {
            return Err(HarnessError::fixture(
                self.root.join(SCENARIO_DIRS[0]),
                "no scenarios directory found",
            ));
        }

        let mut scenarios = Vec::new();
        for dir in dirs {
            for file in sorted_entries(&dir)?.into_iter().filter(|p| is_json(p)) {
                match read(&file).and_then(|json| Scenario::from_json(&json)) {
                    Ok(scenario) => scenarios.push(scenario),
                    Err(e) => log::warn!("Skipping scenario {}: {}", file.display(), e),
                }
            }
        }
        Ok(scenarios)
    }
}

/// Decode one extension file; `None` (after a warning) if it is unusable.
fn load_extension(path: &Path) -> Option<(String, PersonalityExtension)> {
    let key = file_stem(path)?.to_string();
    match read(path).and_then(|json| PersonalityExtension::from_json(&json)) {
        Ok(ext) => {
            check_facts(path, &ext.additional_facts);
            Some((key, ext))
        }
        Err(e) => {
            log::warn!("Skipping extension {}: {}", path.display(), e);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
