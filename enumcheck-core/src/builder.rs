//! Builder pattern API for enumcheck analysis.
//!
//! Provides a fluent interface for configuring and running the scan:
//!
//! ```rust,ignore
//! use enumcheck_core::prelude::*;
//!
//! let result = Enumcheck::new("/path/to/classes")
//!     .with_cache(true)
//!     .ignore_patterns(["com/generated/*"])
//!     .analyze()?;
//!
//! for finding in &result.findings {
//!     println!("{}", finding);
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::cache::{self, CachedClass, EnumcheckCache};
use crate::classfile::ClassFile;
use crate::detect::{analyze_class, ClassAnalysis, Finding};
use crate::metadata::ClassIndex;
use crate::scan::{gather_class_files, gather_class_files_with_excludes};

/// Builder for configuring an enum-collection analysis run.
#[derive(Debug, Clone)]
pub struct Enumcheck {
    /// Root path of the class tree to analyze
    root: PathBuf,

    /// Whether to use incremental caching
    use_cache: bool,

    /// Custom excluded directories
    excluded_dirs: Vec<String>,

    /// Class name patterns to drop from the report
    ignored_patterns: Vec<String>,

    /// Verbose output
    verbose: bool,
}

impl Enumcheck {
    /// Create a new analysis builder for the given path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            use_cache: true,
            excluded_dirs: Vec::new(),
            ignored_patterns: Vec::new(),
            verbose: false,
        }
    }

    /// Enable or disable incremental caching.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    /// Add directories to exclude from scanning.
    pub fn exclude_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excluded_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Add patterns for class names to ignore in the report.
    pub fn ignore_patterns(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignored_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Enable verbose output.
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Run the analysis and return results.
    pub fn analyze(&self) -> Result<AnalysisResult> {
        // 1. Gather class files (sorted for deterministic output)
        let mut files = if self.excluded_dirs.is_empty() {
            gather_class_files(&self.root)
        } else {
            let excludes: Vec<&str> = self.excluded_dirs.iter().map(|s| s.as_str()).collect();
            gather_class_files_with_excludes(&self.root, &excludes)
        }
        .context("Failed to gather .class files")?;
        files.sort();

        // 2. Read, hash and parse everything in parallel; malformed files
        //    degrade to a warning, never abort the scan
        let parsed: Vec<(PathBuf, String, ClassFile)> = files
            .par_iter()
            .filter_map(|path| {
                let bytes = match fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "unreadable file, skipped");
                        return None;
                    }
                };
                let hash = cache::file_hash(&bytes);
                match ClassFile::parse(&bytes) {
                    Ok(class) => Some((path.clone(), hash, class)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "malformed class file, skipped");
                        None
                    }
                }
            })
            .collect();
        let malformed_files = files.len() - parsed.len();

        // 3. Metadata index over everything we parsed
        let index = ClassIndex::from_classes(parsed.iter().map(|(_, _, c)| c));
        let fingerprint = cache::index_fingerprint(&index);

        // 4. Prior analyses, reusable only for this exact metadata index
        let prior: HashMap<String, CachedClass> = if self.use_cache {
            cache::load_cache(&self.root)
                .filter(|c| c.metadata.is_compatible(&fingerprint))
                .map(|c| c.classes)
                .unwrap_or_default()
        } else {
            HashMap::new()
        };

        // 5. Analyze per class in parallel; every class gets fresh tag maps
        //    inside analyze_class, so runs share nothing mutable
        let results: Vec<(PathBuf, String, ClassAnalysis, bool)> = parsed
            .par_iter()
            .map(|(path, hash, class)| {
                let key = path.display().to_string();
                if let Some(entry) = prior.get(&key) {
                    if entry.hash == *hash {
                        return (path.clone(), hash.clone(), entry.analysis.clone(), true);
                    }
                }
                (path.clone(), hash.clone(), analyze_class(class, &index), false)
            })
            .collect();
        let cached_classes = results.iter().filter(|(_, _, _, cached)| *cached).count();

        // 6. Persist the cache; a failed save is not a failed analysis
        if self.use_cache {
            let new_cache = EnumcheckCache {
                metadata: cache::CacheMetadata::current(fingerprint),
                classes: results
                    .iter()
                    .map(|(path, hash, analysis, _)| {
                        (
                            path.display().to_string(),
                            CachedClass {
                                hash: hash.clone(),
                                analysis: analysis.clone(),
                            },
                        )
                    })
                    .collect(),
            };
            if let Err(e) = cache::save_cache(&self.root, &new_cache) {
                warn!(error = %e, "cache not saved");
            }
        }

        // 7. Collate findings and missing classes
        let mut findings: Vec<Finding> = results
            .iter()
            .flat_map(|(_, _, analysis, _)| analysis.findings.iter().cloned())
            .filter(|f| !self.is_ignored(&f.class_name))
            .collect();
        findings.sort_by(|a, b| {
            (&a.class_name, &a.method_name, a.line).cmp(&(&b.class_name, &b.method_name, b.line))
        });

        let mut missing_classes: Vec<String> = results
            .iter()
            .flat_map(|(_, _, analysis, _)| analysis.missing_classes.iter().cloned())
            .collect();
        missing_classes.sort();
        missing_classes.dedup();

        if self.verbose {
            info!(
                classes = parsed.len(),
                cached = cached_classes,
                findings = findings.len(),
                "analysis complete"
            );
        }

        Ok(AnalysisResult {
            root: self.root.clone(),
            total_classes: parsed.len(),
            malformed_files,
            cached_classes,
            findings,
            missing_classes,
        })
    }

    /// Check if a class name matches any ignored pattern.
    fn is_ignored(&self, name: &str) -> bool {
        for pattern in &self.ignored_patterns {
            if pattern.ends_with('*') {
                let prefix = &pattern[..pattern.len() - 1];
                if name.starts_with(prefix) {
                    return true;
                }
            } else if let Some(suffix) = pattern.strip_prefix('*') {
                if name.ends_with(suffix) {
                    return true;
                }
            } else if name == pattern || name.contains(pattern) {
                return true;
            }
        }
        false
    }
}

/// Result of running the analysis.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Root path that was analyzed
    pub root: PathBuf,

    /// Number of class files successfully parsed
    pub total_classes: usize,

    /// Number of files skipped as unreadable or malformed
    pub malformed_files: usize,

    /// Number of classes served from the incremental cache
    pub cached_classes: usize,

    /// All findings, sorted by class, method and line
    pub findings: Vec<Finding>,

    /// Key types that could not be resolved during judging
    pub missing_classes: Vec<String>,
}

impl AnalysisResult {
    /// Check if any candidate call sites were found.
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }

    /// Total finding count.
    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }
}
