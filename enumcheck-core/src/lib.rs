//! enumcheck-core: EnumMap/EnumSet opportunity detection library for JVM
//! class files.
//!
//! This library scans compiled class files for sets and maps keyed by enum
//! types. Where a general-purpose `HashMap`/`HashSet` holds only enum keys,
//! the array-backed `EnumMap`/`EnumSet` are the more efficient choice, and
//! each such call site is reported.
//!
//! # How detection works
//!
//! - **Instruction walk**: every method gets one forward pass over its
//!   decoded instruction stream, with a simulated operand stack mirroring
//!   each instruction's effect
//! - **Tag propagation**: collection construction sites produce a tag
//!   (regular / special / enum-specialized) that follows values through
//!   local slots and fields
//! - **Judging**: at `Map.put`/`Set.add` interface calls, the key's class
//!   metadata and the receiver's tag decide whether to report
//!
//! # Quick Start
//!
//! Use the [`prelude`] module for convenient imports:
//!
//! ```rust,ignore
//! use enumcheck_core::prelude::*;
//!
//! let result = Enumcheck::new("/path/to/classes")
//!     .with_cache(true)
//!     .analyze()?;
//!
//! for finding in &result.findings {
//!     println!("candidate: {}", finding);
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`classfile`]: class-file parsing, constant pool, bytecode decoding
//! - [`stack`]: operand-stack and local-variable simulation
//! - [`metadata`]: enum-ness lookups over scanned classes
//! - [`detect`]: tag propagation and call-site judging
//! - [`scan`]: parallel class-file discovery
//! - [`cache`]: incremental analysis cache with SHA-256 change detection
//! - [`builder`]: fluent builder API for configuration
//! - [`error`]: typed error handling

pub mod builder;
pub mod cache;
pub mod classfile;
pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod prelude;
pub mod report;
pub mod scan;
pub mod stack;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{EnumcheckError, EnumcheckResult, IoResultExt};

// Builder API
pub use builder::{AnalysisResult, Enumcheck};

// Core detection
pub use detect::{
    analyze_class, ClassAnalysis, CollectionTag, Finding, FindingKind, MIN_CLASS_MAJOR,
};

// Class-file model
pub use classfile::{
    decode, ClassFile, ClassFormatError, CodeAttribute, ConstantPool, FieldInfo, FieldOp,
    InstrKind, Instruction, InvokeKind, LineNumber, MethodInfo,
};

// Stack simulation
pub use stack::{OpStack, SimItem};

// Metadata lookups
pub use metadata::{ClassIndex, ClassMeta, ClassMetadata};

// Cache types
pub use cache::{file_hash, index_fingerprint, load_cache, save_cache, EnumcheckCache};

// Configuration
pub use config::{load_config, EnumcheckConfig, OutputConfig};

// Logging
pub use logging::{init_structured_logging, log_error, log_info, log_warn};

// Reporting
pub use report::{print_json, print_plain};

// File scanning
pub use scan::{gather_class_files, gather_class_files_with_excludes};

#[cfg(test)]
pub(crate) mod testutil;

#[cfg(test)]
mod tests;
