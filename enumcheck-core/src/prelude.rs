//! Prelude module for convenient imports.
//!
//! Import commonly used types with a single line:
//!
//! ```rust,ignore
//! use enumcheck_core::prelude::*;
//! ```
//!
//! This provides the most commonly needed types for enum-collection analysis
//! without polluting the namespace with rarely-used items.

// Core analysis types
pub use crate::detect::{analyze_class, ClassAnalysis, CollectionTag, Finding, FindingKind};
pub use crate::error::{EnumcheckError, EnumcheckResult};

// Class-file model
pub use crate::classfile::{ClassFile, ClassFormatError, CodeAttribute, MethodInfo};

// Metadata lookups
pub use crate::metadata::{ClassIndex, ClassMeta, ClassMetadata};

// File scanning
pub use crate::scan::{gather_class_files, gather_class_files_with_excludes};

// Caching
pub use crate::cache::{load_cache, save_cache, EnumcheckCache};

// Configuration
pub use crate::config::{load_config, EnumcheckConfig};

// Builder API
pub use crate::builder::{AnalysisResult, Enumcheck};
