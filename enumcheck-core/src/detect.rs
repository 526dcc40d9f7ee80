//! Detection of map/set call sites that should use the enum-specialized
//! collections.
//!
//! For each class at or above the generics-era format version, every method
//! gets one forward pass over its instruction stream. A lightweight
//! collection tag is inferred per instruction and propagated through local
//! slots and fields; at `Map.put`/`Set.add` interface calls the propagated
//! tags plus class metadata decide whether the call site is a finding.
//!
//! A finding ends the scan of its method: at most one finding per method,
//! and at most one per backing field across the whole class.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classfile::{
    decode, opcode, ClassFile, CodeAttribute, FieldOp, InstrKind, Instruction, InvokeKind,
    MethodInfo,
};
use crate::metadata::ClassMetadata;
use crate::stack::OpStack;

/// Lowest class-file major version with generics (Java 5); older classes
/// predate the enum-specialized collections and are skipped entirely.
pub const MIN_CLASS_MAJOR: u16 = 49;

const ENUM_SET: &str = "java/util/EnumSet";
const ENUM_MAP: &str = "java/util/EnumMap";
const GUAVA_MAPS: &str = "com/google/common/collect/Maps";
const GUAVA_SETS: &str = "com/google/common/collect/Sets";
const HASH_MAP: &str = "java/util/HashMap";
const HASH_SET: &str = "java/util/HashSet";
const CONSTRUCTOR: &str = "<init>";
const JAVA_UTIL_MAP: &str = "java/util/Map";
const JAVA_UTIL_SET: &str = "java/util/Set";
const SIG_MAP_PUT: &str = "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;";
const SIG_SET_ADD: &str = "(Ljava/lang/Object;)Z";
const SIG_HASH_MAP: &str = "Ljava/util/HashMap;";
const SIG_HASH_SET: &str = "Ljava/util/HashSet;";

/// What kind of collection a simulated value is known to hold.
///
/// "Unknown" is the absence of a tag (`Option<CollectionTag>::None`), so no
/// merge logic is ever needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTag {
    /// A general-purpose hash-based set/map, the flaggable kind
    Regular,
    /// Some other concrete collection, not worth flagging
    Special,
    /// Already an enum-specialized collection
    Enum,
}

/// Finding category. A single variant today; serialized by name so reports
/// stay stable if more detectors join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    EnumCollectionOpportunity,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnumCollectionOpportunity => write!(f, "enum-collection-opportunity"),
        }
    }
}

/// One reported call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Binary name of the enclosing class
    pub class_name: String,
    /// Enclosing method name
    pub method_name: String,
    /// Enclosing method descriptor
    pub method_descriptor: String,
    /// Source line of the flagged call, when the class carries line info
    pub line: Option<u32>,
    pub kind: FindingKind,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.class_name, self.method_name, self.method_descriptor
        )?;
        if let Some(line) = self.line {
            write!(f, " line {}", line)?;
        }
        Ok(())
    }
}

/// Result of analyzing one class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassAnalysis {
    pub class_name: String,
    pub findings: Vec<Finding>,
    /// Key types that could not be resolved against the metadata index
    pub missing_classes: Vec<String>,
}

impl ClassAnalysis {
    fn missing_class(&mut self, binary_name: &str) {
        if !self.missing_classes.iter().any(|c| c == binary_name) {
            debug!(class = %binary_name, "key type not resolvable, skipping call site");
            self.missing_classes.push(binary_name.to_string());
        }
    }
}

/// Mutable per-class analysis state: the three tag/suppression maps.
///
/// Constructed fresh for every class, so parallel per-class analysis shares
/// nothing. Local tags are cleared at every method entry; field tags and the
/// reported set live for the whole class.
#[derive(Debug, Default)]
struct AnalysisContext {
    local_tags: HashMap<u16, CollectionTag>,
    field_tags: HashMap<String, CollectionTag>,
    reported_fields: HashSet<String>,
}

/// Analyze one class against the metadata index.
///
/// Classes below [`MIN_CLASS_MAJOR`] yield an empty result.
pub fn analyze_class(class: &ClassFile, metadata: &dyn ClassMetadata) -> ClassAnalysis {
    let mut out = ClassAnalysis {
        class_name: class.name.clone(),
        ..Default::default()
    };

    if class.major_version < MIN_CLASS_MAJOR {
        return out;
    }

    let mut ctx = AnalysisContext::default();
    for method in &class.methods {
        if let Some(code) = &method.code {
            analyze_method(class, method, code, metadata, &mut ctx, &mut out);
        }
    }
    out
}

/// One forward pass over a method. Ordering per instruction: infer a tag and
/// judge the call site against the *pre-instruction* stack, apply the stack
/// effect, attach the tag to the new top item, then honor the stop signal.
fn analyze_method(
    class: &ClassFile,
    method: &MethodInfo,
    code: &CodeAttribute,
    metadata: &dyn ClassMetadata,
    ctx: &mut AnalysisContext,
    out: &mut ClassAnalysis,
) {
    ctx.local_tags.clear();

    let instructions = match decode(&code.bytes, &class.pool) {
        Ok(instructions) => instructions,
        Err(e) => {
            warn!(
                class = %class.name,
                method = %method.name,
                error = %e,
                "undecodable code attribute, method skipped"
            );
            return;
        }
    };

    let mut stack = OpStack::for_method(class, method, code);
    for instr in &instructions {
        stack.reach(instr.offset);

        let tag = infer_tag(instr, &stack, ctx);
        let stop = judge(instr, &stack, class, method, code, ctx, metadata, out);

        stack.apply(instr);
        if let Some(tag) = tag {
            if let Some(top) = stack.top_mut() {
                top.tag = Some(tag);
            }
        }

        if stop {
            break;
        }
    }
}

/// Per-instruction tag inference; at most one rule fires. Store rules update
/// the maps as a side effect and produce no tag themselves.
fn infer_tag(
    instr: &Instruction,
    stack: &OpStack,
    ctx: &mut AnalysisContext,
) -> Option<CollectionTag> {
    match &instr.kind {
        InstrKind::Invoke {
            kind: InvokeKind::Static,
            owner,
            name,
            descriptor,
        } => {
            if owner == ENUM_SET && descriptor.ends_with(")Ljava/util/EnumSet;") {
                Some(CollectionTag::Enum)
            } else if owner == GUAVA_MAPS || owner == GUAVA_SETS {
                if name.starts_with("newEnum") {
                    Some(CollectionTag::Enum)
                } else if name.starts_with("newHash") {
                    Some(CollectionTag::Regular)
                } else {
                    Some(CollectionTag::Special)
                }
            } else {
                None
            }
        }
        InstrKind::Invoke {
            kind: InvokeKind::Special,
            owner,
            name,
            ..
        } if name == CONSTRUCTOR => {
            if owner == ENUM_MAP {
                Some(CollectionTag::Enum)
            } else if owner.starts_with("java/util/")
                && (owner.ends_with("Map") || owner.ends_with("Set"))
            {
                if owner == HASH_MAP || owner == HASH_SET {
                    Some(CollectionTag::Regular)
                } else {
                    Some(CollectionTag::Special)
                }
            } else {
                None
            }
        }
        InstrKind::LocalStore { slot } if opcode::is_astore(instr.opcode) => {
            if let Some(item) = stack.top() {
                match item.tag {
                    Some(tag) => {
                        ctx.local_tags.insert(*slot, tag);
                    }
                    None => {
                        ctx.local_tags.remove(slot);
                    }
                }
            }
            None
        }
        InstrKind::LocalLoad { slot } if opcode::is_aload(instr.opcode) => {
            ctx.local_tags.get(slot).copied()
        }
        InstrKind::Field {
            op: FieldOp::PutField,
            name,
            ..
        } => {
            if let Some(item) = stack.top() {
                match item.tag {
                    Some(tag) => {
                        ctx.field_tags.insert(name.clone(), tag);
                    }
                    None => {
                        ctx.field_tags.remove(name);
                    }
                }
            }
            None
        }
        InstrKind::Field {
            op: FieldOp::GetField,
            name,
            ..
        } => ctx.field_tags.get(name).copied(),
        _ => None,
    }
}

/// Evaluate a call instruction of interest; `true` aborts the method scan.
#[allow(clippy::too_many_arguments)]
fn judge(
    instr: &Instruction,
    stack: &OpStack,
    class: &ClassFile,
    method: &MethodInfo,
    code: &CodeAttribute,
    ctx: &mut AnalysisContext,
    metadata: &dyn ClassMetadata,
    out: &mut ClassAnalysis,
) -> bool {
    let InstrKind::Invoke {
        kind: InvokeKind::Interface,
        owner,
        name,
        descriptor,
    } = &instr.kind
    else {
        return false;
    };

    let bug = if owner == JAVA_UTIL_MAP && name == "put" && descriptor == SIG_MAP_PUT {
        // put(key, value): key one below the top, receiver below both
        is_enum_key(stack, 1, metadata, out)
            && could_be_enum_collection(stack, 2)
            && !already_reported(stack, 2, ctx)
    } else if owner == JAVA_UTIL_SET && name == "add" && descriptor == SIG_SET_ADD {
        is_enum_key(stack, 0, metadata, out)
            && could_be_enum_collection(stack, 1)
            && !already_reported(stack, 1, ctx)
    } else {
        false
    };

    if bug {
        out.findings.push(Finding {
            class_name: class.name.clone(),
            method_name: method.name.clone(),
            method_descriptor: method.descriptor.clone(),
            line: code.line_for(instr.offset),
            kind: FindingKind::EnumCollectionOpportunity,
        });
    }
    bug
}

/// Binary class name behind an `Lcom/x/Y;` signature.
fn reference_class_name(signature: &str) -> Option<&str> {
    signature.strip_prefix('L')?.strip_suffix(';')
}

/// Is the item at `pos` an enum that implements no interfaces?
///
/// An enum implementing an interface might be stored in a collection keyed by
/// that interface's contract, where the enum-specialized collection would not
/// apply, so those are conservatively excluded. An unresolvable class is
/// recorded and treated as non-matching.
fn is_enum_key(
    stack: &OpStack,
    pos: usize,
    metadata: &dyn ClassMetadata,
    out: &mut ClassAnalysis,
) -> bool {
    let Some(item) = stack.item(pos) else {
        return false;
    };
    let Some(class_name) = reference_class_name(&item.signature) else {
        return false;
    };
    match metadata.lookup(class_name) {
        None => {
            out.missing_class(class_name);
            false
        }
        Some(meta) => meta.is_enum && meta.interface_count == 0,
    }
}

/// Is the item at `pos` a general-purpose collection that could have been the
/// enum-specialized one? A tag decides when present; otherwise the declared
/// signature must be exactly `HashMap`/`HashSet`.
fn could_be_enum_collection(stack: &OpStack, pos: usize) -> bool {
    let Some(item) = stack.item(pos) else {
        return false;
    };
    if let Some(tag) = item.tag {
        return tag == CollectionTag::Regular;
    }
    item.signature == SIG_HASH_SET || item.signature == SIG_HASH_MAP
}

/// Field-backed receivers are reported at most once per class. The field name
/// is recorded unconditionally, so any later call through the same field is
/// suppressed whether or not this site was flagged. Receivers that do not
/// resolve to a field never suppress.
fn already_reported(stack: &OpStack, pos: usize, ctx: &mut AnalysisContext) -> bool {
    let Some(item) = stack.item(pos) else {
        return false;
    };
    let Some(field) = &item.source_field else {
        return false;
    };
    !ctx.reported_fields.insert(field.clone())
}
