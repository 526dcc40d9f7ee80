//! Value-granular operand-stack and local-variable simulation.
//!
//! The simulation mirrors the runtime evaluation stack one instruction at a
//! time, annotated with static metadata the runtime never has: declared-type
//! signatures, an optional collection tag, and the owning field of values
//! produced by field reads. `long`/`double` are single items here (value
//! granularity), so stack offsets used by the detector count values, not
//! slots.
//!
//! Ordering contract: callers read the pre-instruction stack, then call
//! [`OpStack::apply`], and only then attach a tag to the new top item.
//!
//! Control-flow handling is shallow: a single forward pass, not a CFG
//! fixpoint. The one artifact that matters in practice is the
//! ternary-expression merge: a forward `goto` closing the then-branch of a
//! conditional expression. Its top-of-stack value is parked keyed by the jump
//! target and restored there if the fall-through branch produced nothing.
//! Unmodeled opcodes degrade the simulated stack to empty rather than guess.

use std::collections::HashMap;

use crate::classfile::{
    opcode as op, parse_method_descriptor, ClassFile, CodeAttribute, FieldOp, InstrKind,
    Instruction, InvokeKind, MethodInfo,
};
use crate::detect::CollectionTag;

/// One simulated stack or local-variable value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimItem {
    /// JVM type descriptor; empty when unknown
    pub signature: String,
    /// Collection tag attached by the detector, if any
    pub tag: Option<CollectionTag>,
    /// Name of the field this value was read from, if any
    pub source_field: Option<String>,
}

impl SimItem {
    /// A value nothing is known about.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// A value of known declared type.
    pub fn with_signature(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            tag: None,
            source_field: None,
        }
    }

    /// Category-2 value (`long`/`double`), relevant to `pop2`/`dup2` forms.
    fn is_wide(&self) -> bool {
        self.signature == "J" || self.signature == "D"
    }
}

/// The simulated frame of one method: operand stack plus local slots.
#[derive(Debug)]
pub struct OpStack {
    items: Vec<SimItem>,
    locals: Vec<SimItem>,
    /// Parked then-branch values keyed by forward `goto` target offset
    pending_merge: HashMap<u32, SimItem>,
}

impl OpStack {
    /// Fresh frame for a method: empty stack, locals seeded with `this` and
    /// the parameter signatures (so parameter-sourced values carry types).
    pub fn for_method(class: &ClassFile, method: &MethodInfo, code: &CodeAttribute) -> Self {
        let mut locals = vec![SimItem::unknown(); code.max_locals as usize];
        let mut slot = 0usize;

        if !method.is_static() && slot < locals.len() {
            locals[slot] = SimItem::with_signature(format!("L{};", class.name));
            slot += 1;
        }
        if let Some(desc) = parse_method_descriptor(&method.descriptor) {
            for param in &desc.params {
                if slot >= locals.len() {
                    break;
                }
                locals[slot] = SimItem::with_signature(param.clone());
                slot += if param == "J" || param == "D" { 2 } else { 1 };
            }
        }

        Self {
            items: Vec::new(),
            locals,
            pending_merge: HashMap::new(),
        }
    }

    /// An empty frame with the given number of local slots (tests, tools).
    pub fn with_locals(max_locals: u16) -> Self {
        Self {
            items: Vec::new(),
            locals: vec![SimItem::unknown(); max_locals as usize],
            pending_merge: HashMap::new(),
        }
    }

    /// Current stack depth in values.
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    /// Item at `pos` values from the top (0 = top).
    pub fn item(&self, pos: usize) -> Option<&SimItem> {
        self.items.len().checked_sub(pos + 1).map(|i| &self.items[i])
    }

    /// Top-of-stack item.
    pub fn top(&self) -> Option<&SimItem> {
        self.items.last()
    }

    /// Mutable top-of-stack item (tag attachment).
    pub fn top_mut(&mut self) -> Option<&mut SimItem> {
        self.items.last_mut()
    }

    fn push(&mut self, item: SimItem) {
        self.items.push(item);
    }

    /// Test-only: seed the simulated stack directly.
    #[cfg(test)]
    pub(crate) fn push_for_test(&mut self, item: SimItem) {
        self.push(item);
    }

    /// Pop one value; underflow yields an unknown value instead of panicking
    /// (malformed or unmodeled code degrades precision, not the process).
    fn pop(&mut self) -> SimItem {
        self.items.pop().unwrap_or_default()
    }

    fn pop_n(&mut self, n: usize) {
        for _ in 0..n {
            self.pop();
        }
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    /// Announce that the walk reached `offset`; completes any ternary merge
    /// parked on this offset. Call before reading the pre-instruction stack.
    pub fn reach(&mut self, offset: u32) {
        if let Some(saved) = self.pending_merge.remove(&offset) {
            // The fall-through branch wins when it produced a value;
            // the parked then-branch value only fills an empty slot.
            if self.items.is_empty() {
                self.items.push(saved);
            }
        }
    }

    /// Apply one instruction's stack effect.
    pub fn apply(&mut self, instr: &Instruction) {
        match &instr.kind {
            InstrKind::Invoke {
                kind, descriptor, ..
            } => {
                let desc = parse_method_descriptor(descriptor);
                match &desc {
                    Some(d) => self.pop_n(d.params.len()),
                    None => self.clear(),
                }
                if !matches!(kind, InvokeKind::Static | InvokeKind::Dynamic) {
                    self.pop();
                }
                if let Some(d) = desc {
                    if d.ret != "V" {
                        self.push(SimItem::with_signature(d.ret));
                    }
                }
            }
            InstrKind::Field {
                op: fop,
                name,
                descriptor,
                ..
            } => match fop {
                FieldOp::GetField => {
                    self.pop();
                    self.push(SimItem {
                        signature: descriptor.clone(),
                        tag: None,
                        source_field: Some(name.clone()),
                    });
                }
                FieldOp::GetStatic => {
                    self.push(SimItem {
                        signature: descriptor.clone(),
                        tag: None,
                        source_field: Some(name.clone()),
                    });
                }
                FieldOp::PutField => self.pop_n(2),
                FieldOp::PutStatic => {
                    self.pop();
                }
            },
            InstrKind::LocalLoad { slot } => {
                let item = self
                    .locals
                    .get(*slot as usize)
                    .cloned()
                    .unwrap_or_default();
                self.push(item);
            }
            InstrKind::LocalStore { slot } => {
                let item = self.pop();
                let slot = *slot as usize;
                if slot >= self.locals.len() {
                    self.locals.resize(slot + 1, SimItem::unknown());
                }
                self.locals[slot] = item;
            }
            InstrKind::Ldc { signature } => {
                self.push(SimItem::with_signature(signature.clone()));
            }
            InstrKind::New { class } => {
                self.push(SimItem::with_signature(format!("L{};", class)));
            }
            InstrKind::CheckCast { class } => {
                // Same object, narrowed static type; tag and field survive
                if let Some(top) = self.items.last_mut() {
                    top.signature = format!("L{};", class);
                }
            }
            InstrKind::Branch {
                target,
                pops,
                unconditional,
            } => {
                self.pop_n(*pops as usize);
                if *unconditional && *target > instr.offset {
                    if let Some(top) = self.items.pop() {
                        self.pending_merge.insert(*target, top);
                    }
                }
            }
            InstrKind::Switch => {
                self.pop();
            }
            InstrKind::NewArray { signature } => {
                self.pop();
                self.push(SimItem::with_signature(signature.clone()));
            }
            InstrKind::MultiNewArray { dims, signature } => {
                self.pop_n(*dims as usize);
                let mut sig = "[".repeat(*dims as usize);
                sig.push('L');
                sig.push_str(signature);
                sig.push(';');
                self.push(SimItem::with_signature(sig));
            }
            InstrKind::Iinc => {}
            InstrKind::Plain => self.apply_plain(instr.opcode),
        }
    }

    fn apply_plain(&mut self, opcode: u8) {
        match opcode {
            op::NOP => {}
            op::ACONST_NULL => self.push(SimItem::unknown()),
            op::ICONST_M1..=op::ICONST_5 | op::BIPUSH | op::SIPUSH => {
                self.push(SimItem::with_signature("I"))
            }
            op::LCONST_0 | op::LCONST_1 => self.push(SimItem::with_signature("J")),
            op::FCONST_0..=op::FCONST_2 => self.push(SimItem::with_signature("F")),
            op::DCONST_0 | op::DCONST_1 => self.push(SimItem::with_signature("D")),
            op::IALOAD..=op::SALOAD => {
                self.pop_n(2);
                let sig = match opcode {
                    0x2f => "J",
                    0x30 => "F",
                    0x31 => "D",
                    op::AALOAD => "",
                    _ => "I",
                };
                self.push(SimItem::with_signature(sig));
            }
            op::IASTORE..=op::SASTORE => self.pop_n(3),
            op::POP => {
                self.pop();
            }
            op::POP2 => {
                let top = self.pop();
                if !top.is_wide() {
                    self.pop();
                }
            }
            op::DUP => {
                if let Some(top) = self.items.last().cloned() {
                    self.push(top);
                }
            }
            op::DUP_X1 => {
                let a = self.pop();
                let b = self.pop();
                self.push(a.clone());
                self.push(b);
                self.push(a);
            }
            op::DUP_X2 => {
                let a = self.pop();
                let b = self.pop();
                if b.is_wide() {
                    self.push(a.clone());
                    self.push(b);
                    self.push(a);
                } else {
                    let c = self.pop();
                    self.push(a.clone());
                    self.push(c);
                    self.push(b);
                    self.push(a);
                }
            }
            op::DUP2 => {
                let a = self.pop();
                if a.is_wide() {
                    self.push(a.clone());
                    self.push(a);
                } else {
                    let b = self.pop();
                    self.push(b.clone());
                    self.push(a.clone());
                    self.push(b);
                    self.push(a);
                }
            }
            op::DUP2_X1 => {
                let a = self.pop();
                if a.is_wide() {
                    let b = self.pop();
                    self.push(a.clone());
                    self.push(b);
                    self.push(a);
                } else {
                    let b = self.pop();
                    let c = self.pop();
                    self.push(b.clone());
                    self.push(a.clone());
                    self.push(c);
                    self.push(b);
                    self.push(a);
                }
            }
            op::DUP2_X2 => {
                let a = self.pop();
                if a.is_wide() {
                    let b = self.pop();
                    self.push(a.clone());
                    self.push(b);
                    self.push(a);
                } else {
                    let b = self.pop();
                    let c = self.pop();
                    self.push(b.clone());
                    self.push(a.clone());
                    self.push(c);
                    self.push(b);
                    self.push(a);
                }
            }
            op::SWAP => {
                let a = self.pop();
                let b = self.pop();
                self.push(a);
                self.push(b);
            }
            0x60..=0x73 => {
                // add/sub/mul/div/rem, result type cycles I/J/F/D
                self.pop_n(2);
                let sig = ["I", "J", "F", "D"][usize::from((opcode - 0x60) % 4)];
                self.push(SimItem::with_signature(sig));
            }
            0x74..=0x77 => {
                // neg keeps the operand type
                let item = self.pop();
                self.push(item);
            }
            0x78..=0x83 => {
                // shifts and bitwise ops alternate int/long results
                self.pop_n(2);
                let sig = if (opcode - 0x78) % 2 == 0 { "I" } else { "J" };
                self.push(SimItem::with_signature(sig));
            }
            op::I2L..=op::I2S => {
                self.pop();
                let sig = [
                    "J", "F", "D", "I", "F", "D", "I", "J", "D", "I", "J", "F", "I", "I", "I",
                ][usize::from(opcode - op::I2L)];
                self.push(SimItem::with_signature(sig));
            }
            op::LCMP..=op::DCMPG => {
                self.pop_n(2);
                self.push(SimItem::with_signature("I"));
            }
            op::IRETURN..=op::RETURN | op::ATHROW => self.clear(),
            op::ARRAYLENGTH | op::INSTANCEOF => {
                self.pop();
                self.push(SimItem::with_signature("I"));
            }
            op::MONITORENTER | op::MONITOREXIT => {
                self.pop();
            }
            op::JSR | op::JSR_W => self.push(SimItem::unknown()),
            op::RET => {}
            // Anything unmodeled: give up on the current expression
            _ => self.clear(),
        }
    }
}
