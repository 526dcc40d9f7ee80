//! Utilities to pick apart method descriptors.

/// A parsed method descriptor: one signature string per parameter value plus
/// the return type (`"V"` for void).
///
/// Parameters are counted as *values*, not local-variable slots; `long` and
/// `double` contribute one entry each, matching the value-granular operand
/// stack simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<String>,
    pub ret: String,
}

impl MethodDescriptor {
    /// Local-variable slots the parameters occupy (`long`/`double` take two).
    pub fn param_slots(&self) -> usize {
        self.params
            .iter()
            .map(|p| if p == "J" || p == "D" { 2 } else { 1 })
            .sum()
    }
}

/// Parse a method descriptor such as `(Ljava/lang/Object;I)Z`.
///
/// Returns `None` for malformed descriptors; callers treat that the same as
/// an unanalyzable call (no crash).
pub fn parse_method_descriptor(descriptor: &str) -> Option<MethodDescriptor> {
    let rest = descriptor.strip_prefix('(')?;
    let close = rest.find(')')?;
    let (param_str, ret) = (&rest[..close], &rest[close + 1..]);

    let mut params = Vec::new();
    let bytes = param_str.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        // Array dimensions prefix the element type
        while i < bytes.len() && bytes[i] == b'[' {
            i += 1;
        }
        match bytes.get(i)? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => i += 1,
            b'L' => {
                let semi = param_str[i..].find(';')?;
                i += semi + 1;
            }
            _ => return None,
        }
        params.push(param_str[start..i].to_string());
    }

    if ret.is_empty() {
        return None;
    }
    Some(MethodDescriptor {
        params,
        ret: ret.to_string(),
    })
}
