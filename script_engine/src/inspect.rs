//! Dotted-name resolution for introspection

use crate::builtins::Builtins;
use crate::namespace::Namespace;
use crate::value::Value;

/// Result of resolving a dotted name
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Deepest object reached, if the root resolved
    pub value: Option<Value>,
    /// Number of leading segments that resolved
    pub resolved: usize,
    /// Total number of segments
    pub segments: usize,
}

impl Resolution {
    /// Returns whether every segment resolved
    pub fn is_complete(&self) -> bool {
        self.value.is_some() && self.resolved == self.segments
    }
}

/// Resolves `a.b.c` against the namespace, then the built-ins
///
/// Resolution stops at the first segment that cannot be found.
pub fn resolve(ns: &Namespace, builtins: &Builtins, oname: &str) -> Resolution {
    let segments: Vec<&str> = oname.trim().split('.').collect();
    let mut resolution = Resolution {
        value: None,
        resolved: 0,
        segments: segments.len(),
    };

    let Some((root, rest)) = segments.split_first() else {
        return resolution;
    };
    let Some(mut current) = ns.get(root).or_else(|| builtins.get(root)).cloned() else {
        return resolution;
    };
    resolution.resolved = 1;

    for segment in rest {
        match current.get_attr(segment) {
            Ok(next) => {
                current = next;
                resolution.resolved += 1;
            }
            Err(_) => break,
        }
    }

    resolution.value = Some(current);
    resolution
}

/// Docstring of the deepest resolved object, or `""` when the root is unknown
pub fn object_doc(ns: &Namespace, builtins: &Builtins, oname: &str) -> String {
    resolve(ns, builtins, oname)
        .value
        .map(|value| value.doc())
        .unwrap_or_default()
}
