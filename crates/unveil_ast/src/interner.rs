//! String interner for identifier names.
//!
//! Interned strings are leaked into `&'static str` storage so lookups can
//! hand out references without holding the lock. The interner lives for the
//! whole deobfuscation run, so the leak is bounded by the input's identifier
//! set.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

struct Inner {
    map: FxHashMap<&'static str, Name>,
    strings: Vec<&'static str>,
}

/// String interner handing out [`Name`] handles.
///
/// O(1) lookup; interning takes a write lock only for unseen strings.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create an interner with the reserved names pre-interned at their
    /// fixed indices (`Name::EMPTY`, `Name::UNDEFINED`, `Name::ARGUMENTS`).
    pub fn new() -> Self {
        let mut inner = Inner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        };
        for reserved in ["", "undefined", "arguments", "NaN", "Infinity"] {
            let name = Name::from_raw(inner.strings.len() as u32);
            inner.map.insert(reserved, name);
            inner.strings.push(reserved);
        }
        debug_assert_eq!(inner.map[""], Name::EMPTY);
        debug_assert_eq!(inner.map["undefined"], Name::UNDEFINED);
        debug_assert_eq!(inner.map["arguments"], Name::ARGUMENTS);
        debug_assert_eq!(inner.map["NaN"], Name::NAN);
        debug_assert_eq!(inner.map["Infinity"], Name::INFINITY);
        StringInterner {
            inner: RwLock::new(inner),
        }
    }

    /// Intern a string, returning its handle.
    pub fn intern(&self, s: &str) -> Name {
        if let Some(&name) = self.inner.read().map.get(s) {
            return name;
        }
        let mut inner = self.inner.write();
        // Re-check under the write lock: another caller may have won the race.
        if let Some(&name) = inner.map.get(s) {
            return name;
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let name = Name::from_raw(inner.strings.len() as u32);
        inner.map.insert(leaked, name);
        inner.strings.push(leaked);
        name
    }

    /// Look up the string for a handle.
    ///
    /// # Panics
    /// Panics if `name` did not come from this interner.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.inner.read().strings[name.raw() as usize]
    }

    /// Number of interned strings (including the reserved ones).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Never empty: the reserved names are always present.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_round_trip() {
        let interner = StringInterner::new();
        let a = interner.intern("alpha");
        let b = interner.intern("beta");
        assert_ne!(a, b);
        assert_eq!(interner.lookup(a), "alpha");
        assert_eq!(interner.lookup(b), "beta");
    }

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern("x"), interner.intern("x"));
    }

    #[test]
    fn reserved_names_fixed() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern("undefined"), Name::UNDEFINED);
        assert_eq!(interner.intern("arguments"), Name::ARGUMENTS);
        assert_eq!(interner.lookup(Name::UNDEFINED), "undefined");
    }
}
