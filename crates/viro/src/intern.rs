//! Symbol interning for word spellings and frame keys.
//!
//! Every word spelling is stored once in a [`SymbolTable`] and referenced by a
//! compact [`Sym`] handle. Symbol comparison is therefore an integer compare,
//! and frames key their bindings by `Sym` rather than by string.

use ahash::AHashMap;

/// Index into the symbol table's storage.
///
/// Uses `u32` to save space (4 bytes vs 8 bytes for `usize`). This limits us to
/// ~4 billion unique symbols, which is more than sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Sym(u32);

impl Sym {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interner mapping word spellings to [`Sym`] handles and back.
///
/// Spellings are appended to a vector and never removed; the reverse map uses
/// `ahash` for cheap lookups. One table is owned per evaluator, so handles from
/// different evaluators must never be mixed.
#[derive(Debug, Default)]
pub struct SymbolTable {
    spellings: Vec<Box<str>>,
    ids: AHashMap<Box<str>, Sym>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a spelling, returning the existing handle if already present.
    pub fn intern(&mut self, spelling: &str) -> Sym {
        if let Some(&sym) = self.ids.get(spelling) {
            return sym;
        }
        let sym = Sym(u32::try_from(self.spellings.len()).expect("symbol table overflow"));
        self.spellings.push(spelling.into());
        self.ids.insert(spelling.into(), sym);
        sym
    }

    /// Returns the handle for a spelling without interning it.
    #[must_use]
    pub fn get(&self, spelling: &str) -> Option<Sym> {
        self.ids.get(spelling).copied()
    }

    /// Returns the spelling for a handle.
    ///
    /// # Panics
    /// Panics if the handle was not produced by this table.
    #[must_use]
    pub fn resolve(&self, sym: Sym) -> &str {
        &self.spellings[sym.index()]
    }

    /// Number of interned spellings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spellings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spellings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.intern("foo");
        let b = table.intern("foo");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(a), "foo");
    }

    #[test]
    fn distinct_spellings_get_distinct_handles() {
        let mut table = SymbolTable::new();
        let a = table.intern("alpha");
        let b = table.intern("beta");
        assert_ne!(a, b);
        assert_eq!(table.get("beta"), Some(b));
        assert_eq!(table.get("gamma"), None);
    }
}
