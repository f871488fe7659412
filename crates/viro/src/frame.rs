//! Binding frames: ordered word-to-value maps with a parent link.
//!
//! A frame holds only its local bindings; the parent chain is walked by the
//! frame store, never by the frame itself. Binding an existing symbol updates
//! in place, a new symbol is appended (local-by-default scoping).

use indexmap::IndexMap;

use crate::{intern::Sym, value::Value};

/// Index of a registered frame in the [`FrameStore`](crate::store::FrameStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct FrameId(u32);

impl FrameId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index.try_into().expect("frame store overflow"))
    }

    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The root frame is always slot 0, captured at creation and never popped.
pub const ROOT_FRAME: FrameId = FrameId(0);

/// What a frame was created for. Function-argument frames are upgraded to
/// `Closure` when they outlive their activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    FunctionArgs,
    Closure,
    Object,
    TypeFrame,
}

/// An insertion-ordered mapping from symbol to value with a parent link into
/// the frame store (`None` for the root).
#[derive(Debug)]
pub struct Frame {
    bindings: IndexMap<Sym, Value, ahash::RandomState>,
    pub kind: FrameKind,
    /// Diagnostic name, e.g. the function the frame was created for.
    pub name: Option<Sym>,
    pub parent: Option<FrameId>,
    /// Own index in the frame store; `None` until registered.
    pub index: Option<FrameId>,
}

impl Frame {
    #[must_use]
    pub fn new(kind: FrameKind, parent: Option<FrameId>) -> Self {
        Self {
            bindings: IndexMap::default(),
            kind,
            name: None,
            parent,
            index: None,
        }
    }

    #[must_use]
    pub fn named(kind: FrameKind, parent: Option<FrameId>, name: Sym) -> Self {
        Self {
            name: Some(name),
            ..Self::new(kind, parent)
        }
    }

    /// Inserts or updates a binding.
    pub fn bind(&mut self, sym: Sym, value: Value) {
        self.bindings.insert(sym, value);
    }

    /// Looks up a local binding. The parent chain is not consulted.
    #[must_use]
    pub fn get(&self, sym: Sym) -> Option<&Value> {
        self.bindings.get(&sym)
    }

    /// Updates an existing binding; returns false if the symbol is absent.
    pub fn set(&mut self, sym: Sym, value: Value) -> bool {
        match self.bindings.get_mut(&sym) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn has(&self, sym: Sym) -> bool {
        self.bindings.contains_key(&sym)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.bindings.len()
    }

    /// Iterates bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Sym, &Value)> {
        self.bindings.iter()
    }

    /// Shallow copy with store identity reset.
    #[must_use]
    pub fn clone_frame(&self) -> Self {
        Self {
            bindings: self.bindings.clone(),
            kind: self.kind,
            name: self.name,
            parent: self.parent,
            index: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_inserts_and_updates_in_place() {
        let mut symbols = crate::intern::SymbolTable::new();
        let a = symbols.intern("a");
        let b = symbols.intern("b");

        let mut frame = Frame::new(FrameKind::Object, None);
        frame.bind(a, Value::Int(1));
        assert_eq!(frame.count(), 1);
        frame.bind(a, Value::Int(2));
        assert_eq!(frame.count(), 1);
        assert_eq!(frame.get(a).and_then(Value::as_int), Some(2));

        frame.bind(b, Value::Int(3));
        assert_eq!(frame.count(), 2);
        let order: Vec<Sym> = frame.iter().map(|(sym, _)| *sym).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn set_is_update_only() {
        let mut symbols = crate::intern::SymbolTable::new();
        let a = symbols.intern("a");
        let mut frame = Frame::new(FrameKind::FunctionArgs, None);
        assert!(!frame.set(a, Value::Int(1)));
        frame.bind(a, Value::Int(1));
        assert!(frame.set(a, Value::Int(5)));
        assert_eq!(frame.get(a).and_then(Value::as_int), Some(5));
    }

    #[test]
    fn clone_frame_resets_identity() {
        let mut frame = Frame::new(FrameKind::Object, None);
        frame.index = Some(FrameId::new(3));
        let copy = frame.clone_frame();
        assert_eq!(copy.index, None);
        assert_eq!(copy.kind, FrameKind::Object);
    }
}
