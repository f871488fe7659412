//! Storage for all frames during execution.
//!
//! The store owns every frame ever registered, addressed by [`FrameId`], so
//! frames reference each other by index rather than by pointer. That makes
//! cyclic frame graphs (objects referencing objects) trivially representable.
//! A parallel active stack lists the indices currently on the call chain, and
//! a captured bit per slot marks frames that must outlive their activation
//! because a function value retains them as `parent`. Released slots are kept
//! on a free list and reused by later activations.

use ahash::AHashMap;

use crate::{
    frame::{Frame, FrameId, FrameKind, ROOT_FRAME},
    intern::Sym,
    value::{Tag, Value},
};

#[derive(Debug)]
pub struct FrameStore {
    slots: Vec<Option<Frame>>,
    /// Released slot indices available for reuse.
    free: Vec<FrameId>,
    /// Call-chain frame indices, bottom is the root, top is innermost.
    active: Vec<FrameId>,
    /// Captured frames are never released and never reset.
    captured: Vec<bool>,
    /// Polymorphic action implementations keyed by value tag.
    type_frames: AHashMap<Tag, FrameId>,
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStore {
    /// Creates the store with the root frame registered, active, and captured.
    #[must_use]
    pub fn new() -> Self {
        let mut store = Self {
            slots: Vec::new(),
            free: Vec::new(),
            active: Vec::new(),
            captured: Vec::new(),
            type_frames: AHashMap::new(),
        };
        let root = store.register(Frame::new(FrameKind::Closure, None));
        debug_assert_eq!(root, ROOT_FRAME);
        store.captured[root.index()] = true;
        store.active.push(root);
        store
    }

    /// Registers a frame, assigning it an index. Registering a frame that
    /// already carries an index is a no-op returning that index.
    pub fn register(&mut self, mut frame: Frame) -> FrameId {
        if let Some(id) = frame.index {
            return id;
        }
        if let Some(id) = self.free.pop() {
            frame.index = Some(id);
            self.captured[id.index()] = false;
            self.slots[id.index()] = Some(frame);
            return id;
        }
        let id = FrameId::new(self.slots.len());
        frame.index = Some(id);
        self.slots.push(Some(frame));
        self.captured.push(false);
        id
    }

    /// Registers a frame and pushes it onto the active stack.
    pub fn push(&mut self, frame: Frame) -> FrameId {
        let id = self.register(frame);
        self.active.push(id);
        id
    }

    /// Re-activates an already registered frame (e.g. re-entering an object
    /// body). The slot must still be live.
    pub fn push_existing(&mut self, id: FrameId) {
        debug_assert!(self.slots[id.index()].is_some(), "pushed a released frame slot");
        self.active.push(id);
    }

    /// Deactivates the innermost frame.
    ///
    /// Captured frames are retained, with function-argument frames upgraded to
    /// closures; everything else is cleared and its slot released for reuse.
    /// The root frame is never popped.
    pub fn pop(&mut self) {
        let Some(id) = self.active.pop() else {
            return;
        };
        assert_ne!(id, ROOT_FRAME, "attempted to pop the root frame");
        if self.captured[id.index()] {
            let frame = self.slots[id.index()].as_mut().expect("captured frame slot is live");
            if frame.kind == FrameKind::FunctionArgs {
                frame.kind = FrameKind::Closure;
            }
        } else {
            self.slots[id.index()] = None;
            self.free.push(id);
        }
    }

    /// Marks a frame as captured: it must outlive its activation because a
    /// function value now records it as parent.
    pub fn mark_captured(&mut self, id: FrameId) {
        self.captured[id.index()] = true;
    }

    #[must_use]
    pub fn is_captured(&self, id: FrameId) -> bool {
        self.captured[id.index()]
    }

    /// Innermost active frame.
    #[must_use]
    pub fn top(&self) -> FrameId {
        *self.active.last().expect("active stack never empties below the root")
    }

    /// Number of frames on the active stack, the root included.
    #[must_use]
    pub fn active_depth(&self) -> usize {
        self.active.len()
    }

    /// Borrows a registered frame.
    ///
    /// # Panics
    /// Panics if the slot was released; holding a stale `FrameId` is an
    /// internal invariant violation.
    #[must_use]
    pub fn get(&self, id: FrameId) -> &Frame {
        self.slots[id.index()].as_ref().expect("frame slot is live")
    }

    #[must_use]
    pub fn get_mut(&mut self, id: FrameId) -> &mut Frame {
        self.slots[id.index()].as_mut().expect("frame slot is live")
    }

    /// Resolves a symbol against the active chain: the innermost active frame
    /// first, then its parents by store index, stopping at the root. Returns
    /// the first hit.
    #[must_use]
    pub fn lookup(&self, sym: Sym) -> Option<&Value> {
        let mut current = Some(self.top());
        while let Some(id) = current {
            let frame = self.get(id);
            if let Some(value) = frame.get(sym) {
                return Some(value);
            }
            current = frame.parent;
        }
        None
    }

    /// Binds a symbol in the innermost active frame.
    pub fn bind_top(&mut self, sym: Sym, value: Value) {
        let top = self.top();
        self.get_mut(top).bind(sym, value);
    }

    /// Binds a symbol in the root frame.
    pub fn bind_root(&mut self, sym: Sym, value: Value) {
        self.get_mut(ROOT_FRAME).bind(sym, value);
    }

    /// Returns the type frame registered for a tag, if any.
    #[must_use]
    pub fn type_frame(&self, tag: Tag) -> Option<FrameId> {
        self.type_frames.get(&tag).copied()
    }

    /// Registers (or replaces, for specialization) the type frame for a tag.
    /// Type frames are captured immediately; they are reachable only through
    /// the registry, never through the active stack.
    pub fn register_type_frame(&mut self, tag: Tag, frame: Frame) -> FrameId {
        let id = self.register(frame);
        self.mark_captured(id);
        self.type_frames.insert(tag, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::SymbolTable;

    #[test]
    fn root_frame_is_slot_zero_and_captured() {
        let store = FrameStore::new();
        assert_eq!(store.top(), ROOT_FRAME);
        assert!(store.is_captured(ROOT_FRAME));
        assert_eq!(store.active_depth(), 1);
    }

    #[test]
    fn lookup_crosses_one_parent_boundary() {
        let mut symbols = SymbolTable::new();
        let x = symbols.intern("x");
        let y = symbols.intern("y");

        let mut store = FrameStore::new();
        store.bind_root(x, Value::Int(1));

        let child = Frame::new(FrameKind::FunctionArgs, Some(ROOT_FRAME));
        store.push(child);
        store.bind_top(y, Value::Int(2));

        assert_eq!(store.lookup(y).and_then(Value::as_int), Some(2));
        assert_eq!(store.lookup(x).and_then(Value::as_int), Some(1));

        store.pop();
        assert!(store.lookup(y).is_none());
        assert_eq!(store.lookup(x).and_then(Value::as_int), Some(1));
    }

    #[test]
    fn uncaptured_frames_are_released_and_reused() {
        let mut store = FrameStore::new();
        let first = store.push(Frame::new(FrameKind::FunctionArgs, Some(ROOT_FRAME)));
        store.pop();
        let second = store.push(Frame::new(FrameKind::FunctionArgs, Some(ROOT_FRAME)));
        assert_eq!(first, second);
        store.pop();
    }

    #[test]
    fn captured_frames_survive_pop_as_closures() {
        let mut symbols = SymbolTable::new();
        let n = symbols.intern("n");

        let mut store = FrameStore::new();
        let id = store.push(Frame::new(FrameKind::FunctionArgs, Some(ROOT_FRAME)));
        store.bind_top(n, Value::Int(41));
        store.mark_captured(id);
        store.pop();

        let frame = store.get(id);
        assert_eq!(frame.kind, FrameKind::Closure);
        assert_eq!(frame.get(n).and_then(Value::as_int), Some(41));
    }

    #[test]
    fn captured_frames_can_be_reactivated_at_the_same_index() {
        let mut symbols = SymbolTable::new();
        let n = symbols.intern("n");

        let mut store = FrameStore::new();
        let id = store.push(Frame::new(FrameKind::Object, Some(ROOT_FRAME)));
        store.mark_captured(id);
        store.bind_top(n, Value::Int(1));
        store.pop();

        store.push_existing(id);
        assert_eq!(store.top(), id);
        assert_eq!(store.lookup(n).and_then(Value::as_int), Some(1));
        store.pop();
        assert!(store.is_captured(id));
    }

    #[test]
    fn type_frame_registration_allows_overwrite() {
        let mut symbols = SymbolTable::new();
        let first = symbols.intern("first");

        let mut store = FrameStore::new();
        let mut frame = Frame::new(FrameKind::TypeFrame, Some(ROOT_FRAME));
        frame.bind(first, Value::Int(1));
        let a = store.register_type_frame(Tag::Block, frame);
        assert_eq!(store.type_frame(Tag::Block), Some(a));

        let b = store.register_type_frame(Tag::Block, Frame::new(FrameKind::TypeFrame, Some(ROOT_FRAME)));
        assert_eq!(store.type_frame(Tag::Block), Some(b));
        assert_eq!(store.type_frame(Tag::Paren), None);
    }
}
