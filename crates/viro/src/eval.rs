//! The tree-walking evaluation engine.
//!
//! Programs are blocks of values; the engine walks them left to right,
//! resolving words through the active frame chain and collecting call
//! arguments from the tokens that follow a call word. There is no operator
//! precedence: infix operators win only by being consumed greedily after the
//! value to their left.
//!
//! The engine is split in two: [`Interp`] is the persistent interpreter state
//! (frame store, symbol table, limits), [`Evaluator`] borrows it together
//! with the caller-injected output sinks and tracer for the duration of one
//! run. Frame and call-name push/pop happen on every exit path, including
//! error propagation and early return.

use std::{
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use smallvec::SmallVec;

use crate::{
    error::{Error, Raise, RunResult},
    frame::{Frame, FrameKind, ROOT_FRAME},
    intern::{Sym, SymbolTable},
    io::OutputSink,
    natives,
    store::FrameStore,
    tracer::{EvalTracer, TraceEvent},
    value::{Action, BlockRef, FuncImpl, Function, ObjectValue, Param, Value},
};

/// Default cap on evaluation recursion depth. Exceeding it fails with
/// `internal/stack-overflow` instead of overflowing the host stack.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1024;

/// Persistent interpreter state: the frame store, the symbol table, the
/// recursion limit, and the interrupt flag shared with the driver.
///
/// The store and registry are owned exclusively by one interpreter; two
/// threads must never share one.
#[derive(Debug)]
pub struct Interp {
    pub frames: FrameStore,
    pub symbols: SymbolTable,
    max_depth: usize,
    interrupt: Arc<AtomicBool>,
}

impl Default for Interp {
    fn default() -> Self {
        Self::new()
    }
}

impl Interp {
    /// Creates an interpreter with the native library registered in the root
    /// frame and the series actions routed through the type-frame registry.
    #[must_use]
    pub fn new() -> Self {
        let mut interp = Self {
            frames: FrameStore::new(),
            symbols: SymbolTable::new(),
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
            interrupt: Arc::new(AtomicBool::new(false)),
        };
        natives::install(&mut interp);
        interp
    }

    /// Shared flag the driver sets to request cancellation. The engine polls
    /// it between sequence steps; long-running natives may poll it too.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Overrides the recursion limit.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    pub fn clear_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }
}

/// Positional arguments collected at a call site.
///
/// Dedicated variants for the common small arities avoid a `Vec` allocation
/// for most calls.
#[derive(Debug)]
pub enum Args {
    Empty,
    One(Value),
    Two(Value, Value),
    Many(Vec<Value>),
}

impl Args {
    #[must_use]
    pub fn from_vec(mut values: Vec<Value>) -> Self {
        match values.len() {
            0 => Self::Empty,
            1 => Self::One(values.remove(0)),
            2 => {
                let second = values.pop().expect("len is 2");
                let first = values.pop().expect("len is 2");
                Self::Two(first, second)
            }
            _ => Self::Many(values),
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::One(_) => 1,
            Self::Two(..) => 2,
            Self::Many(values) => values.len(),
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        match self {
            Self::Empty => vec![],
            Self::One(a) => vec![a],
            Self::Two(a, b) => vec![a, b],
            Self::Many(values) => values,
        }
    }

    /// Extracts exactly one positional argument.
    pub fn into_one(self, name: &str) -> RunResult<Value> {
        match self {
            Self::One(a) => Ok(a),
            other => Err(Error::arg_count(name, 1, other.count())),
        }
    }

    /// Extracts exactly two positional arguments.
    pub fn into_two(self, name: &str) -> RunResult<(Value, Value)> {
        match self {
            Self::Two(a, b) => Ok((a, b)),
            other => Err(Error::arg_count(name, 2, other.count())),
        }
    }
}

/// Refinement values collected at a call site, keyed by the bare refinement
/// name. Flag refinements default to `false`, value-carrying ones to `none`.
#[derive(Debug, Default)]
pub struct Refinements {
    entries: SmallVec<[(Sym, Value); 2]>,
}

impl Refinements {
    /// Builds the default map for a parameter list.
    #[must_use]
    pub fn for_params(params: &[Param]) -> Self {
        let entries = params
            .iter()
            .filter(|p| p.refinement)
            .map(|p| {
                let default = if p.takes_value { Value::None } else { Value::Logic(false) };
                (p.name, default)
            })
            .collect();
        Self { entries }
    }

    pub(crate) fn set(&mut self, sym: Sym, value: Value) {
        for (name, slot) in &mut self.entries {
            if *name == sym {
                *slot = value;
                return;
            }
        }
        self.entries.push((sym, value));
    }

    /// Returns the collected value for a refinement name.
    #[must_use]
    pub fn get(&self, sym: Sym) -> Option<&Value> {
        self.entries.iter().find(|(name, _)| *name == sym).map(|(_, v)| v)
    }

    /// Whether a refinement was supplied: flag set to true, or a
    /// value-carrying refinement holding a non-none value.
    #[must_use]
    pub fn is_on(&self, sym: Sym) -> bool {
        self.get(sym).is_some_and(Value::is_truthy)
    }
}

/// One evaluation run: the interpreter state plus the caller-injected sinks
/// and tracer, the call-name stack, and the recursion-depth counter.
pub struct Evaluator<'a> {
    pub(crate) interp: &'a mut Interp,
    pub(crate) out: &'a mut dyn OutputSink,
    pub(crate) err: &'a mut dyn OutputSink,
    tracer: &'a mut dyn EvalTracer,
    /// Display names of the calls in flight, outermost first. Parallel to the
    /// active frame stack but not identical: object construction pushes a
    /// frame without a call name, native calls push a name without a frame.
    call_names: Vec<String>,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        interp: &'a mut Interp,
        out: &'a mut dyn OutputSink,
        err: &'a mut dyn OutputSink,
        tracer: &'a mut dyn EvalTracer,
    ) -> Self {
        Self {
            interp,
            out,
            err,
            tracer,
            call_names: Vec::new(),
            depth: 0,
        }
    }

    /// Resolves a word through the active frame chain.
    #[must_use]
    pub fn lookup(&self, sym: Sym) -> Option<Value> {
        self.interp.frames.lookup(sym).cloned()
    }

    #[must_use]
    pub fn form(&self, value: &Value) -> String {
        value.form(&self.interp.symbols, &self.interp.frames)
    }

    #[must_use]
    pub fn mold(&self, value: &Value) -> String {
        value.mold(&self.interp.symbols, &self.interp.frames)
    }

    pub(crate) fn emit(&mut self, text: &str) {
        self.out.write(text);
    }

    pub(crate) fn emit_char(&mut self, ch: char) {
        self.out.push_char(ch);
    }

    /// The caller-injected standard output sink.
    pub fn output_sink(&mut self) -> &mut dyn OutputSink {
        &mut *self.out
    }

    /// The caller-injected error sink. The engine itself never writes here;
    /// it exists for natives that report without raising.
    pub fn error_sink(&mut self) -> &mut dyn OutputSink {
        &mut *self.err
    }

    fn enter(&mut self) -> RunResult<()> {
        if self.depth >= self.interp.max_depth {
            return Err(Error::stack_overflow(self.interp.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Evaluates a block's contents as a sequence.
    ///
    /// The element vector is snapshotted up front (a shallow clone of shared
    /// handles) so self-modifying code cannot alias the `RefCell` borrow.
    pub fn do_block(&mut self, block: &BlockRef) -> RunResult<Value> {
        let items = block.borrow().clone();
        self.eval_sequence(&items)
    }

    /// Evaluates a flat sequence of values left to right and returns the last
    /// produced value, or `none` for an empty sequence.
    pub fn eval_sequence(&mut self, items: &[Value]) -> RunResult<Value> {
        self.enter()?;
        let result = self.sequence_inner(items);
        self.leave();
        result
    }

    fn sequence_inner(&mut self, items: &[Value]) -> RunResult<Value> {
        let mut last = Value::None;
        let mut i = 0;
        while i < items.len() {
            if self.interp.interrupt.load(Ordering::Relaxed) {
                return Err(self.annotate_near(Error::interrupt(), items, i));
            }
            let traced = self.tracer.enabled();
            let started = traced.then(Instant::now);
            match self.eval_expr(items, i, &last) {
                Ok((value, next)) => {
                    if let Some(started) = started {
                        let word = items[i].as_word().map(|sym| self.interp.symbols.resolve(sym).to_owned());
                        let event =
                            TraceEvent::new(word, self.form(&value), started.elapsed().as_nanos(), self.depth);
                        self.tracer.on_eval(event);
                    }
                    last = value;
                    i = next;
                }
                Err(raise) => return Err(self.annotate_near(raise, items, i)),
            }
        }
        Ok(last)
    }

    /// Attaches a "near" snapshot to an error caught at a known token index.
    fn annotate_near(&self, raise: Raise, items: &[Value], at: usize) -> Raise {
        match raise {
            Raise::Error(mut error) => {
                if error.near.is_none() {
                    error.set_near_if_empty(self.near_snapshot(items, at));
                }
                Raise::Error(error)
            }
            other => other,
        }
    }

    /// Molds three to five tokens around the failing index, caret on the
    /// failing one.
    fn near_snapshot(&self, items: &[Value], at: usize) -> String {
        let start = at.saturating_sub(2);
        let end = (at + 3).min(items.len());
        let mut out = String::new();
        for index in start..end {
            if index > start {
                out.push(' ');
            }
            if index == at {
                out.push('^');
            }
            out.push_str(&self.mold(&items[index]));
        }
        out
    }

    /// Evaluates one full expression starting at `i`: a basic step followed
    /// by a greedy infix chain, so `1 + 2 * 3` folds left to right with no
    /// precedence. Returns the value and the index past the consumed tokens.
    fn eval_expr(&mut self, items: &[Value], i: usize, last: &Value) -> RunResult<(Value, usize)> {
        let (mut value, mut j) = self.eval_step(items, i, last)?;
        while j < items.len() {
            let Some(sym) = items[j].as_word() else { break };
            let Some(Value::Func(callee)) = self.lookup(sym) else { break };
            if !callee.infix {
                break;
            }
            (value, j) = self.call_site(items, j, Some(value), &callee, sym)?;
        }
        Ok((value, j))
    }

    /// Classifies and evaluates the token at `i`.
    fn eval_step(&mut self, items: &[Value], i: usize, last: &Value) -> RunResult<(Value, usize)> {
        match &items[i] {
            Value::SetWord(sym) => self.eval_set_word(items, i, *sym),
            Value::Word(sym) => match self.lookup(*sym) {
                None => Err(Error::no_value(self.interp.symbols.resolve(*sym))),
                Some(Value::Func(callee)) => {
                    let seed = (callee.infix && !matches!(last, Value::None)).then(|| last.clone());
                    let needed = callee.positional_count().saturating_sub(usize::from(seed.is_some()));
                    if !callee.is_native() && needed > 0 && i + 1 >= items.len() {
                        // A user function as the final expression of a
                        // sequence is a value, not a call.
                        Ok((Value::Func(callee), i + 1))
                    } else {
                        self.call_site(items, i, seed, &callee, *sym)
                    }
                }
                Some(Value::Action(action)) => self.call_action(items, i, &action),
                Some(value) => Ok((value, i + 1)),
            },
            other => Ok((self.eval_one(other)?, i + 1)),
        }
    }

    /// Evaluates a single value outside call position.
    pub fn eval_one(&mut self, value: &Value) -> RunResult<Value> {
        match value {
            Value::None
            | Value::Logic(_)
            | Value::Int(_)
            | Value::Decimal(_)
            | Value::Str(_)
            | Value::Binary(_)
            | Value::Block(_)
            | Value::Func(_)
            | Value::Action(_)
            | Value::Object(_)
            | Value::Port(_)
            | Value::Datatype(_) => Ok(value.clone()),
            Value::Paren(items) => {
                let cloned = items.borrow().clone();
                self.eval_sequence(&cloned)
            }
            Value::Word(sym) => match self.lookup(*sym) {
                None => Err(Error::no_value(self.interp.symbols.resolve(*sym))),
                // Natives are dispatched by the sequence walker in call
                // position; in isolation the word stands for itself.
                Some(Value::Func(f)) if f.is_native() => Ok(value.clone()),
                Some(bound) => Ok(bound),
            },
            Value::SetWord(sym) => {
                let spelling = self.interp.symbols.resolve(*sym);
                Err(Error::no_value(format!("{spelling}:")))
            }
            Value::GetWord(sym) => self
                .lookup(*sym)
                .ok_or_else(|| Error::no_value(self.interp.symbols.resolve(*sym))),
            Value::LitWord(sym) => Ok(Value::Word(*sym)),
            Value::Path(segments) => self.eval_path(segments),
        }
    }

    // -- set-word and set-path -------------------------------------------

    fn eval_set_word(&mut self, items: &[Value], i: usize, sym: Sym) -> RunResult<(Value, usize)> {
        let spelling = self.interp.symbols.resolve(sym).to_owned();
        if spelling.contains('.') {
            return self.eval_set_path(items, i, &spelling);
        }
        if i + 1 >= items.len() {
            return Err(Error::no_value(format!("{spelling}:")));
        }
        let (value, next) = self.eval_expr(items, i + 1, &Value::None)?;
        if let Value::Func(f) = &value {
            let mut name = f.name.borrow_mut();
            if name.is_none() {
                *name = Some(sym);
            }
        }
        self.interp.frames.bind_top(sym, value.clone());
        Ok((value, next))
    }

    fn eval_set_path(&mut self, items: &[Value], i: usize, spelling: &str) -> RunResult<(Value, usize)> {
        if i + 1 >= items.len() {
            return Err(Error::no_value(format!("{spelling}:")));
        }
        let (value, next) = self.eval_expr(items, i + 1, &Value::None)?;

        let segments: Vec<&str> = spelling.split('.').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(Error::invalid_path(spelling));
        }
        if parse_index(segments[0]).is_some() {
            // `1.field: v` targets a literal number.
            return Err(Error::immutable_target());
        }

        let base_sym = self.interp.symbols.intern(segments[0]);
        let mut container = self
            .lookup(base_sym)
            .ok_or_else(|| Error::no_value(segments[0].to_owned()))?;

        for segment in &segments[1..segments.len() - 1] {
            let step = self.set_path_segment(segment);
            container = self.select(container, &step)?;
        }
        let final_segment = self.set_path_segment(segments[segments.len() - 1]);
        self.assign(&container, &final_segment, value.clone())?;
        Ok((value, next))
    }

    /// Converts one dotted set-path segment to a traversal value.
    fn set_path_segment(&mut self, segment: &str) -> Value {
        match parse_index(segment) {
            Some(n) => Value::Int(n),
            None => Value::Word(self.interp.symbols.intern(segment)),
        }
    }

    /// Assigns into the final container of a set-path.
    fn assign(&mut self, container: &Value, segment: &Value, value: Value) -> RunResult<()> {
        if matches!(container, Value::None) {
            return Err(Error::none_path());
        }
        match (container, segment) {
            (Value::Object(obj), Value::Word(sym)) => {
                // The field must already exist somewhere on the object; new
                // fields are introduced only by object construction.
                if !self.object_has_field(obj, *sym) {
                    return Err(Error::no_such_field(self.interp.symbols.resolve(*sym)));
                }
                self.interp.frames.get_mut(obj.frame).bind(*sym, value);
                Ok(())
            }
            (Value::Block(series), Value::Int(n)) | (Value::Paren(series), Value::Int(n)) => {
                let mut elements = series.borrow_mut();
                let len = elements.len();
                let index = usize::try_from(*n).ok().filter(|n| (1..=len).contains(n));
                match index {
                    Some(index) => {
                        elements[index - 1] = value;
                        Ok(())
                    }
                    None => Err(Error::index_out_of_range(*n, len)),
                }
            }
            (Value::Str(_), Value::Int(_)) => Err(Error::immutable_target()),
            (other, segment) => {
                let segment = self.mold(segment);
                Err(Error::path_type_mismatch(segment, <&str>::from(other.tag())))
            }
        }
    }

    // -- path evaluation --------------------------------------------------

    /// Evaluates a read path: resolve the head, then select through each
    /// segment.
    pub fn eval_path(&mut self, segments: &[Value]) -> RunResult<Value> {
        let Some(head) = segments.first() else {
            return Err(Error::invalid_path(""));
        };
        let mut current = match head {
            Value::Word(sym) => self
                .lookup(*sym)
                .ok_or_else(|| Error::no_value(self.interp.symbols.resolve(*sym)))?,
            // A literal head is permitted in read position only.
            Value::Int(n) => Value::Int(*n),
            Value::Block(_) | Value::Paren(_) => head.clone(),
            other => return Err(Error::invalid_path(self.mold(other))),
        };
        for segment in &segments[1..] {
            current = self.select(current, segment)?;
        }
        Ok(current)
    }

    /// Selects one path segment out of a container, by field or by 1-based
    /// index.
    fn select(&mut self, container: Value, segment: &Value) -> RunResult<Value> {
        if matches!(container, Value::None) {
            return Err(Error::none_path());
        }
        match segment {
            Value::Word(sym) => match &container {
                Value::Object(obj) => self
                    .object_field(obj, *sym)
                    .ok_or_else(|| Error::no_such_field(self.interp.symbols.resolve(*sym))),
                other => Err(Error::path_type_mismatch(
                    self.interp.symbols.resolve(*sym),
                    <&str>::from(other.tag()),
                )),
            },
            Value::Int(n) => match &container {
                Value::Block(series) | Value::Paren(series) => {
                    let elements = series.borrow();
                    let len = elements.len();
                    usize::try_from(*n)
                        .ok()
                        .filter(|index| (1..=len).contains(index))
                        .map(|index| elements[index - 1].clone())
                        .ok_or_else(|| Error::index_out_of_range(*n, len))
                }
                Value::Str(s) => {
                    let len = s.chars().count();
                    usize::try_from(*n)
                        .ok()
                        .filter(|index| (1..=len).contains(index))
                        .and_then(|index| s.chars().nth(index - 1))
                        .map(|rune| Value::string(rune.encode_utf8(&mut [0u8; 4])))
                        .ok_or_else(|| Error::index_out_of_range(*n, len))
                }
                other => Err(Error::path_type_mismatch(n.to_string(), <&str>::from(other.tag()))),
            },
            other => {
                let segment = self.mold(other);
                Err(Error::path_type_mismatch(segment, <&str>::from(container.tag())))
            }
        }
    }

    /// Looks a field up in an object's own frame, then its prototype chain.
    fn object_field(&self, obj: &ObjectValue, sym: Sym) -> Option<Value> {
        if let Some(value) = self.interp.frames.get(obj.frame).get(sym) {
            return Some(value.clone());
        }
        obj.proto.as_ref().and_then(|proto| self.object_field(proto, sym))
    }

    fn object_has_field(&self, obj: &ObjectValue, sym: Sym) -> bool {
        self.interp.frames.get(obj.frame).has(sym)
            || obj.proto.as_ref().is_some_and(|proto| self.object_has_field(proto, sym))
    }

    // -- call sites --------------------------------------------------------

    /// Collects arguments for a function call starting at the call word and
    /// invokes the callee. Returns the result and the index past all consumed
    /// tokens.
    ///
    /// Refinement tokens (`--name`) may appear adjacent to any argument
    /// position and are consumed where they stand; arguments are never
    /// reordered.
    fn call_site(
        &mut self,
        items: &[Value],
        i: usize,
        seed: Option<Value>,
        callee: &Rc<Function>,
        name_sym: Sym,
    ) -> RunResult<(Value, usize)> {
        let name = self.interp.symbols.resolve(name_sym).to_owned();
        let positional_count = callee.positional_count();
        let mut positionals: Vec<Value> = Vec::with_capacity(positional_count);
        let mut refinements = Refinements::for_params(&callee.params);
        let mut given: SmallVec<[Sym; 2]> = SmallVec::new();
        let mut j = i + 1;

        if let Some(seed) = seed {
            positionals.push(seed);
        }

        for param in callee.params.iter().filter(|p| !p.refinement).skip(positionals.len()) {
            j = self.consume_refinements(items, j, callee, &mut refinements, &mut given)?;
            if j >= items.len() {
                return Err(Error::arg_count(&name, positional_count, positionals.len()));
            }
            if param.evaluate {
                let (value, next) = self.eval_expr(items, j, &Value::None)?;
                positionals.push(value);
                j = next;
            } else {
                positionals.push(items[j].clone());
                j += 1;
            }
        }
        j = self.consume_refinements(items, j, callee, &mut refinements, &mut given)?;

        let value = self.apply(callee, &name, Args::from_vec(positionals), &refinements)?;
        Ok((value, j))
    }

    /// Consumes adjacent refinement tokens at position `j`.
    fn consume_refinements(
        &mut self,
        items: &[Value],
        mut j: usize,
        callee: &Function,
        refinements: &mut Refinements,
        given: &mut SmallVec<[Sym; 2]>,
    ) -> RunResult<usize> {
        while j < items.len() {
            let Some(sym) = items[j].as_word() else { break };
            let spelling = self.interp.symbols.resolve(sym);
            let Some(bare) = spelling.strip_prefix("--") else { break };
            let bare = bare.to_owned();
            let bare_sym = self.interp.symbols.intern(&bare);

            let Some(param) = callee.params.iter().find(|p| p.refinement && p.name == bare_sym) else {
                return Err(Error::invalid_operation(format!("unknown refinement --{bare}")));
            };
            if given.contains(&bare_sym) {
                return Err(Error::invalid_operation(format!("Duplicate refinement --{bare}")));
            }
            given.push(bare_sym);

            if param.takes_value {
                j += 1;
                if j >= items.len() {
                    return Err(Error::invalid_operation(format!("refinement --{bare} is missing its value")));
                }
                let (value, next) = self.eval_expr(items, j, &Value::None)?;
                refinements.set(bare_sym, value);
                j = next;
            } else {
                refinements.set(bare_sym, Value::Logic(true));
                j += 1;
            }
        }
        Ok(j)
    }

    /// Applies a function to already collected arguments. This is the
    /// boundary that pushes and pops the call name, converts the `return`
    /// signal, and annotates "where" on escaping errors.
    pub(crate) fn apply(
        &mut self,
        callee: &Function,
        name: &str,
        args: Args,
        refinements: &Refinements,
    ) -> RunResult<Value> {
        match &callee.imp {
            FuncImpl::Native(imp) => {
                self.call_names.push(name.to_owned());
                self.tracer.on_call(name, self.call_names.len());
                let result = imp(self, args, refinements);
                let result = self.annotate_where(result);
                self.tracer.on_return(self.call_names.len());
                self.call_names.pop();
                result
            }
            FuncImpl::User { body, parent } => {
                if args.count() != callee.positional_count() {
                    return Err(Error::arg_count(name, callee.positional_count(), args.count()));
                }
                let mut frame = Frame::new(FrameKind::FunctionArgs, Some(parent.unwrap_or(ROOT_FRAME)));
                frame.name = *callee.name.borrow();
                let mut values = args.into_vec().into_iter();
                for param in &callee.params {
                    if param.refinement {
                        let default = if param.takes_value { Value::None } else { Value::Logic(false) };
                        let value = refinements.get(param.name).cloned().unwrap_or(default);
                        frame.bind(param.name, value);
                    } else {
                        frame.bind(param.name, values.next().unwrap_or(Value::None));
                    }
                }

                let body = Rc::clone(body);
                self.interp.frames.push(frame);
                self.call_names.push(name.to_owned());
                self.tracer.on_call(name, self.call_names.len());

                let result = self.do_block(&body);

                self.interp.frames.pop();
                let result = match result {
                    Err(Raise::Return(value)) => Ok(value),
                    other => other,
                };
                let result = self.annotate_where(result);
                self.tracer.on_return(self.call_names.len());
                self.call_names.pop();
                result
            }
        }
    }

    fn annotate_where(&self, result: RunResult<Value>) -> RunResult<Value> {
        match result {
            Err(Raise::Error(mut error)) => {
                error.set_where_if_empty(&self.call_names);
                Err(Raise::Error(error))
            }
            other => other,
        }
    }

    /// Collects arguments for an action call and dispatches it on the first
    /// argument's tag through the type-frame registry.
    fn call_action(&mut self, items: &[Value], i: usize, action: &Action) -> RunResult<(Value, usize)> {
        let name = self.interp.symbols.resolve(action.name).to_owned();
        let mut args: Vec<Value> = Vec::with_capacity(action.arity);
        let mut j = i + 1;
        for _ in 0..action.arity {
            if j >= items.len() {
                return Err(Error::arg_count(&name, action.arity, args.len()));
            }
            let (value, next) = self.eval_expr(items, j, &Value::None)?;
            args.push(value);
            j = next;
        }
        let value = self.dispatch_action(action, &name, args)?;
        Ok((value, j))
    }

    /// Resolves an action against the first argument's type frame and
    /// invokes the implementation bound there.
    pub(crate) fn dispatch_action(&mut self, action: &Action, name: &str, args: Vec<Value>) -> RunResult<Value> {
        let Some(first) = args.first() else {
            return Err(Error::arg_count(name, action.arity.max(1), 0));
        };
        let tag = first.tag();
        let implementation = self
            .interp
            .frames
            .type_frame(tag)
            .and_then(|frame| self.interp.frames.get(frame).get(action.name).cloned());
        match implementation {
            Some(Value::Func(f)) => {
                let refinements = Refinements::for_params(&f.params);
                self.apply(&f, name, Args::from_vec(args), &refinements)
            }
            _ => Err(Error::action_no_impl(name, <&str>::from(tag))),
        }
    }

    // -- construction helpers used by natives ------------------------------

    /// Constructs an object by evaluating a spec block in a fresh frame.
    ///
    /// The frame's parent is the current innermost frame, so the body sees
    /// enclosing bindings; the frame is captured because the object retains
    /// it. No call name is pushed.
    pub(crate) fn construct_object(
        &mut self,
        spec: &[Value],
        proto: Option<&Rc<ObjectValue>>,
    ) -> RunResult<Value> {
        let parent = self.interp.frames.top();
        let frame = Frame::new(FrameKind::Object, Some(parent));
        let id = self.interp.frames.push(frame);
        self.interp.frames.mark_captured(id);
        let body = self.eval_sequence(spec);
        self.interp.frames.pop();
        body?;
        Ok(Value::Object(Rc::new(ObjectValue {
            frame: id,
            proto: proto.map(Rc::clone),
        })))
    }

    /// Evaluates the single expression starting at `i`, with no infix seed.
    /// Used by natives that step through a block expression by expression.
    pub(crate) fn eval_next(&mut self, items: &[Value], i: usize) -> RunResult<(Value, usize)> {
        self.eval_expr(items, i, &Value::None)
    }

    /// Evaluates each expression of a block in turn, collecting the results.
    pub(crate) fn reduce_items(&mut self, items: &[Value]) -> RunResult<Vec<Value>> {
        let mut values = Vec::with_capacity(items.len());
        let mut i = 0;
        while i < items.len() {
            let (value, next) = self.eval_next(items, i)?;
            values.push(value);
            i = next;
        }
        Ok(values)
    }
}

/// Parses a dotted set-path segment as a 1-based index.
fn parse_index(segment: &str) -> Option<i64> {
    segment.bytes().all(|b| b.is_ascii_digit()).then(|| segment.parse().ok())?
}
