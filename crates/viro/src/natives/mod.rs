//! The native function library.
//!
//! Natives are handed to the engine at startup as (name, descriptor,
//! implementation) triples and bound into the root frame. A descriptor is the
//! same parameter list user functions carry: positional parameters with
//! per-argument evaluate flags, refinements, and the infix flag. Actions are
//! bound as dispatch names; their per-type implementations live in the
//! type-frame registry.

use std::{cell::RefCell, rc::Rc};

use crate::{
    eval::Interp,
    frame::{Frame, FrameKind, ROOT_FRAME},
    intern::Sym,
    value::{Action, FuncImpl, Function, NativeImpl, Param, Tag, Value},
};

mod control;
mod core;
mod math;
mod series;

/// Declarative parameter description used by native registration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParamSpec {
    name: &'static str,
    refinement: bool,
    takes_value: bool,
    evaluate: bool,
}

/// An evaluated positional parameter.
pub(crate) const fn arg(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        refinement: false,
        takes_value: false,
        evaluate: true,
    }
}

/// A positional parameter taken literally, without evaluation.
pub(crate) const fn lit(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        refinement: false,
        takes_value: false,
        evaluate: false,
    }
}

/// A flag refinement, defaulting to `false`.
pub(crate) const fn flag(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        refinement: true,
        takes_value: false,
        evaluate: true,
    }
}

/// Builds a native function value without binding it anywhere.
pub(crate) fn native_fn(interp: &mut Interp, name: &str, params: &[ParamSpec], infix: bool, imp: NativeImpl) -> Value {
    let name_sym = interp.symbols.intern(name);
    let params = params
        .iter()
        .map(|spec| Param {
            name: interp.symbols.intern(spec.name),
            refinement: spec.refinement,
            takes_value: spec.takes_value,
            evaluate: spec.evaluate,
        })
        .collect();
    Value::Func(Rc::new(Function {
        name: RefCell::new(Some(name_sym)),
        params,
        infix,
        imp: FuncImpl::Native(imp),
    }))
}

/// Registers a native under `name` in the root frame.
pub(crate) fn register(interp: &mut Interp, name: &str, params: &[ParamSpec], infix: bool, imp: NativeImpl) {
    let value = native_fn(interp, name, params, infix, imp);
    let sym = interp.symbols.intern(name);
    interp.frames.bind_root(sym, value);
}

/// Registers an action dispatch name in the root frame.
pub(crate) fn register_action(interp: &mut Interp, name: &str, arity: usize) -> Sym {
    let sym = interp.symbols.intern(name);
    interp
        .frames
        .bind_root(sym, Value::Action(Rc::new(Action { name: sym, arity })));
    sym
}

/// Registers the per-type implementations of actions for one tag.
///
/// Replacing an existing type frame is permitted; that is how runtime
/// specialization works.
pub(crate) fn register_type_frame(interp: &mut Interp, tag: Tag, implementations: Vec<(Sym, Value)>) {
    let mut frame = Frame::new(FrameKind::TypeFrame, Some(ROOT_FRAME));
    for (sym, value) in implementations {
        frame.bind(sym, value);
    }
    interp.frames.register_type_frame(tag, frame);
}

/// Installs the whole native library plus the literal and datatype words
/// into a fresh interpreter.
pub(crate) fn install(interp: &mut Interp) {
    // Literal words. `true`, `false`, and `none` are ordinary root bindings,
    // which keeps the reader free of keywords.
    let sym = interp.symbols.intern("true");
    interp.frames.bind_root(sym, Value::Logic(true));
    let sym = interp.symbols.intern("false");
    interp.frames.bind_root(sym, Value::Logic(false));
    let sym = interp.symbols.intern("none");
    interp.frames.bind_root(sym, Value::None);

    // First-class datatype words: `integer!`, `block!`, `object!`, ...
    for tag in <Tag as strum::IntoEnumIterator>::iter() {
        let sym = interp.symbols.intern(tag.into());
        interp.frames.bind_root(sym, Value::Datatype(tag));
    }

    math::install(interp);
    control::install(interp);
    core::install(interp);
    series::install(interp);
}
