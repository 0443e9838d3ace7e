//! Process-wide container, declaration and inspector.
//!
//! Libraries register their constructors here through [`declare`] so that the
//! work is deferred until the application calls [`run`] for the first time.
//!
//! ```rust,no_run
//! use kinit::{constructor, functor, global};
//! use std::rc::Rc;
//!
//! struct Greeting(&'static str);
//!
//! global::must_declare(|| global::provide(constructor(|()| Ok(Greeting("hello")))));
//!
//! global::must_run([functor(|(greeting,): (Rc<Greeting>,)| {
//!     println!("{}", greeting.0);
//!     Ok(())
//! })]);
//! ```

use crate::container::Container;
use crate::contract::{Constructor, Functor, Processor};
use crate::declaration::Declaration;
use crate::error::Error;
use crate::inspect::{InspectOptions, Inspector};
use crate::key::TypeKey;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

struct Global {
    container: Container,
    declaration: Declaration,
    inspector: Mutex<Inspector>,
}

fn global() -> &'static Global {
    static GLOBAL: OnceLock<Global> = OnceLock::new();
    GLOBAL.get_or_init(|| Global {
        container: Container::new(),
        declaration: Declaration::new(),
        inspector: Mutex::new(Inspector::new()),
    })
}

/// The global container. Clones share its registry.
pub fn container() -> &'static Container {
    &global().container
}

/// The global declaration.
pub fn declaration() -> &'static Declaration {
    &global().declaration
}

/// The global inspector, locked for the lifetime of the returned guard.
pub fn inspector() -> MutexGuard<'static, Inspector> {
    global()
        .inspector
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

pub fn provide<C>(constructor: C) -> Result<(), Error>
where
    C: Constructor + 'static,
{
    container().provide(constructor)
}

pub fn must_provide<C>(constructor: C)
where
    C: Constructor + 'static,
{
    container().must_provide(constructor);
}

pub fn attach<P>(processor: P) -> Result<(), Error>
where
    P: Processor + 'static,
{
    container().attach(processor)
}

pub fn must_attach<P>(processor: P)
where
    P: Processor + 'static,
{
    container().must_attach(processor);
}

/// Declares a function to call before the first global run.
pub fn declare<F>(function: F) -> Result<(), Error>
where
    F: FnOnce() -> Result<(), Error> + Send + 'static,
{
    declaration().declare(function)
}

pub fn must_declare<F>(function: F)
where
    F: FnOnce() -> Result<(), Error> + Send + 'static,
{
    declaration().must_declare(function);
}

pub fn require(key: TypeKey) -> Result<(), Error> {
    inspector().require(key).map(|_| ())
}

pub fn must_require(key: TypeKey) {
    inspector().must_require(key);
}

pub fn ignore(key: TypeKey) -> Result<(), Error> {
    inspector().ignore(key).map(|_| ())
}

pub fn must_ignore(key: TypeKey) {
    inspector().must_ignore(key);
}

/// Requires every parameter of `functor` on the global inspector.
pub fn consider(functor: &dyn Functor) -> Result<(), Error> {
    inspector().consider(functor).map(|_| ())
}

pub fn must_consider(functor: &dyn Functor) {
    inspector().must_consider(functor);
}

/// Inspects the global container with the global inspector. Pending
/// declarations are not fulfilled first, so call this after [`run`] or after
/// fulfilling [`declaration`] explicitly.
pub fn inspect(options: &InspectOptions) -> Result<(), Error> {
    inspector().inspect(container(), options)
}

pub fn must_inspect(options: &InspectOptions) {
    if let Err(e) = inspect(options) {
        panic!("{e}");
    }
}

/// Fulfills the global declaration if that has not happened yet, then runs
/// `functors` on the global container.
pub fn run<I>(functors: I) -> Result<(), Error>
where
    I: IntoIterator<Item = Box<dyn Functor>>,
{
    declaration().fulfill_pending()?;
    container().run(functors)
}

pub fn must_run<I>(functors: I)
where
    I: IntoIterator<Item = Box<dyn Functor>>,
{
    if let Err(e) = run(functors) {
        panic!("{e}");
    }
}
