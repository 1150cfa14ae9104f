use crate::collection::ItemOptions;
use crate::errors::{CofferError, CofferResult, ErrorKind};
use crate::item::Item;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Points in an item's life where hooks run.
///
/// `DidCreate`, `DidLoad` and `DidChange` are emitted synchronously and only
/// accept synchronous hooks. The save and delete phases are awaited and run
/// both kinds of hooks in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    DidCreate,
    DidLoad,
    DidChange,
    WillSave,
    DidSave,
    WillDelete,
    DidDelete,
}

impl LifecyclePhase {
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            LifecyclePhase::WillSave
                | LifecyclePhase::DidSave
                | LifecyclePhase::WillDelete
                | LifecyclePhase::DidDelete
        )
    }
}

impl Display for LifecyclePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecyclePhase::DidCreate => "didCreate",
            LifecyclePhase::DidLoad => "didLoad",
            LifecyclePhase::DidChange => "didChange",
            LifecyclePhase::WillSave => "willSave",
            LifecyclePhase::DidSave => "didSave",
            LifecyclePhase::WillDelete => "willDelete",
            LifecyclePhase::DidDelete => "didDelete",
        };
        write!(f, "{}", name)
    }
}

pub type SyncHook = Arc<dyn Fn(&mut Item, &ItemOptions) -> CofferResult<()> + Send + Sync>;

pub type AsyncHook = Arc<
    dyn for<'a> Fn(&'a mut Item, &'a ItemOptions) -> BoxFuture<'a, CofferResult<()>>
        + Send
        + Sync,
>;

/// A registered lifecycle hook.
#[derive(Clone)]
pub enum Hook {
    Sync(SyncHook),
    Async(AsyncHook),
}

impl Hook {
    /// Wraps a synchronous hook.
    pub fn from_fn<F>(f: F) -> Hook
    where
        F: Fn(&mut Item, &ItemOptions) -> CofferResult<()> + Send + Sync + 'static,
    {
        Hook::Sync(Arc::new(f))
    }

    /// Wraps an asynchronous hook.
    pub fn from_async_fn<F>(f: F) -> Hook
    where
        F: for<'a> Fn(&'a mut Item, &'a ItemOptions) -> BoxFuture<'a, CofferResult<()>>
            + Send
            + Sync
            + 'static,
    {
        Hook::Async(Arc::new(f))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Hook::Async(_))
    }
}

impl Debug for Hook {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Hook::Sync(_) => write!(f, "Hook::Sync"),
            Hook::Async(_) => write!(f, "Hook::Async"),
        }
    }
}

/// Ordered hook lists per phase.
#[derive(Clone, Default, Debug)]
pub(crate) struct HookRegistry {
    hooks: HashMap<LifecyclePhase, Vec<Hook>>,
}

impl HookRegistry {
    pub(crate) fn register(&mut self, phase: LifecyclePhase, hook: Hook) -> CofferResult<()> {
        if hook.is_async() && !phase.is_async() {
            log::error!("Cannot register an asynchronous hook for {}", phase);
            return Err(CofferError::new(
                &format!("{} hooks must be synchronous", phase),
                ErrorKind::SchemaError,
            ));
        }
        self.hooks.entry(phase).or_default().push(hook);
        Ok(())
    }

    pub(crate) fn hooks(&self, phase: LifecyclePhase) -> Vec<Hook> {
        self.hooks.get(&phase).cloned().unwrap_or_default()
    }

    pub(crate) fn len(&self, phase: LifecyclePhase) -> usize {
        self.hooks.get(&phase).map(|h| h.len()).unwrap_or(0)
    }
}
