use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{EngineInstance, RenderEngine, RenderOptions, RenderTarget};

struct TargetState {
    id: u64,
    attached: Cell<bool>,
}

/// In-memory rendering target with explicit attach state.
///
/// Clones refer to the same element; two targets created with the same id
/// are still distinct elements.
#[derive(Clone)]
pub struct HeadlessTarget {
    state: Rc<TargetState>,
}

impl fmt::Debug for HeadlessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessTarget")
            .field("id", &self.state.id)
            .field("attached", &self.state.attached.get())
            .finish()
    }
}

impl HeadlessTarget {
    #[must_use]
    pub fn detached(id: u64) -> Self {
        Self {
            state: Rc::new(TargetState {
                id,
                attached: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn attached(id: u64) -> Self {
        let target = Self::detached(id);
        target.set_attached(true);
        target
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.state.id
    }

    pub fn set_attached(&self, attached: bool) {
        self.state.attached.set(attached);
    }
}

impl RenderTarget for HeadlessTarget {
    fn is_attached(&self) -> bool {
        self.state.attached.get()
    }

    fn same_target(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeadlessError {
    #[error("instance creation rejected for target {target}")]
    CreationRejected { target: u64 },

    #[error("option application rejected for target {target}")]
    OptionsRejected { target: u64 },
}

/// One engine-level call recorded by the headless engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineCall {
    Created { target: u64 },
    Applied { target: u64, options: RenderOptions },
    Resized { target: u64 },
    Disposed { target: u64 },
}

impl EngineCall {
    #[must_use]
    pub fn target(&self) -> u64 {
        match self {
            Self::Created { target }
            | Self::Applied { target, .. }
            | Self::Resized { target }
            | Self::Disposed { target } => *target,
        }
    }
}

#[derive(Default)]
struct EngineState {
    journal: RefCell<Vec<EngineCall>>,
    reject_creation: Cell<bool>,
    reject_options: Cell<bool>,
}

/// Engine stand-in used by tests and headless embedding.
///
/// Every creation, option application, resize, and disposal is appended to a
/// shared journal so callers can assert on exact engine traffic.
#[derive(Clone, Default)]
pub struct HeadlessEngine {
    state: Rc<EngineState>,
}

impl fmt::Debug for HeadlessEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessEngine")
            .field("calls", &self.call_count())
            .finish()
    }
}

impl HeadlessEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_creation(&self, reject: bool) {
        self.state.reject_creation.set(reject);
    }

    pub fn reject_options(&self, reject: bool) {
        self.state.reject_options.set(reject);
    }

    pub fn clear_journal(&self) {
        self.state.journal.borrow_mut().clear();
    }

    #[must_use]
    pub fn journal(&self) -> Vec<EngineCall> {
        self.state.journal.borrow().clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.journal.borrow().len()
    }

    #[must_use]
    pub fn calls_for(&self, target: u64) -> Vec<EngineCall> {
        self.state
            .journal
            .borrow()
            .iter()
            .filter(|call| call.target() == target)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn created_count(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Created { .. }))
    }

    #[must_use]
    pub fn resize_count(&self, target: u64) -> usize {
        self.count(|call| matches!(call, EngineCall::Resized { target: t } if *t == target))
    }

    /// Options applied to `target`, oldest first.
    #[must_use]
    pub fn applied_options(&self, target: u64) -> Vec<RenderOptions> {
        self.state
            .journal
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Applied { target: t, options } if *t == target => {
                    Some(options.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Every applied update for `target` merged in order, as the engine
    /// would hold it.
    #[must_use]
    pub fn merged_options(&self, target: u64) -> RenderOptions {
        self.applied_options(target)
            .iter()
            .fold(RenderOptions::empty(), |acc, next| acc.merged(next))
    }

    #[must_use]
    pub fn is_disposed(&self, target: u64) -> bool {
        self.count(|call| matches!(call, EngineCall::Disposed { target: t } if *t == target)) > 0
    }

    fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.state
            .journal
            .borrow()
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    fn record(&self, call: EngineCall) {
        self.state.journal.borrow_mut().push(call);
    }
}

impl RenderEngine for HeadlessEngine {
    type Target = HeadlessTarget;
    type Instance = HeadlessInstance;
    type Error = HeadlessError;

    fn create_instance(&self, target: &HeadlessTarget) -> Result<HeadlessInstance, HeadlessError> {
        if self.state.reject_creation.get() {
            return Err(HeadlessError::CreationRejected { target: target.id() });
        }
        self.record(EngineCall::Created { target: target.id() });
        Ok(HeadlessInstance {
            target: target.id(),
            engine: self.clone(),
            disposed: false,
        })
    }
}

#[derive(Debug)]
pub struct HeadlessInstance {
    target: u64,
    engine: HeadlessEngine,
    disposed: bool,
}

impl HeadlessInstance {
    #[must_use]
    pub fn target_id(&self) -> u64 {
        self.target
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl EngineInstance for HeadlessInstance {
    type Error = HeadlessError;

    fn apply_options(&mut self, options: &RenderOptions) -> Result<(), HeadlessError> {
        if self.engine.state.reject_options.get() {
            return Err(HeadlessError::OptionsRejected {
                target: self.target,
            });
        }
        self.engine.record(EngineCall::Applied {
            target: self.target,
            options: options.clone(),
        });
        Ok(())
    }

    fn resize(&mut self) -> Result<(), HeadlessError> {
        self.engine.record(EngineCall::Resized {
            target: self.target,
        });
        Ok(())
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.engine.record(EngineCall::Disposed {
                target: self.target,
            });
        }
    }
}
