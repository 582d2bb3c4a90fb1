#![forbid(unsafe_code)]

//! Ordered listener channels with isolated callbacks.
//!
//! # Design
//!
//! A [`ListenerRegistry<T>`] is one channel: callbacks taking `&T`, kept in
//! registration order in shared `Rc<RefCell<..>>` storage. Cloning the
//! registry creates another handle to the same channel.
//!
//! # Failure Modes
//!
//! - **Panicking callback**: caught per callback, logged at `warn`, and
//!   returned from [`notify`](ListenerRegistry::notify). Later callbacks
//!   still run.
//! - **Re-entrant registration**: a callback may register or unregister on
//!   the channel it is being notified from. The change takes effect on the
//!   next `notify`; the running pass works on a snapshot.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::error::TextBoxError;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique listener identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct Entry<T> {
    id: ListenerId,
    callback: Callback<T>,
}

/// A callback that panicked during [`ListenerRegistry::notify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub id: ListenerId,
    pub channel: &'static str,
    /// Panic payload, when it was a string.
    pub message: String,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on '{}' panicked: {}", self.id, self.channel, self.message)
    }
}

/// Ordered set of callbacks for one notification channel.
///
/// # Invariants
///
/// 1. Callbacks run in registration order.
/// 2. Ids are never reused, so unregistering twice is harmless.
/// 3. A panicking callback never prevents later callbacks from running.
pub struct ListenerRegistry<T> {
    channel: &'static str,
    entries: Rc<RefCell<Vec<Entry<T>>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for ListenerRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel,
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<T> fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("channel", &self.channel)
            .field("listeners", &self.entries.borrow().len())
            .finish()
    }
}

impl<T: 'static> ListenerRegistry<T> {
    /// Empty channel. `channel` names it in logs and errors.
    #[must_use]
    pub fn new(channel: &'static str) -> Self {
        Self {
            channel,
            entries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn channel(&self) -> &'static str {
        self.channel
    }

    /// Append `callback` to the channel.
    pub fn register(&self, callback: impl Fn(&T) + 'static) -> Registration {
        let id = ListenerId::next();
        self.entries.borrow_mut().push(Entry {
            id,
            callback: Rc::new(callback),
        });
        tracing::trace!(channel = self.channel, listener = %id, "listener registered");

        let weak: Weak<RefCell<Vec<Entry<T>>>> = Rc::downgrade(&self.entries);
        Registration {
            id,
            channel: self.channel,
            detach: Box::new(move |id| {
                let Some(entries) = weak.upgrade() else {
                    return false;
                };
                let mut entries = entries.borrow_mut();
                let before = entries.len();
                entries.retain(|entry| entry.id != id);
                entries.len() != before
            }),
        }
    }

    /// Register a callback that may be absent, as with dynamic bindings.
    ///
    /// # Errors
    ///
    /// [`TextBoxError::NotCallable`] when `callback` is `None`.
    pub fn try_register<F>(&self, callback: Option<F>) -> Result<Registration, TextBoxError>
    where
        F: Fn(&T) + 'static,
    {
        callback
            .map(|callback| self.register(callback))
            .ok_or(TextBoxError::NotCallable {
                channel: self.channel,
            })
    }

    /// Invoke every callback with `value`, in registration order.
    ///
    /// Returns the callbacks that panicked; each was already logged.
    pub fn notify(&self, value: &T) -> Vec<ListenerFailure> {
        let snapshot: SmallVec<[(ListenerId, Callback<T>); 4]> = self
            .entries
            .borrow()
            .iter()
            .map(|entry| (entry.id, Rc::clone(&entry.callback)))
            .collect();

        let mut failures = Vec::new();
        for (id, callback) in snapshot {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(value))) {
                let message = panic_message(payload.as_ref());
                tracing::warn!(
                    channel = self.channel,
                    listener = %id,
                    message = %message,
                    "listener panicked; continuing with remaining listeners"
                );
                failures.push(ListenerFailure {
                    id,
                    channel: self.channel,
                    message,
                });
            }
        }
        failures
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every callback.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}

/// Handle returned by [`ListenerRegistry::register`].
///
/// Dropping it does not unregister; call [`unregister`](Self::unregister).
pub struct Registration {
    id: ListenerId,
    channel: &'static str,
    detach: Box<dyn Fn(ListenerId) -> bool>,
}

impl Registration {
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    #[must_use]
    pub fn channel(&self) -> &'static str {
        self.channel
    }

    /// Remove the callback. Returns whether it was still registered.
    ///
    /// Idempotent, and a no-op once the registry itself is gone.
    pub fn unregister(&self) -> bool {
        (self.detach)(self.id)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
