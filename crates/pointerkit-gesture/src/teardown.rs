#![forbid(unsafe_code)]

//! Registration teardown and dynamic listener bookkeeping.
//!
//! Every `handle_*` call returns a [`Teardown`]. Destroying it removes every
//! listener the registration owns and cancels its outstanding frame or timer.
//!
//! # Invariants
//!
//! 1. [`Teardown::destroy`] runs each release action at most once; a second
//!    call runs nothing.
//! 2. A [`ListenerSlot`] holds at most one registration; attaching replaces
//!    the previous one.
//! 3. No bookkeeping failure is dropped: each one reaches the caller of some
//!    `destroy`.
//!
//! # Failure Modes
//!
//! - The host does not know a listener id we registered → the first such
//!   [`PointerError::MissingRegistration`] is returned from `destroy` after
//!   the remaining actions ran.
//! - The same failure inside an event handler (a slot detached while a press
//!   ends) has no caller; the slot keeps it and its next release in
//!   `destroy` returns it.
//! - A release action added after `destroy` runs at once; its failure is
//!   returned by the next `destroy` call.
//!
//! # Design Notes
//!
//! Listeners capture the recognizer state, and the state holds the host, so a
//! registration keeps itself alive until it is destroyed. Dropping a
//! `Teardown` without calling `destroy` leaves the registration attached.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use pointerkit_backend::{Host, ListenOptions, Listener, ListenerId, SharedHost};
use pointerkit_core::{DeviceEvent, EventKind, EventTarget, PointerError};

type Release = Box<dyn FnOnce() -> Result<(), PointerError>>;

/// Idempotent release handle for one or more registrations.
#[derive(Default)]
pub struct Teardown {
    actions: RefCell<Vec<Release>>,
    destroyed: Cell<bool>,
    late_error: RefCell<Option<PointerError>>,
}

impl core::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Teardown")
            .field("pending", &self.actions.borrow().len())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl Teardown {
    /// An empty teardown.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A teardown running `release` once.
    #[must_use]
    pub fn from_fn(release: impl FnOnce() -> Result<(), PointerError> + 'static) -> Self {
        let teardown = Self::new();
        teardown.push(release);
        teardown
    }

    /// Add a release action. Added after `destroy`, it runs immediately.
    pub fn push(&self, release: impl FnOnce() -> Result<(), PointerError> + 'static) {
        if self.destroyed.get() {
            self.release_late(release());
            return;
        }
        self.actions.borrow_mut().push(Box::new(release));
    }

    fn release_late(&self, result: Result<(), PointerError>) {
        if let Err(err) = result {
            #[cfg(feature = "tracing")]
            tracing::error!(message = "teardown.late_release_failed", error = %err);
            self.late_error.borrow_mut().get_or_insert(err);
        }
    }

    /// Fold another teardown into this one.
    pub fn join(&self, other: Teardown) {
        if other.destroyed.get() {
            return;
        }
        let actions = other.actions.take();
        if self.destroyed.get() {
            for release in actions {
                self.release_late(release());
            }
            return;
        }
        self.actions.borrow_mut().extend(actions);
    }

    /// Whether `destroy` has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Release everything. Idempotent: later calls only report failures of
    /// actions added after the first one.
    pub fn destroy(&self) -> Result<(), PointerError> {
        if self.destroyed.replace(true) {
            return self.late_error.take().map_or(Ok(()), Err);
        }
        let actions = self.actions.take();
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "teardown.destroy", actions = actions.len());
        let mut first_error = None;
        for release in actions {
            if let Err(err) = release() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl FromIterator<Teardown> for Teardown {
    fn from_iter<I: IntoIterator<Item = Teardown>>(iter: I) -> Self {
        let combined = Teardown::new();
        for teardown in iter {
            combined.join(teardown);
        }
        combined
    }
}

/// Wrap a state-bound handler as a host [`Listener`].
pub(crate) fn bind<S: 'static>(state: &Rc<S>, handler: fn(&Rc<S>, &DeviceEvent)) -> Listener {
    let state = Rc::clone(state);
    Rc::new(move |event: &DeviceEvent| handler(&state, event))
}

/// Register a fixed listener and record its removal in `teardown`.
pub(crate) fn listen_for_lifetime<S: 'static>(
    host: &SharedHost,
    teardown: &Teardown,
    target: impl Into<EventTarget>,
    kind: EventKind,
    options: ListenOptions,
    state: &Rc<S>,
    handler: fn(&Rc<S>, &DeviceEvent),
) {
    let id = host.listen(target.into(), kind, options, bind(state, handler));
    let host = SharedHost::clone(host);
    teardown.push(move || host.unlisten(id));
}

/// A listener attached and detached at runtime, e.g. window-level move
/// tracking for the duration of a press.
#[derive(Debug, Default)]
pub(crate) struct ListenerSlot {
    id: Cell<Option<ListenerId>>,
    fault: RefCell<Option<PointerError>>,
}

impl ListenerSlot {
    pub(crate) fn is_attached(&self) -> bool {
        self.id.get().is_some()
    }

    pub(crate) fn attach(
        &self,
        host: &dyn Host,
        target: EventTarget,
        kind: EventKind,
        options: ListenOptions,
        listener: Listener,
    ) {
        self.detach_in_handler(host);
        self.id.set(Some(host.listen(target, kind, options, listener)));
    }

    fn unlisten(&self, host: &dyn Host) -> Result<(), PointerError> {
        match self.id.take() {
            Some(id) => host.unlisten(id),
            None => Ok(()),
        }
    }

    /// Detach if attached, reporting any failure kept by
    /// [`detach_in_handler`](Self::detach_in_handler) first.
    pub(crate) fn detach(&self, host: &dyn Host) -> Result<(), PointerError> {
        let result = self.unlisten(host);
        match self.fault.take() {
            Some(err) => Err(err),
            None => result,
        }
    }

    /// Detach from inside an event handler. A failure is kept for the next
    /// [`detach`](Self::detach).
    pub(crate) fn detach_in_handler(&self, host: &dyn Host) {
        if let Err(err) = self.unlisten(host) {
            #[cfg(feature = "tracing")]
            tracing::error!(message = "teardown.slot_out_of_sync", error = %err);
            self.fault.borrow_mut().get_or_insert(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointerkit_core::ElementId;
    use pointerkit_backend::EventSource;
    use pointerkit_web::DeterministicHost;

    #[test]
    fn destroy_runs_each_action_once() {
        let count = Rc::new(Cell::new(0));
        let teardown = Teardown::new();
        for _ in 0..3 {
            let count = Rc::clone(&count);
            teardown.push(move || {
                count.set(count.get() + 1);
                Ok(())
            });
        }
        assert!(teardown.destroy().is_ok());
        assert!(teardown.destroy().is_ok());
        assert_eq!(count.get(), 3);
        assert!(teardown.is_destroyed());
    }

    #[test]
    fn destroy_reports_first_error_but_runs_all() {
        let ran = Rc::new(Cell::new(0));
        let teardown = Teardown::new();
        teardown.push(|| Err(PointerError::MissingRegistration { resource: "listener", id: 1 }));
        teardown.push(|| Err(PointerError::MissingRegistration { resource: "listener", id: 2 }));
        let ran2 = Rc::clone(&ran);
        teardown.push(move || {
            ran2.set(1);
            Ok(())
        });
        assert_eq!(
            teardown.destroy(),
            Err(PointerError::MissingRegistration {
                resource: "listener",
                id: 1
            })
        );
        assert_eq!(ran.get(), 1);
        assert_eq!(teardown.destroy(), Ok(()));
    }

    #[test]
    fn late_release_failure_reaches_next_destroy() {
        let teardown = Teardown::new();
        teardown.destroy().unwrap();
        teardown.push(|| Err(PointerError::MissingRegistration { resource: "frame", id: 9 }));
        assert_eq!(
            teardown.destroy(),
            Err(PointerError::MissingRegistration {
                resource: "frame",
                id: 9
            })
        );
        assert_eq!(teardown.destroy(), Ok(()));
    }

    #[test]
    fn handler_detach_failure_is_kept_for_teardown() {
        let host = DeterministicHost::new();
        let slot = ListenerSlot::default();
        let noop: Listener = Rc::new(|_: &DeviceEvent| {});
        slot.attach(&host, EventTarget::Window, EventKind::MouseMove, ListenOptions::PASSIVE, noop);
        let id = host.listener_ids_for(EventTarget::Window, EventKind::MouseMove)[0];
        host.unlisten(id).unwrap();

        slot.detach_in_handler(&host);
        assert!(!slot.is_attached());
        assert_eq!(
            slot.detach(&host),
            Err(PointerError::MissingRegistration {
                resource: "listener",
                id: id.0
            })
        );
        assert_eq!(slot.detach(&host), Ok(()));
    }

    #[test]
    fn collected_teardowns_release_together() {
        let count = Rc::new(Cell::new(0));
        let combined: Teardown = (0..4)
            .map(|_| {
                let count = Rc::clone(&count);
                Teardown::from_fn(move || {
                    count.set(count.get() + 1);
                    Ok(())
                })
            })
            .collect();
        combined.destroy().unwrap();
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn push_after_destroy_releases_immediately() {
        let teardown = Teardown::new();
        teardown.destroy().unwrap();
        let ran = Rc::new(Cell::new(false));
        let ran2 = Rc::clone(&ran);
        teardown.push(move || {
            ran2.set(true);
            Ok(())
        });
        assert!(ran.get());
    }

    #[test]
    fn slot_replaces_previous_registration() {
        let host = DeterministicHost::new();
        let slot = ListenerSlot::default();
        let noop: Listener = Rc::new(|_: &DeviceEvent| {});
        let el = EventTarget::Element(ElementId(1));
        slot.attach(&host, el, EventKind::MouseMove, ListenOptions::PASSIVE, noop.clone());
        slot.attach(&host, el, EventKind::MouseMove, ListenOptions::PASSIVE, noop);
        assert_eq!(host.listener_count(), 1);
        assert!(slot.is_attached());
        slot.detach(&host).unwrap();
        slot.detach(&host).unwrap();
        assert_eq!(host.listener_count(), 0);
        assert!(!slot.is_attached());
    }

    #[test]
    fn lifetime_listener_removed_on_destroy() {
        let web = Rc::new(DeterministicHost::new());
        let host: SharedHost = web.clone();
        let teardown = Teardown::new();
        let state = Rc::new(Cell::new(0u32));
        listen_for_lifetime(
            &host,
            &teardown,
            EventTarget::Window,
            EventKind::MouseDown,
            ListenOptions::PASSIVE,
            &state,
            |s, _| s.set(s.get() + 1),
        );
        assert_eq!(web.listener_count(), 1);
        web.dispatch(DeviceEvent::mouse(
            EventKind::MouseDown,
            EventTarget::Window,
            0.0,
            0.0,
        ));
        assert_eq!(state.get(), 1);
        teardown.destroy().unwrap();
        assert_eq!(web.listener_count(), 0);
        assert!(host.unlisten(ListenerId(1)).is_err());
    }
}
