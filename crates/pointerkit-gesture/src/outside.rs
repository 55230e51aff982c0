#![forbid(unsafe_code)]

//! Presses landing outside an element (dismissable popovers, menus).

use std::rc::Rc;

use pointerkit_backend::{ListenOptions, SharedHost};
use pointerkit_core::{DeviceEvent, ElementId, EventKind, EventTarget, Point};

use crate::teardown::{Teardown, listen_for_lifetime};
use crate::{Callback, emit};

/// Snapshot handed to `on_down_outside`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutsideInfo {
    /// Where the pointer went down.
    pub target: EventTarget,
    pub position: Point,
}

/// Callbacks for [`handle_outside`].
#[derive(Clone, Default)]
pub struct OutsideParams {
    pub on_down_outside: Option<Callback<OutsideInfo>>,
}

impl core::fmt::Debug for OutsideParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutsideParams")
            .field("has_callbacks", &self.has_callbacks())
            .finish()
    }
}

impl OutsideParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    callback_setters!(OutsideInfo; on_down_outside);

    #[must_use]
    pub fn has_callbacks(&self) -> bool {
        self.on_down_outside.is_some()
    }
}

struct Outside {
    host: SharedHost,
    element: ElementId,
    params: OutsideParams,
}

impl Outside {
    fn is_outside(&self, target: EventTarget) -> bool {
        match target {
            EventTarget::Element(node) => !self.host.contains(self.element, node),
            EventTarget::Document | EventTarget::Window => true,
        }
    }
}

fn on_document_pointer_down(outside: &Rc<Outside>, event: &DeviceEvent) {
    if !outside.is_outside(event.target) {
        return;
    }
    #[cfg(feature = "tracing")]
    tracing::trace!(message = "outside.down", element = outside.element.0);
    let info = OutsideInfo {
        target: event.target,
        position: event.client,
    };
    emit(&outside.params.on_down_outside, &info);
}

/// Report pointer downs that land outside `element` and its descendants.
pub fn handle_outside(host: &SharedHost, element: ElementId, params: OutsideParams) -> Teardown {
    let outside = Rc::new(Outside {
        host: SharedHost::clone(host),
        element,
        params,
    });
    let teardown = Teardown::new();
    listen_for_lifetime(
        host,
        &teardown,
        EventTarget::Document,
        EventKind::PointerDown,
        ListenOptions::PASSIVE,
        &outside,
        on_document_pointer_down,
    );
    teardown
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use pointerkit_core::Rect;
    use pointerkit_web::DeterministicHost;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_downs_outside_the_subtree_fire() {
        let web = Rc::new(DeterministicHost::new());
        let host: SharedHost = web.clone();
        let root = web.add_element(None, Rect::new(0.0, 0.0, 500.0, 500.0));
        let menu = web.add_element(Some(root), Rect::new(10.0, 10.0, 100.0, 100.0));
        let item = web.add_element(Some(menu), Rect::new(10.0, 10.0, 100.0, 20.0));
        let sibling = web.add_element(Some(root), Rect::new(200.0, 10.0, 50.0, 50.0));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s2 = seen.clone();
        let teardown = handle_outside(
            &host,
            menu,
            OutsideParams::new().on_down_outside(move |i| s2.borrow_mut().push(*i)),
        );

        for target in [menu, item] {
            web.dispatch(DeviceEvent::mouse(EventKind::PointerDown, target, 20.0, 20.0));
        }
        assert!(seen.borrow().is_empty());

        web.dispatch(DeviceEvent::mouse(EventKind::PointerDown, sibling, 210.0, 20.0));
        web.dispatch(DeviceEvent::mouse(
            EventKind::PointerDown,
            EventTarget::Document,
            600.0,
            600.0,
        ));
        assert_eq!(
            *seen.borrow(),
            vec![
                OutsideInfo {
                    target: EventTarget::Element(sibling),
                    position: Point::new(210.0, 20.0),
                },
                OutsideInfo {
                    target: EventTarget::Document,
                    position: Point::new(600.0, 600.0),
                },
            ]
        );

        teardown.destroy().unwrap();
        assert_eq!(web.listener_count(), 0);
    }

    #[test]
    fn window_level_downs_do_not_reach_document_listener() {
        let web = Rc::new(DeterministicHost::new());
        let host: SharedHost = web.clone();
        let el = web.add_element(None, Rect::new(0.0, 0.0, 10.0, 10.0));
        let count = Rc::new(RefCell::new(0));
        let c2 = count.clone();
        let _teardown = handle_outside(
            &host,
            el,
            OutsideParams::new().on_down_outside(move |_| *c2.borrow_mut() += 1),
        );
        web.dispatch(DeviceEvent::mouse(
            EventKind::PointerDown,
            EventTarget::Window,
            0.0,
            0.0,
        ));
        assert_eq!(*count.borrow(), 0);
    }
}
