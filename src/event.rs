//! One-to-one named event channel between a node and an observer.
//!
//! A [`Speaker`] holds at most one [`Listener`]. Declaring an event calls that
//! listener synchronously; with no listener the event is dropped. The speaker
//! only keeps a weak handle, so a listener going away silently detaches it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::tree::NodeId;

/// Fired by every updatable node at the end of its own per-frame update.
pub const UPDATED: &str = "updated";

/// Fired by node kinds that turn a button release into a click.
pub const CLICK: &str = "click";

/// Observer of named events declared by a [`Speaker`].
pub trait Listener {
    fn on_event(&mut self, speaker: NodeId, name: &str);
}

impl<F: FnMut(NodeId, &str)> Listener for F {
    fn on_event(&mut self, speaker: NodeId, name: &str) {
        self(speaker, name)
    }
}

/// Shared handle through which listeners are registered.
pub type ListenerHandle = Rc<RefCell<dyn Listener>>;

#[derive(Default)]
pub struct Speaker {
    listener: Option<Weak<RefCell<dyn Listener>>>,
}

impl Speaker {
    pub fn new() -> Self {
        Self { listener: None }
    }

    /// Replace the current listener. `None` clears it.
    pub fn set_listener(&mut self, listener: Option<&ListenerHandle>) {
        self.listener = listener.map(Rc::downgrade);
    }

    pub fn has_listener(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| listener.strong_count() > 0)
    }

    /// Notify the listener, if any, that `source` declared `name`.
    pub fn declare_event(&self, source: NodeId, name: &str) {
        let Some(listener) = self.listener.as_ref().and_then(Weak::upgrade) else {
            return;
        };

        // A listener declaring into itself would need a second mutable borrow.
        match listener.try_borrow_mut() {
            Ok(mut listener) => listener.on_event(source, name),
            Err(_) => log::warn!("Dropped re-entrant event {name:?} from {source:?}"),
        };
    }
}

impl std::fmt::Debug for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Speaker")
            .field("has_listener", &self.has_listener())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Panel;
    use crate::tree::Tree;

    fn recorder() -> (Rc<RefCell<Vec<(NodeId, String)>>>, ListenerHandle) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let listener: ListenerHandle = Rc::new(RefCell::new(move |id: NodeId, name: &str| {
            sink.borrow_mut().push((id, name.to_string()));
        }));
        (events, listener)
    }

    fn some_id() -> NodeId {
        Tree::new().insert(Panel::new(1.0, 1.0))
    }

    #[test]
    fn test_no_listener_is_noop() {
        let speaker = Speaker::new();
        assert!(!speaker.has_listener());
        speaker.declare_event(some_id(), UPDATED);
    }

    #[test]
    fn test_declare_reaches_listener() {
        let (events, listener) = recorder();
        let mut speaker = Speaker::new();
        speaker.set_listener(Some(&listener));

        let id = some_id();
        speaker.declare_event(id, UPDATED);
        speaker.declare_event(id, CLICK);

        assert_eq!(
            *events.borrow(),
            vec![(id, UPDATED.to_string()), (id, CLICK.to_string())]
        );
    }

    #[test]
    fn test_replacing_listener() {
        let (first_events, first) = recorder();
        let (second_events, second) = recorder();
        let mut speaker = Speaker::new();

        speaker.set_listener(Some(&first));
        speaker.set_listener(Some(&second));
        speaker.declare_event(some_id(), UPDATED);

        assert!(first_events.borrow().is_empty());
        assert_eq!(second_events.borrow().len(), 1);

        speaker.set_listener(None);
        speaker.declare_event(some_id(), UPDATED);
        assert_eq!(second_events.borrow().len(), 1);
    }

    #[test]
    fn test_dropped_listener_detaches() {
        let (events, listener) = recorder();
        let mut speaker = Speaker::new();
        speaker.set_listener(Some(&listener));
        drop(listener);

        assert!(!speaker.has_listener());
        speaker.declare_event(some_id(), UPDATED);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_busy_listener_drops_event() {
        let (events, listener) = recorder();
        let mut speaker = Speaker::new();
        speaker.set_listener(Some(&listener));

        let busy = listener.borrow_mut();
        speaker.declare_event(some_id(), UPDATED);
        drop(busy);

        assert!(events.borrow().is_empty());
        speaker.declare_event(some_id(), UPDATED);
        assert_eq!(events.borrow().len(), 1);
    }
}
