//! Named-event scheduler.
//!
//! A [`Skeduler`] maps event names to callbacks. One-shot requests
//! ([`Skeduler::wait`], [`Skeduler::wait_future`]) fire once and are dropped;
//! subscriptions ([`Skeduler::subscribe`]) fire on every emit until cancelled.
//!
//! In logged mode the skeduler remembers every event it has emitted, so a
//! `wait` on an event that already happened resolves immediately. This is how
//! "engine configured" works: nodes that ask after configuration still get
//! called. `wait_future` never looks at the log, which is what per-frame
//! events need.
//!
//! Within one [`emit`](Skeduler::emit), one-shot requests fire before
//! subscriptions, each group in registration order.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Handle returned by every registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkedId(pub u32);

impl SkedId {
    /// Nothing was registered (the callback already ran).
    pub const NULL: SkedId = SkedId(0);

    /// True for [`SkedId::NULL`].
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SkedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-shot callback.
pub type RequestCallback = Box<dyn FnOnce(&str)>;

/// Persistent callback.
pub type SubscriptionCallback = Box<dyn FnMut(&str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registration {
    Request,
    Subscription,
}

/// Event scheduler owned by one engine instance.
pub struct Skeduler {
    logging: bool,
    event_log: HashSet<String>,
    requests: HashMap<String, Vec<(SkedId, RequestCallback)>>,
    subscriptions: HashMap<String, Vec<(SkedId, SubscriptionCallback)>>,
    registered: HashMap<SkedId, (String, Registration)>,
    next_id: u32,
}

impl Skeduler {
    /// Creates a skeduler. With `logging`, emitted events are remembered.
    pub fn new(logging: bool) -> Self {
        Self {
            logging,
            event_log: HashSet::new(),
            requests: HashMap::new(),
            subscriptions: HashMap::new(),
            registered: HashMap::new(),
            next_id: 1,
        }
    }

    /// Skeduler that remembers past events.
    pub fn logged() -> Self {
        Self::new(true)
    }

    /// Skeduler that only ever sees future events.
    pub fn unlogged() -> Self {
        Self::new(false)
    }

    /// True if this skeduler keeps an event log.
    pub fn is_logging(&self) -> bool {
        self.logging
    }

    /// True if `event` was emitted already (always false when not logging).
    pub fn has_event(&self, event: &str) -> bool {
        self.event_log.contains(event)
    }

    /// Number of one-shot requests waiting on `event`.
    pub fn pending_count(&self, event: &str) -> usize {
        self.requests.get(event).map_or(0, Vec::len)
    }

    /// Calls `callback` once, the next time `event` is emitted.
    ///
    /// In logged mode, if `event` already happened, the callback runs now and
    /// [`SkedId::NULL`] is returned.
    pub fn wait(&mut self, event: &str, callback: impl FnOnce(&str) + 'static) -> SkedId {
        if self.logging && self.event_log.contains(event) {
            callback(event);
            return SkedId::NULL;
        }
        self.wait_future(event, callback)
    }

    /// Calls `callback` once, the next time `event` is emitted, ignoring the log.
    pub fn wait_future(&mut self, event: &str, callback: impl FnOnce(&str) + 'static) -> SkedId {
        let id = self.register(event, Registration::Request);
        self.requests
            .entry(event.to_owned())
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Calls `callback` on every emit of `event` until cancelled.
    pub fn subscribe(&mut self, event: &str, callback: impl FnMut(&str) + 'static) -> SkedId {
        let id = self.register(event, Registration::Subscription);
        self.subscriptions
            .entry(event.to_owned())
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Fires `event`.
    pub fn emit(&mut self, event: &str) {
        if self.logging {
            self.event_log.insert(event.to_owned());
        }

        if let Some(requests) = self.requests.remove(event) {
            tracing::trace!(event, count = requests.len(), "resolving requests");
            for (id, callback) in requests {
                self.registered.remove(&id);
                callback(event);
            }
        }

        if let Some(subscriptions) = self.subscriptions.get_mut(event) {
            for (_, callback) in subscriptions.iter_mut() {
                callback(event);
            }
        }
    }

    /// Removes a pending request or a subscription.
    ///
    /// Unknown ids, ids that already fired and [`SkedId::NULL`] are ignored.
    pub fn cancel(&mut self, id: SkedId) {
        let Some((event, registration)) = self.registered.remove(&id) else {
            return;
        };
        match registration {
            Registration::Request => {
                if let Some(requests) = self.requests.get_mut(&event) {
                    requests.retain(|(other, _)| *other != id);
                    if requests.is_empty() {
                        self.requests.remove(&event);
                    }
                }
            }
            Registration::Subscription => {
                if let Some(subscriptions) = self.subscriptions.get_mut(&event) {
                    subscriptions.retain(|(other, _)| *other != id);
                    if subscriptions.is_empty() {
                        self.subscriptions.remove(&event);
                    }
                }
            }
        }
    }

    fn register(&mut self, event: &str, registration: Registration) -> SkedId {
        let id = SkedId(self.next_id);
        self.next_id += 1;
        self.registered.insert(id, (event.to_owned(), registration));
        id
    }
}

impl Default for Skeduler {
    fn default() -> Self {
        Self::logged()
    }
}

impl fmt::Debug for Skeduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skeduler")
            .field("logging", &self.logging)
            .field("event_log", &self.event_log)
            .field("registered", &self.registered.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut(&str)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = Rc::clone(&log);
        let make = move |tag: &str| -> Box<dyn FnMut(&str)> {
            let log = Rc::clone(&handle);
            let tag = tag.to_owned();
            Box::new(move |event: &str| log.borrow_mut().push(format!("{tag}:{event}")))
        };
        (log, make)
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut sked = Skeduler::logged();
        let a = sked.wait("e", |_| {});
        let b = sked.subscribe("e", |_| {});
        assert_eq!(a, SkedId(1));
        assert_eq!(b, SkedId(2));
        assert!(!a.is_null());
    }

    #[test]
    fn requests_fire_before_subscriptions() {
        let (log, make) = recorder();
        let mut sked = Skeduler::unlogged();
        sked.subscribe("e", make("sub"));
        let mut once = make("req");
        sked.wait("e", move |e| once(e));
        sked.emit("e");
        assert_eq!(*log.borrow(), vec!["req:e", "sub:e"]);
    }

    #[test]
    fn subscriptions_keep_firing_until_cancelled() {
        let (log, make) = recorder();
        let mut sked = Skeduler::unlogged();
        let id = sked.subscribe("tick", make("a"));
        sked.emit("tick");
        sked.emit("tick");
        sked.cancel(id);
        sked.emit("tick");
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn subscribe_never_fires_on_registration() {
        let (log, make) = recorder();
        let mut sked = Skeduler::logged();
        sked.emit("e");
        sked.subscribe("e", make("late"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unlogged_wait_does_not_see_the_past() {
        let (log, make) = recorder();
        let mut sked = Skeduler::unlogged();
        sked.emit("e");
        let mut cb = make("w");
        let id = sked.wait("e", move |e| cb(e));
        assert!(!id.is_null());
        assert!(log.borrow().is_empty());
        assert!(!sked.has_event("e"));
    }

    #[test]
    fn other_events_are_untouched() {
        let (log, make) = recorder();
        let mut sked = Skeduler::unlogged();
        let mut cb = make("x");
        sked.wait("a", move |e| cb(e));
        sked.emit("b");
        assert!(log.borrow().is_empty());
        assert_eq!(sked.pending_count("a"), 1);
    }

    #[test]
    fn cancel_null_is_noop() {
        let mut sked = Skeduler::default();
        sked.cancel(SkedId::NULL);
        sked.cancel(SkedId(42));
        assert!(sked.is_logging());
    }
}
