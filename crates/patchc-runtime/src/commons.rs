//! Shared state visible to every node of one engine: named arrays and the
//! configure and frame events.

use std::collections::HashMap;

use crate::error::RuntimeError;
use crate::float::Float;
use crate::skeduler::{SkedId, Skeduler};

/// Event emitted once the engine is configured.
pub const ENGINE_CONFIGURE_EVENT: &str = "configure";

/// Arrays plus the three event domains of an engine.
pub struct Commons<F> {
    arrays: HashMap<String, Vec<F>>,
    arrays_skeduler: Skeduler,
    engine_skeduler: Skeduler,
    frame_skeduler: Skeduler,
}

impl<F: Float> Commons<F> {
    /// Empty commons.
    pub fn new() -> Self {
        Self {
            arrays: HashMap::new(),
            arrays_skeduler: Skeduler::unlogged(),
            engine_skeduler: Skeduler::logged(),
            frame_skeduler: Skeduler::unlogged(),
        }
    }

    /// Looks up an array by name.
    pub fn get_array(&self, name: &str) -> Result<&[F], RuntimeError> {
        self.arrays
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| RuntimeError::UnknownArray(name.to_owned()))
    }

    /// True if `name` is registered.
    pub fn has_array(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    /// Names of all registered arrays, sorted.
    pub fn array_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.arrays.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registers or replaces an array and notifies its subscribers.
    pub fn set_array(&mut self, name: &str, data: Vec<F>) {
        tracing::trace!(name, len = data.len(), "set array");
        self.arrays.insert(name.to_owned(), data);
        self.arrays_skeduler.emit(name);
    }

    /// Calls `callback` every time array `name` is set, and right away if it
    /// already exists.
    pub fn subscribe_array_changes(
        &mut self,
        name: &str,
        mut callback: impl FnMut(&str) + 'static,
    ) -> SkedId {
        if self.arrays.contains_key(name) {
            callback(name);
        }
        self.arrays_skeduler.subscribe(name, callback)
    }

    /// Stops an array subscription.
    pub fn cancel_array_changes_subscription(&mut self, id: SkedId) {
        self.arrays_skeduler.cancel(id);
    }

    /// Calls `callback` once the engine is configured, immediately if it already is.
    pub fn wait_engine_configure(&mut self, callback: impl FnOnce() + 'static) -> SkedId {
        self.engine_skeduler
            .wait(ENGINE_CONFIGURE_EVENT, move |_| callback())
    }

    /// Marks the engine as configured.
    pub fn emit_engine_configure(&mut self) {
        self.engine_skeduler.emit(ENGINE_CONFIGURE_EVENT);
    }

    /// Calls `callback` when frame `frame` starts. Past frames never fire.
    pub fn wait_frame(&mut self, frame: u64, callback: impl FnOnce() + 'static) -> SkedId {
        self.frame_skeduler
            .wait_future(&frame.to_string(), move |_| callback())
    }

    /// Cancels a frame wait.
    pub fn cancel_wait_frame(&mut self, id: SkedId) {
        self.frame_skeduler.cancel(id);
    }

    /// Fires the waits registered for `frame`.
    pub fn emit_frame(&mut self, frame: u64) {
        self.frame_skeduler.emit(&frame.to_string());
    }
}

impl<F: Float> Default for Commons<F> {
    fn default() -> Self {
        Self::new()
    }
}
