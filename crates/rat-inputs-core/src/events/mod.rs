//! Caller-owned registry of engine event callbacks.
//!
//! The channel to the engine ([`EventBridge`]) is opened on the first
//! registration and closed as soon as no callback of any kind remains.

use crate::domain::LayerModel;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Message,
    Plot,
    Progress,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Plot => "plot",
            Self::Progress => "progress",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotEventData {
    pub reflectivity: Vec<Vec<Vec<f64>>>,
    pub shifted_data: Vec<Vec<Vec<f64>>>,
    pub sld_profiles: Vec<Vec<Vec<f64>>>,
    pub resampled_layers: Vec<Vec<Vec<f64>>>,
    pub subroughs: Vec<f64>,
    pub data_present: Vec<bool>,
    pub model_type: LayerModel,
    pub contrast_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEventData {
    pub message: String,
    /// Fraction complete, 0 to 1.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    Message(String),
    Plot(PlotEventData),
    Progress(ProgressEventData),
}

impl EventData {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::Plot(_) => EventKind::Plot,
            Self::Progress(_) => EventKind::Progress,
        }
    }
}

/// Engine side of the event channel.
pub trait EventBridge: Send {
    /// Start forwarding events of `kind`.
    fn register(&mut self, kind: EventKind);
    /// Stop forwarding all events. The bridge is dropped right after.
    fn clear(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("no {kind} callback is registered with id {id}")]
    UnknownCallback { kind: EventKind, id: CallbackId },
    #[error("the event bridge could not be opened: {message}")]
    BridgeUnavailable { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl Display for CallbackId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type EventCallback = Box<dyn Fn(&EventData) + Send + Sync>;
pub type BridgeFactory = Box<dyn FnMut() -> Result<Box<dyn EventBridge>, EventError> + Send>;

pub struct EventRegistry {
    open_bridge: BridgeFactory,
    bridge: Option<Box<dyn EventBridge>>,
    callbacks: BTreeMap<EventKind, Vec<(CallbackId, EventCallback)>>,
    next_id: u64,
}

impl Debug for EventRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("bridge_open", &self.bridge.is_some())
            .field(
                "callbacks",
                &self
                    .callbacks
                    .iter()
                    .map(|(kind, entries)| (*kind, entries.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl EventRegistry {
    pub fn new<F>(open_bridge: F) -> Self
    where
        F: FnMut() -> Result<Box<dyn EventBridge>, EventError> + Send + 'static,
    {
        Self {
            open_bridge: Box::new(open_bridge),
            bridge: None,
            callbacks: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn is_bridge_open(&self) -> bool {
        self.bridge.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.values().all(Vec::is_empty)
    }

    /// Ids of the callbacks registered for `kind`, in registration order.
    pub fn callbacks(&self, kind: EventKind) -> Vec<CallbackId> {
        self.callbacks
            .get(&kind)
            .map(|entries| entries.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    pub fn register<F>(&mut self, kind: EventKind, callback: F) -> Result<CallbackId, EventError>
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        if self.bridge.is_none() {
            let bridge = (self.open_bridge)()?;
            debug!("opened event bridge");
            self.bridge = Some(bridge);
        }

        let entries = self.callbacks.entry(kind).or_default();
        if entries.is_empty()
            && let Some(bridge) = self.bridge.as_mut()
        {
            bridge.register(kind);
        }
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        entries.push((id, Box::new(callback)));
        Ok(id)
    }

    pub fn clear_callback(&mut self, kind: EventKind, id: CallbackId) -> Result<(), EventError> {
        let entries = self
            .callbacks
            .get_mut(&kind)
            .ok_or(EventError::UnknownCallback { kind, id })?;
        let position = entries
            .iter()
            .position(|(entry, _)| *entry == id)
            .ok_or(EventError::UnknownCallback { kind, id })?;
        let (_, callback) = entries.remove(position);
        drop(callback);
        self.close_if_empty();
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.callbacks.clear();
        self.close_if_empty();
    }

    /// Calls every callback registered for the event's kind.
    pub fn notify(&self, data: &EventData) {
        if let Some(entries) = self.callbacks.get(&data.kind()) {
            for (_, callback) in entries {
                callback(data);
            }
        }
    }

    fn close_if_empty(&mut self) {
        if !self.is_empty() {
            return;
        }
        if let Some(mut bridge) = self.bridge.take() {
            bridge.clear();
            debug!("closed event bridge");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CallbackId, EventBridge, EventData, EventError, EventKind, EventRegistry,
        ProgressEventData,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Journal {
        opened: usize,
        registered: Vec<EventKind>,
        cleared: usize,
    }

    struct RecordingBridge(Arc<Mutex<Journal>>);

    impl EventBridge for RecordingBridge {
        fn register(&mut self, kind: EventKind) {
            self.0.lock().expect("journal lock").registered.push(kind);
        }

        fn clear(&mut self) {
            self.0.lock().expect("journal lock").cleared += 1;
        }
    }

    fn registry() -> (EventRegistry, Arc<Mutex<Journal>>) {
        let journal = Arc::new(Mutex::new(Journal::default()));
        let shared = Arc::clone(&journal);
        let registry = EventRegistry::new(move || {
            shared.lock().expect("journal lock").opened += 1;
            Ok(Box::new(RecordingBridge(Arc::clone(&shared))) as Box<dyn EventBridge>)
        });
        (registry, journal)
    }

    #[test]
    fn bridge_opens_lazily_and_learns_each_kind_once() {
        let (mut registry, journal) = registry();
        assert!(!registry.is_bridge_open());

        registry
            .register(EventKind::Message, |_| {})
            .expect("register should succeed");
        registry
            .register(EventKind::Message, |_| {})
            .expect("register should succeed");
        registry
            .register(EventKind::Progress, |_| {})
            .expect("register should succeed");

        assert!(registry.is_bridge_open());
        let journal = journal.lock().expect("journal lock");
        assert_eq!(journal.opened, 1);
        assert_eq!(journal.registered, [EventKind::Message, EventKind::Progress]);
    }

    #[test]
    fn notify_reaches_callbacks_of_the_kind_in_order() {
        let (mut registry, _) = registry();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            registry
                .register(EventKind::Progress, move |data| {
                    if let EventData::Progress(progress) = data {
                        seen.lock()
                            .expect("seen lock")
                            .push(format!("{tag}:{}", progress.message));
                    }
                })
                .expect("register should succeed");
        }
        let messages = Arc::clone(&seen);
        registry
            .register(EventKind::Message, move |_| {
                messages.lock().expect("seen lock").push("message".to_string());
            })
            .expect("register should succeed");

        registry.notify(&EventData::Progress(ProgressEventData {
            message: "fitting".to_string(),
            percent: 0.5,
        }));
        assert_eq!(
            *seen.lock().expect("seen lock"),
            ["first:fitting", "second:fitting"]
        );
    }

    #[test]
    fn bridge_closes_when_the_last_callback_is_cleared() {
        let (mut registry, journal) = registry();
        let message = registry
            .register(EventKind::Message, |_| {})
            .expect("register should succeed");
        let plot = registry
            .register(EventKind::Plot, |_| {})
            .expect("register should succeed");

        registry
            .clear_callback(EventKind::Message, message)
            .expect("clear should succeed");
        assert!(registry.is_bridge_open());

        registry
            .clear_callback(EventKind::Plot, plot)
            .expect("clear should succeed");
        assert!(!registry.is_bridge_open());
        assert_eq!(journal.lock().expect("journal lock").cleared, 1);

        registry
            .register(EventKind::Plot, |_| {})
            .expect("register should reopen");
        assert_eq!(journal.lock().expect("journal lock").opened, 2);
        registry.clear_all();
        assert!(registry.is_empty());
        assert_eq!(journal.lock().expect("journal lock").cleared, 2);
    }

    #[test]
    fn cleared_callbacks_are_released() {
        let (mut registry, _) = registry();
        let captured = Arc::new(());
        let held = Arc::clone(&captured);
        let id = registry
            .register(EventKind::Message, move |_| {
                let _ = Arc::strong_count(&held);
            })
            .expect("register should succeed");
        assert_eq!(Arc::strong_count(&captured), 2);

        registry
            .clear_callback(EventKind::Message, id)
            .expect("clear should succeed");
        assert_eq!(Arc::strong_count(&captured), 1);
        assert!(registry.callbacks(EventKind::Message).is_empty());
    }

    #[test]
    fn clearing_unknown_callbacks_fails() {
        let (mut registry, _) = registry();
        let id = registry
            .register(EventKind::Message, |_| {})
            .expect("register should succeed");

        assert_eq!(
            registry.clear_callback(EventKind::Plot, id),
            Err(EventError::UnknownCallback {
                kind: EventKind::Plot,
                id,
            })
        );
        assert_eq!(
            registry
                .clear_callback(EventKind::Message, CallbackId(99))
                .map_err(|error| error.to_string()),
            Err("no message callback is registered with id 99".to_string())
        );
        assert_eq!(registry.callbacks(EventKind::Message), [id]);
    }

    #[test]
    fn failed_bridge_leaves_registry_empty() {
        let mut registry = EventRegistry::new(|| {
            Err(EventError::BridgeUnavailable {
                message: "engine not loaded".to_string(),
            })
        });
        assert!(registry.register(EventKind::Message, |_| {}).is_err());
        assert!(registry.is_empty());
        assert!(!registry.is_bridge_open());
    }
}
