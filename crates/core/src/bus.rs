//! In-process publish/subscribe for small, short-lived handlers such as
//! cache updates after a clone.

use crossbeam_channel::{select, Receiver, Sender};
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::domain::{Event, RepoClonedEvent, Topic};

pub const DEFAULT_CAPACITY: usize = 64;

type Handler = Box<dyn Fn(&Event) + Send + Sync>;
type Handlers = HashMap<Topic, Vec<Handler>>;

/// Event bus with one delivery thread.
///
/// Subscribe before [`EventBus::start`]. Events published before the start
/// queue up to the bus capacity and are delivered once the loop runs; past
/// that, `publish` blocks until there is room or the loop has stopped. Once
/// stopped, published events are dropped. Never publish from inside a handler.
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
    // fired when the delivery loop exits
    stopped: CancelToken,
    // `None` once the delivery loop owns the handlers
    handlers: Mutex<Option<Handlers>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let handlers = Topic::ALL.into_iter().map(|topic| (topic, Vec::new())).collect();
        Self {
            tx,
            rx,
            stopped: CancelToken::new(),
            handlers: Mutex::new(Some(handlers)),
        }
    }

    /// # Panics
    /// When called after [`EventBus::start`].
    pub fn subscribe(&self, topic: Topic, handler: impl Fn(&Event) + Send + Sync + 'static) {
        let mut guard = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handlers) = guard.as_mut() else {
            panic!("subscription to {} after the event bus started", topic.as_str());
        };
        handlers.entry(topic).or_default().push(Box::new(handler));
    }

    pub fn subscribe_repo_cloned(&self, handler: impl Fn(&RepoClonedEvent) + Send + Sync + 'static) {
        self.subscribe(Topic::RepoCloned, move |event| match event {
            Event::RepoCloned(cloned) => handler(cloned),
        });
    }

    pub fn publish(&self, event: Event) {
        let topic = event.topic().as_str();
        if self.stopped.is_cancelled() {
            warn!(topic, "event bus stopped, dropping event");
            return;
        }

        debug!(topic, "publishing event");
        select! {
            send(self.tx, event) -> sent => {
                if sent.is_err() {
                    // unreachable while the bus holds its own receiver
                    error!("event bus queue is closed");
                }
            }
            recv(self.stopped.channel()) -> _ => warn!(topic, "event bus stopped, dropping event"),
        }
    }

    /// Whether the delivery loop has exited
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    pub fn publish_repo_cloned(&self, event: RepoClonedEvent) {
        self.publish(Event::RepoCloned(event));
    }

    /// Number of events waiting for delivery
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Spawn the delivery loop. It stops when `cancel` fires; an event being
    /// dispatched finishes, the rest of the queue is left undelivered.
    ///
    /// # Panics
    /// When called a second time.
    pub fn start(&self, cancel: CancelToken) -> io::Result<JoinHandle<()>> {
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handlers) = handlers else {
            panic!("event bus already started");
        };

        let rx = self.rx.clone();
        let stopped = self.stopped.clone();
        let spawned = thread::Builder::new()
            .name("event-bus".to_string())
            .spawn(move || {
                run_loop(&rx, &handlers, &cancel);
                stopped.cancel();
            });
        if spawned.is_err() {
            self.stopped.cancel();
        }
        spawned
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn run_loop(rx: &Receiver<Event>, handlers: &Handlers, cancel: &CancelToken) {
    info!("Starting event bus");
    loop {
        select! {
            recv(cancel.channel()) -> _ => break,
            recv(rx) -> msg => {
                let Ok(event) = msg else { break };
                // both arms may be ready at once; cancellation wins
                if cancel.is_cancelled() {
                    break;
                }
                dispatch(handlers, &event);
            }
        }
    }
    info!("Event bus stopped");
}

fn dispatch(handlers: &Handlers, event: &Event) {
    let topic = event.topic();
    match handlers.get(&topic) {
        Some(listeners) if !listeners.is_empty() => {
            debug!(topic = topic.as_str(), listeners = listeners.len(), "event received");
            for handler in listeners {
                handler(event);
            }
        }
        _ => warn!(topic = topic.as_str(), "no subscribers"),
    }
}
