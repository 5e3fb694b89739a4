// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod clock;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::error::ResourceError;

pub use clock::{ClockOptions, ClockResource};

/// A pending start of playback.
///
/// Resolves once the resource has actually begun playing, or with the reason
/// it could not. Dropping the future abandons the attempt.
pub type PlayAttempt = BoxFuture<'static, Result<(), ResourceError>>;

/// Lifecycle signals emitted by an audio resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvent {
    /// Playback started or resumed
    Started,
    /// Playback paused
    Paused,
    /// The playhead moved; read the new value from [`AudioResource::position`]
    TimeUpdate,
    /// The duration became known; read it from [`AudioResource::duration`]
    MetadataLoaded,
    /// Playback ran to the end of the source
    Ended,
}

/// Sending half of a resource's event subscription
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ResourceEvent>,
}

impl EventSink {
    /// Create a sink together with the receiver the controller listens on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResourceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: ResourceEvent) {
        // A closed channel only means the controller has stopped listening.
        let _ = self.tx.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Audio playback primitive driven by the controller.
///
/// The controller is the only owner of a resource; every mutation goes
/// through these methods.
pub trait AudioResource: Send {
    /// Start delivering lifecycle events to `events`
    fn attach(&mut self, events: EventSink);

    /// Stop delivering events and release background work
    fn detach(&mut self);

    /// Point the resource at a new source and begin loading it.
    ///
    /// Once this returns, no event belonging to the previous source may be
    /// emitted.
    fn load(&mut self, source: &str);

    /// Begin playback of the loaded source
    fn play(&mut self) -> PlayAttempt;

    fn pause(&mut self);

    /// Move the playhead, in seconds
    fn set_position(&mut self, seconds: f64);

    /// Current playhead, in seconds
    fn position(&self) -> f64;

    /// Total length in seconds, once metadata has resolved
    fn duration(&self) -> Option<f64>;

    /// The source currently loaded, if any
    fn source(&self) -> Option<&str>;
}
