// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The playback controller.
//!
//! A [`Controller`] owns one [`AudioResource`] and runs as a single task.
//! Consumers talk to it through cloneable [`PlayerHandle`]s: commands go in
//! over an mpsc channel, state comes out over a `watch` channel that any
//! number of observers can read without contention.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{PlayerError, ResourceError};
use crate::report::{PlayerEvent, SharedPlayerReporter};
use crate::resource::{AudioResource, EventSink, PlayAttempt, ResourceEvent};
use crate::state::PlaybackState;
use crate::track::{Track, TrackId};

/// Options for the playback controller
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    /// Number of commands that may queue before senders wait
    pub command_capacity: usize,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            command_capacity: 32,
        }
    }
}

#[derive(Debug)]
enum Command {
    PlayTrack(Track),
    Toggle,
    Pause,
    Seek(f64),
    Settle(oneshot::Sender<PlaybackState>),
    Shutdown,
}

/// A start attempt that has not resolved yet
struct PendingStart {
    track_id: TrackId,
    attempt: PlayAttempt,
}

/// Handle to a running controller
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<PlaybackState>,
}

impl PlayerHandle {
    /// Play `track`, or toggle it when it is already the current track.
    ///
    /// Returns once the request is queued; the outcome is observed through
    /// published state. A track without audio is logged and ignored.
    pub async fn play_track(&self, track: Track) -> Result<(), PlayerError> {
        self.send(Command::PlayTrack(track)).await
    }

    /// Pause when playing, otherwise resume the current track
    pub async fn toggle(&self) -> Result<(), PlayerError> {
        self.send(Command::Toggle).await
    }

    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.send(Command::Pause).await
    }

    /// Move the playback cursor, in seconds
    pub async fn seek(&self, seconds: f64) -> Result<(), PlayerError> {
        self.send(Command::Seek(seconds)).await
    }

    /// State after every previously sent command has been applied
    pub async fn settle(&self) -> Result<PlaybackState, PlayerError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Settle(tx)).await?;
        rx.await.map_err(|_| PlayerError::NotRunning)
    }

    /// Stop the controller; the resource is paused and detached
    pub async fn shutdown(&self) -> Result<(), PlayerError> {
        self.send(Command::Shutdown).await
    }

    /// The latest published state
    pub fn snapshot(&self) -> Result<PlaybackState, PlayerError> {
        self.ensure_running()?;
        Ok(self.state.borrow().clone())
    }

    /// A receiver notified on every state change
    pub fn subscribe(&self) -> Result<watch::Receiver<PlaybackState>, PlayerError> {
        self.ensure_running()?;
        Ok(self.state.clone())
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn ensure_running(&self) -> Result<(), PlayerError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(PlayerError::NotRunning)
        }
    }

    async fn send(&self, command: Command) -> Result<(), PlayerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlayerError::NotRunning)
    }
}

/// The playback state machine, owning its resource exclusively
pub struct Controller<R: AudioResource> {
    resource: R,
    state: watch::Sender<PlaybackState>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedReceiver<ResourceEvent>,
    pending: Option<PendingStart>,
    reporter: SharedPlayerReporter,
}

impl<R: AudioResource> Controller<R> {
    /// Create a controller and attach it to `resource`.
    ///
    /// Nothing happens until [`Controller::run`] is polled.
    pub fn new(
        mut resource: R,
        options: &PlayerOptions,
        reporter: SharedPlayerReporter,
    ) -> (Self, PlayerHandle) {
        let (command_tx, command_rx) = mpsc::channel(options.command_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(PlaybackState::default());
        let (sink, events) = EventSink::channel();

        resource.attach(sink);

        let controller = Self {
            resource,
            state: state_tx,
            commands: command_rx,
            events,
            pending: None,
            reporter,
        };
        let handle = PlayerHandle {
            commands: command_tx,
            state: state_rx,
        };

        (controller, handle)
    }

    /// Process commands and resource events until shut down or every
    /// handle is dropped
    pub async fn run(mut self) {
        tracing::debug!("Playback controller started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    // Signals that arrived before the command happened before it.
                    self.apply_queued_events();
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Some(event) = self.events.recv() => self.handle_resource_event(event),
                (track_id, result) = wait_for_start(&mut self.pending) => {
                    self.finish_start(track_id, result);
                }
            }
        }

        self.pending = None;
        self.resource.pause();
        self.resource.detach();
        tracing::debug!("Playback controller stopped");
    }

    /// Returns `false` when the controller should stop
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::PlayTrack(track) => self.play_track(track),
            Command::Toggle => self.toggle(),
            Command::Pause => self.pause(),
            Command::Seek(seconds) => self.seek(seconds),
            Command::Settle(reply) => {
                let _ = reply.send(self.state.borrow().clone());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn play_track(&mut self, track: Track) {
        if let Err(e) = track.audio_source() {
            tracing::warn!(track_id = %track.id, error = %e, "Rejected play request");
            self.reporter.report(PlayerEvent::TrackRejected {
                reason: e.to_string(),
            });
            return;
        }

        let is_current = self.state.borrow().current_id() == Some(&track.id);
        if is_current {
            self.toggle();
        } else {
            self.load_track(track);
        }
    }

    fn load_track(&mut self, track: Track) {
        let Ok(source) = track.audio_source().map(String::from) else {
            return;
        };

        tracing::info!(track_id = %track.id, title = %track.title, "Loading new track");

        let track_id = track.id.clone();
        let title = track.title.clone();

        // Metadata goes out before the resource is touched.
        self.publish(|state| {
            state.current_track = Some(track);
            state.ended = false;
            state.is_playing = false;
            state.position = 0.0;
            state.duration = 0.0;
            state.loading = true;
        });
        self.reporter
            .report(PlayerEvent::TrackLoading { track_id: track_id.clone(), title });

        self.pending = None;
        self.resource.pause();
        self.discard_queued_events();
        self.resource.load(&source);
        self.begin_start(track_id);
    }

    fn toggle(&mut self) {
        let (is_playing, current) = {
            let state = self.state.borrow();
            (state.is_playing, state.current_track.clone())
        };

        let Some(track) = current else {
            tracing::debug!("Toggle requested with no track loaded");
            return;
        };

        if is_playing {
            self.pause();
            return;
        }

        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.track_id == track.id)
        {
            tracing::debug!(track_id = %track.id, "Start already in flight");
            return;
        }

        // The resource may have lost its source since the track was loaded.
        if let Ok(source) = track.audio_source()
            && self.resource.source() != Some(source)
        {
            tracing::info!(track_id = %track.id, "Reloading lost source before resuming");
            self.discard_queued_events();
            self.resource.load(source);
        }

        self.publish(|state| {
            state.ended = false;
            state.loading = true;
        });
        self.begin_start(track.id);
    }

    fn begin_start(&mut self, track_id: TrackId) {
        let attempt = self.resource.play();
        self.pending = Some(PendingStart { track_id, attempt });
    }

    fn finish_start(&mut self, track_id: TrackId, result: Result<(), ResourceError>) {
        self.pending = None;

        if self.state.borrow().current_id() != Some(&track_id) {
            tracing::debug!(track_id = %track_id, "Ignoring start of superseded track");
            return;
        }

        match result {
            Ok(()) => {
                tracing::debug!(track_id = %track_id, "Playback started");
                self.publish(|state| {
                    state.is_playing = true;
                    state.ended = false;
                    state.loading = false;
                });
                self.reporter.report(PlayerEvent::PlaybackStarted { track_id });
            }
            Err(e) => {
                tracing::error!(track_id = %track_id, error = %e, "Audio play error");
                self.publish(|state| {
                    state.is_playing = false;
                    state.loading = false;
                });
                self.reporter.report(PlayerEvent::PlaybackFailed {
                    track_id,
                    error: e.to_string(),
                });
            }
        }
    }

    fn pause(&mut self) {
        self.pending = None;
        self.resource.pause();
        self.publish(|state| {
            state.is_playing = false;
            state.loading = false;
        });

        let track_id = self.state.borrow().current_id().cloned();
        self.reporter.report(PlayerEvent::PlaybackPaused { track_id });
    }

    fn seek(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            tracing::warn!(seconds, "Rejected seek to a non-finite position");
            return;
        }

        let (loaded, duration) = {
            let state = self.state.borrow();
            (state.current_track.is_some(), state.duration)
        };
        if !loaded {
            tracing::debug!(seconds, "Seek requested with no track loaded");
            return;
        }

        let mut position = seconds.max(0.0);
        if duration > 0.0 {
            position = position.min(duration);
        }

        self.resource.set_position(position);
        self.publish(|state| state.position = position);
        self.reporter.report(PlayerEvent::Seeked { position });
    }

    fn handle_resource_event(&mut self, event: ResourceEvent) {
        match event {
            ResourceEvent::Started => self.publish(|state| {
                state.is_playing = true;
                state.ended = false;
            }),
            ResourceEvent::Paused => self.publish(|state| state.is_playing = false),
            ResourceEvent::TimeUpdate => {
                let position = self.resource.position();
                self.publish(|state| state.position = position);
            }
            ResourceEvent::MetadataLoaded => {
                let duration = self
                    .resource
                    .duration()
                    .filter(|d| d.is_finite() && *d >= 0.0)
                    .unwrap_or(0.0);
                self.publish(|state| state.duration = duration);
            }
            ResourceEvent::Ended => {
                self.pending = None;
                self.publish(|state| {
                    state.is_playing = false;
                    state.ended = true;
                    state.loading = false;
                });

                let track_id = self.state.borrow().current_id().cloned();
                tracing::info!(track_id = ?track_id, "Playback ended");
                self.reporter.report(PlayerEvent::PlaybackEnded { track_id });
            }
        }
    }

    fn apply_queued_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_resource_event(event);
        }
    }

    /// Drop signals still queued from a source that is being replaced
    fn discard_queued_events(&mut self) {
        while self.events.try_recv().is_ok() {}
    }

    /// Apply `update` and notify subscribers if anything changed
    fn publish(&self, update: impl FnOnce(&mut PlaybackState)) {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            update(state);
            *state != before
        });
    }
}

async fn wait_for_start(pending: &mut Option<PendingStart>) -> (TrackId, Result<(), ResourceError>) {
    match pending {
        Some(pending) => {
            let result = (&mut pending.attempt).await;
            (pending.track_id.clone(), result)
        }
        None => std::future::pending().await,
    }
}

/// Spawn a controller for `resource` on the current tokio runtime
pub fn spawn_player<R>(
    resource: R,
    options: &PlayerOptions,
    reporter: SharedPlayerReporter,
) -> (PlayerHandle, JoinHandle<()>)
where
    R: AudioResource + 'static,
{
    let (controller, handle) = Controller::new(resource, options, reporter);
    let task = tokio::spawn(controller.run());
    (handle, task)
}
