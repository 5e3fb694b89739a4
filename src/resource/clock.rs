use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

use crate::error::ResourceError;

use super::{AudioResource, EventSink, PlayAttempt, ResourceEvent};

const SUPPORTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// Options for the clock resource
#[derive(Debug, Clone)]
pub struct ClockOptions {
    /// Interval between time updates while playing
    pub tick: Duration,
    /// Simulated latency between a play request and the actual start
    pub start_delay: Duration,
}

impl Default for ClockOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            start_delay: Duration::ZERO,
        }
    }
}

/// A headless audio resource.
///
/// Advances a playhead in real time without decoding or producing sound.
/// Durations are registered per source up front; sources without one play
/// until paused.
pub struct ClockResource {
    options: ClockOptions,
    durations: HashMap<String, f64>,
    events: Option<EventSink>,
    source: Option<String>,
    duration: Option<f64>,
    /// Playhead at `anchor`, or the frozen playhead while stopped
    offset: f64,
    /// Instant the playhead started (or will start) moving from `offset`
    anchor: Option<Instant>,
    ticker: Option<JoinHandle<()>>,
    /// Bumped whenever the ticker stops; a ticker only emits while its
    /// generation is current
    generation: Arc<Mutex<u64>>,
}

impl ClockResource {
    pub fn new(options: ClockOptions) -> Self {
        Self {
            options,
            durations: HashMap::new(),
            events: None,
            source: None,
            duration: None,
            offset: 0.0,
            anchor: None,
            ticker: None,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    /// Register the length of a source, in seconds
    pub fn register_duration(&mut self, source: impl Into<String>, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.durations.insert(source.into(), seconds);
        }
    }

    fn emit(&self, event: ResourceEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    fn is_running(&self) -> bool {
        self.anchor.is_some() && !self.is_finished()
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.duration else {
            return false;
        };

        match self.anchor {
            Some(anchor) => Instant::now() >= end_of(anchor, self.offset, duration),
            None => self.offset >= duration,
        }
    }

    fn stop_ticker(&mut self) {
        // Aborting is not synchronous on a multi-thread runtime; retiring the
        // generation silences a ticker that is already past its await point.
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Freeze the playhead where it is
    fn freeze(&mut self) {
        self.offset = self.position();
        self.anchor = None;
        self.stop_ticker();
    }

    fn start_ticker(&mut self, start: Instant) {
        self.stop_ticker();
        if let Some(events) = self.events.clone() {
            let emitter = TickEmitter {
                generation: *self.generation.lock().unwrap_or_else(PoisonError::into_inner),
                current: Arc::clone(&self.generation),
                events,
            };
            self.ticker = Some(tokio::spawn(run_ticker(
                emitter,
                start,
                self.offset,
                self.duration,
                self.options.tick,
            )));
        }
    }
}

impl Default for ClockResource {
    fn default() -> Self {
        Self::new(ClockOptions::default())
    }
}

impl Drop for ClockResource {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

impl AudioResource for ClockResource {
    fn attach(&mut self, events: EventSink) {
        self.events = Some(events);
    }

    fn detach(&mut self) {
        self.freeze();
        self.events = None;
    }

    fn load(&mut self, source: &str) {
        self.stop_ticker();
        self.anchor = None;
        self.offset = 0.0;
        self.source = Some(source.to_string());
        self.duration = self.durations.get(source).copied();
        self.emit(ResourceEvent::MetadataLoaded);
    }

    fn play(&mut self) -> PlayAttempt {
        let Some(source) = self.source.clone() else {
            return futures::future::ready(Err(ResourceError::NoSource)).boxed();
        };

        if let Err(e) = check_source(&source) {
            return futures::future::ready(Err(e)).boxed();
        }

        if self.is_running() {
            return futures::future::ready(Ok(())).boxed();
        }

        if self.is_finished() {
            self.offset = 0.0;
            self.emit(ResourceEvent::TimeUpdate);
        }

        let start = Instant::now() + self.options.start_delay;
        self.anchor = Some(start);
        self.start_ticker(start);

        let events = self.events.clone();
        async move {
            tokio::time::sleep_until(start).await;
            if let Some(events) = events {
                events.emit(ResourceEvent::Started);
            }
            Ok(())
        }
        .boxed()
    }

    fn pause(&mut self) {
        let was_running = self.is_running();
        self.freeze();
        if was_running {
            self.emit(ResourceEvent::Paused);
        }
    }

    fn set_position(&mut self, seconds: f64) {
        if self.source.is_none() {
            return;
        }

        let mut seconds = seconds.max(0.0);
        if let Some(duration) = self.duration {
            seconds = seconds.min(duration);
        }

        // A start still waiting out its delay keeps its start instant.
        let resume_at = self
            .anchor
            .filter(|_| self.is_running())
            .map(|anchor| anchor.max(Instant::now()));

        self.freeze();
        self.offset = seconds;

        if let Some(start) = resume_at {
            self.anchor = Some(start);
            self.start_ticker(start);
        }

        self.emit(ResourceEvent::TimeUpdate);
    }

    fn position(&self) -> f64 {
        if let Some(duration) = self.duration.filter(|_| self.is_finished()) {
            return duration;
        }

        let position = match self.anchor {
            Some(anchor) => {
                self.offset + Instant::now().saturating_duration_since(anchor).as_secs_f64()
            }
            None => self.offset,
        };

        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

fn check_source(source: &str) -> Result<(), ResourceError> {
    let url = Url::parse(source).map_err(|e| ResourceError::UnsupportedSource {
        source_url: source.to_string(),
        reason: e.to_string(),
    })?;

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(ResourceError::UnsupportedSource {
            source_url: source.to_string(),
            reason: format!("scheme '{}' is not supported", url.scheme()),
        });
    }

    if url.scheme() == "file" {
        let exists = url.to_file_path().is_ok_and(|path| path.is_file());
        if !exists {
            return Err(ResourceError::StartFailed {
                source_url: source.to_string(),
                reason: "file not found".to_string(),
            });
        }
    }

    Ok(())
}

/// Instant a playhead moving from `offset` at `start` reaches `duration`
fn end_of(start: Instant, offset: f64, duration: f64) -> Instant {
    start + Duration::from_secs_f64((duration - offset).max(0.0))
}

/// Event sink of one ticker, muted once its generation is retired
struct TickEmitter {
    generation: u64,
    current: Arc<Mutex<u64>>,
    events: EventSink,
}

impl TickEmitter {
    fn emit(&self, event: ResourceEvent) -> bool {
        // Held across the send so a retirement cannot slip in between.
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != self.generation {
            return false;
        }
        self.events.emit(event);
        true
    }
}

/// Emit time updates every `tick` from `start`, and the end signal once the
/// playhead reaches `duration`
async fn run_ticker(
    events: TickEmitter,
    start: Instant,
    offset: f64,
    duration: Option<f64>,
    tick: Duration,
) {
    let end = duration.map(|duration| end_of(start, offset, duration));

    let finish = async move {
        match end {
            Some(end) => tokio::time::sleep_until(end).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(finish);

    let mut interval = tokio::time::interval_at(start + tick, tick);

    loop {
        tokio::select! {
            _ = &mut finish => {
                if events.emit(ResourceEvent::TimeUpdate) {
                    events.emit(ResourceEvent::Ended);
                }
                return;
            }
            _ = interval.tick() => {
                if !events.emit(ResourceEvent::TimeUpdate) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    const SOURCE: &str = "https://example.com/episode.mp3";

    fn attached(options: ClockOptions) -> (ClockResource, UnboundedReceiver<ResourceEvent>) {
        let (sink, rx) = EventSink::channel();
        let mut resource = ClockResource::new(options);
        resource.register_duration(SOURCE, 10.0);
        resource.attach(sink);
        (resource, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ResourceEvent>) -> Vec<ResourceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn load_reports_registered_duration() {
        let (mut resource, mut rx) = attached(ClockOptions::default());

        resource.load(SOURCE);

        assert_eq!(resource.duration(), Some(10.0));
        assert_eq!(resource.source(), Some(SOURCE));
        assert_eq!(drain(&mut rx), vec![ResourceEvent::MetadataLoaded]);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_source_has_no_duration() {
        let (mut resource, _rx) = attached(ClockOptions::default());

        resource.load("https://example.com/live.mp3");

        assert_eq!(resource.duration(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn play_without_source_fails() {
        let (mut resource, _rx) = attached(ClockOptions::default());

        let result = resource.play().await;

        assert_eq!(result, Err(ResourceError::NoSource));
    }

    #[tokio::test(start_paused = true)]
    async fn play_rejects_unsupported_scheme() {
        let (mut resource, mut rx) = attached(ClockOptions::default());
        resource.load("ftp://example.com/episode.mp3");
        drain(&mut rx);

        let result = resource.play().await;

        assert!(matches!(
            result,
            Err(ResourceError::UnsupportedSource { .. })
        ));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn playhead_advances_and_ends() {
        let (mut resource, mut rx) = attached(ClockOptions::default());
        resource.load(SOURCE);
        drain(&mut rx);

        resource.play().await.unwrap();
        assert_eq!(drain(&mut rx), vec![ResourceEvent::Started]);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!((resource.position() - 4.0).abs() < 0.001);
        assert!(drain(&mut rx).contains(&ResourceEvent::TimeUpdate));

        tokio::time::sleep(Duration::from_secs(7)).await;
        let events = drain(&mut rx);
        assert_eq!(events.last(), Some(&ResourceEvent::Ended));
        assert_eq!(resource.position(), 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_playhead() {
        let (mut resource, mut rx) = attached(ClockOptions::default());
        resource.load(SOURCE);
        resource.play().await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        resource.pause();
        drain(&mut rx);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!((resource.position() - 3.0).abs() < 0.001);
        assert!(drain(&mut rx).is_empty());

        // Pausing again emits nothing
        resource.pause();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_position_clamps_to_duration() {
        let (mut resource, _rx) = attached(ClockOptions::default());
        resource.load(SOURCE);

        resource.set_position(25.0);
        assert_eq!(resource.position(), 10.0);

        resource.set_position(-3.0);
        assert_eq!(resource.position(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn play_after_end_restarts() {
        let (mut resource, mut rx) = attached(ClockOptions::default());
        resource.load(SOURCE);
        resource.set_position(10.0);
        drain(&mut rx);

        resource.play().await.unwrap();
        assert_eq!(resource.position(), 0.0);
        assert_eq!(
            drain(&mut rx),
            vec![ResourceEvent::TimeUpdate, ResourceEvent::Started]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn seek_during_start_delay_waits_for_start() {
        let options = ClockOptions {
            start_delay: Duration::from_secs(2),
            ..Default::default()
        };
        let (mut resource, _rx) = attached(options);
        resource.load(SOURCE);

        let attempt = resource.play();
        resource.set_position(3.0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(resource.position(), 3.0);

        attempt.await.unwrap();
        assert_eq!(resource.position(), 3.0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!((resource.position() - 4.0).abs() < 0.001);
    }

    #[tokio::test(start_paused = true)]
    async fn retired_ticker_stays_silent() {
        let (sink, mut rx) = EventSink::channel();
        let current = Arc::new(Mutex::new(1));
        let emitter = TickEmitter {
            generation: 0,
            current: Arc::clone(&current),
            events: sink,
        };

        let ticker = tokio::spawn(run_ticker(
            emitter,
            Instant::now(),
            0.0,
            Some(1.0),
            Duration::from_millis(250),
        ));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(ticker.is_finished());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn switching_source_at_the_end_emits_nothing_stale() {
        let (mut resource, mut rx) = attached(ClockOptions::default());
        resource.load(SOURCE);
        resource.set_position(9.9);
        resource.play().await.unwrap();

        resource.pause();
        drain(&mut rx);
        resource.load("https://example.com/next.mp3");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(drain(&mut rx), vec![ResourceEvent::MetadataLoaded]);
    }

    #[tokio::test(start_paused = true)]
    async fn local_files_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.mp3");
        std::fs::write(&path, b"ID3").unwrap();
        let present = Url::from_file_path(&path).unwrap().to_string();
        let missing = Url::from_file_path(dir.path().join("gone.mp3"))
            .unwrap()
            .to_string();
        let (mut resource, _rx) = attached(ClockOptions::default());

        resource.load(&present);
        assert_eq!(resource.play().await, Ok(()));

        resource.load(&missing);
        assert!(matches!(
            resource.play().await,
            Err(ResourceError::StartFailed { reason, .. }) if reason == "file not found"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn start_delay_postpones_started_event() {
        let options = ClockOptions {
            start_delay: Duration::from_secs(2),
            ..Default::default()
        };
        let (mut resource, mut rx) = attached(options);
        resource.load(SOURCE);
        drain(&mut rx);

        let attempt = resource.play();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(resource.position(), 0.0);

        attempt.await.unwrap();
        assert!(drain(&mut rx).contains(&ResourceEvent::Started));
    }
}
