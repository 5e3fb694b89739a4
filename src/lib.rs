pub mod catalog;
pub mod controller;
pub mod error;
pub mod http;
pub mod report;
pub mod resource;
pub mod state;
pub mod track;

// Re-export main types for convenience
pub use catalog::{Catalog, CatalogEntry, DEFAULT_SHOW_API, load_catalog, parse_catalog};
pub use controller::{Controller, PlayerHandle, PlayerOptions, spawn_player};
pub use error::{CatalogError, PlayerError, ResourceError, TrackError};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use report::{NoopReporter, PlayerEvent, PlayerReporter, SharedPlayerReporter};
pub use resource::{AudioResource, ClockOptions, ClockResource, EventSink, PlayAttempt, ResourceEvent};
pub use state::{PlaybackState, PlaybackStatus};
pub use track::{Track, TrackId};
