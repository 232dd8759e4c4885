use std::sync::Arc;

use rinkmark_core::annotation_store::AnnotationStore;
use rinkmark_core::assignment::{AssignmentMatcher, AssignmentSource};
use rinkmark_core::ffmpeg::VideoProbe;
use rinkmark_core::layout::DataLayout;
use rinkmark_core::metadata_cache::MetadataCache;
use rinkmark_core::streamer::VideoRangeStreamer;
use rinkmark_core::video_library::VideoLibrary;

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub library: Arc<VideoLibrary>,
    pub annotations: Arc<AnnotationStore>,
    pub metadata_cache: Arc<MetadataCache>,
    pub streamer: VideoRangeStreamer,
    pub probe: Arc<dyn VideoProbe>,
    /// Raw rule storage, for the admin endpoints.
    pub assignments: Arc<dyn AssignmentSource>,
    /// Fail-closed access decisions over `assignments`.
    pub matcher: AssignmentMatcher,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the services for `config`. Opens (or starts) the metadata cache
    /// under the data directory.
    pub async fn build(
        config: ServerConfig,
        probe: Arc<dyn VideoProbe>,
        assignments: Arc<dyn AssignmentSource>,
    ) -> Self {
        let layout = DataLayout::new(&config.data_dir);
        let library = VideoLibrary::new(&config.videos_dir);
        let metadata_cache = Arc::new(MetadataCache::open(layout.clone()).await);

        let annotations = Arc::new(AnnotationStore::new(
            layout,
            library.clone(),
            Arc::clone(&probe),
            config.probe_timeout(),
            Arc::clone(&metadata_cache),
        ));
        let rate_limiter = Arc::new(RateLimiter::per_minute(config.rate_limit_per_minute));
        let matcher = AssignmentMatcher::new(Arc::clone(&assignments));

        Self {
            config: Arc::new(config),
            library: Arc::new(library),
            annotations,
            metadata_cache,
            streamer: VideoRangeStreamer,
            probe,
            assignments,
            matcher,
            rate_limiter,
        }
    }
}
