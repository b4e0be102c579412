use crate::gallery::{manager, Config, GalleryLayout};
use crate::import::heic::{self, HeifDecoder};
use crate::import::pipeline::{stale_upload_age, Pipeline};
use std::path::PathBuf;

/// Everything a command needs. Immutable once built, so one instance can be
/// shared across concurrent requests.
pub struct AppState {
    pub home: PathBuf,
    pub config: Config,
    pub pipeline: Pipeline,
}

impl AppState {
    /// Read `<home>/config.json` and make sure the gallery directories exist.
    pub fn open(home: PathBuf) -> anyhow::Result<Self> {
        let config = manager::read_config(&home)?;
        Self::with_config(home, config, heic::default_decoder())
    }

    pub fn with_config(
        home: PathBuf,
        config: Config,
        decoder: Box<dyn HeifDecoder>,
    ) -> anyhow::Result<Self> {
        let layout = config.layout(&home);
        manager::create_gallery_dirs(&home, &layout)?;
        tracing::info!(
            "gallery: home={:?} photos={:?}",
            home,
            layout.photos_dir
        );
        let pipeline = Pipeline::new(layout, &config, decoder);
        pipeline.sweep_stale_uploads(stale_upload_age());
        Ok(AppState {
            home,
            config,
            pipeline,
        })
    }

    pub fn layout(&self) -> &GalleryLayout {
        self.pipeline.layout()
    }

    pub fn incoming_dir(&self) -> PathBuf {
        manager::incoming_dir(&self.home)
    }

    pub fn log_operation(&self, event: &str) {
        manager::append_operation_log(&self.home, event);
    }
}
