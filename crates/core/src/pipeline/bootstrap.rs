//! Wires the production adapters into a [`LoopDriver`].

use std::path::PathBuf;
use std::time::Duration;

use crate::capture::domain::frame_source::{FrameSource, UnavailableFrameSource};
use crate::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use crate::detection::infrastructure::haar_cascade_detector::{CascadeParams, HaarCascadeDetector};
use crate::detection::infrastructure::onnx_hand_detector::OnnxHandDetector;
use crate::emotion::infrastructure::onnx_emotion_classifier::OnnxEmotionClassifier;
use crate::pipeline::clock::SystemClock;
use crate::pipeline::loop_driver::{LoopDriver, Outputs, Perception};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::model_resolver::{
    self, ModelResolveError, ModelSpec, EMOTION_MODEL, FACE_CASCADE_MODEL,
    HAND_LANDMARK_MODEL, PALM_MODEL,
};
use crate::shared::settings::Settings;
use crate::status::domain::system_context::SystemContext;
use crate::status::infrastructure::geojs_locator::GeoJsLocator;
use crate::status::infrastructure::host_system_probe::HostSystemProbe;

/// Download progress observer: `(model name, bytes downloaded, total bytes)`.
pub type DownloadObserver = fn(&'static str, u64, u64);

/// On-disk locations of every model the driver needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelPaths {
    pub face_cascade: PathBuf,
    pub palm: PathBuf,
    pub hand_landmark: PathBuf,
    pub emotion: PathBuf,
}

impl ModelPaths {
    /// Resolves each model from the cache, the bundled directory, or the network.
    pub fn resolve(
        settings: &Settings,
        on_download: Option<DownloadObserver>,
    ) -> Result<Self, ModelResolveError> {
        let fetch = |model: &ModelSpec| {
            log::info!("Resolving model: {}", model.name);
            let name = model.name;
            let progress = on_download.map(|f| -> model_resolver::ProgressFn {
                Box::new(move |done, total| f(name, done, total))
            });
            model_resolver::resolve(model, settings.models_dir.as_deref(), progress)
        };
        Ok(Self {
            face_cascade: fetch(&FACE_CASCADE_MODEL)?,
            palm: fetch(&PALM_MODEL)?,
            hand_landmark: fetch(&HAND_LANDMARK_MODEL)?,
            emotion: fetch(&EMOTION_MODEL)?,
        })
    }
}

/// Opens the configured camera, or a stand-in that reports it unavailable.
pub fn open_camera(settings: &Settings) -> Box<dyn FrameSource> {
    match FfmpegCamera::open(settings.camera_device.as_deref()) {
        Ok(camera) => Box::new(camera),
        Err(e) => {
            log::error!("{e}");
            Box::new(UnavailableFrameSource::new(e.to_string()))
        }
    }
}

/// Queries the host and runs the single geolocation lookup.
pub fn resolve_context(settings: &Settings) -> SystemContext {
    let locator = GeoJsLocator::new(
        settings.geolocation_url.clone(),
        Duration::from_secs(settings.geolocation_timeout_secs),
    );
    SystemContext::resolve(&HostSystemProbe::new(), &locator)
}

/// Builds a running driver over the real camera and models.
///
/// A camera that cannot be opened is not fatal (the driver reports it on
/// every tick); a model that cannot be loaded is.
pub fn build_driver(
    settings: &Settings,
    models: &ModelPaths,
    outputs: Outputs,
    logger: Box<dyn PipelineLogger>,
) -> Result<LoopDriver, Box<dyn std::error::Error>> {
    let faces = HaarCascadeDetector::new(
        &models.face_cascade,
        CascadeParams {
            scale_factor: settings.scale_factor,
            min_neighbors: settings.min_neighbors,
            min_size: settings.min_face_size,
        },
    )?;
    let hands = OnnxHandDetector::new(
        &models.palm,
        &models.hand_landmark,
        settings.hand_confidence,
        settings.max_hands,
    )?;
    let emotions = OnnxEmotionClassifier::new(&models.emotion)?;

    let source = open_camera(settings);
    let context = resolve_context(settings);

    Ok(LoopDriver::new(
        source,
        Perception {
            hands: Box::new(hands),
            faces: Box::new(faces),
            emotions: Box::new(emotions),
        },
        context,
        outputs,
        Box::new(SystemClock),
        logger,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::display_buffer::DisplayBuffer;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::sinks::LatestValue;

    #[test]
    fn test_bundled_models_resolve_without_download() {
        let dir = tempfile::tempdir().unwrap();
        for model in [
            &FACE_CASCADE_MODEL,
            &PALM_MODEL,
            &HAND_LANDMARK_MODEL,
            &EMOTION_MODEL,
        ] {
            std::fs::write(dir.path().join(model.name), b"stub").unwrap();
        }
        let settings = Settings {
            models_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let paths = ModelPaths::resolve(&settings, None).unwrap();
        for path in [
            &paths.face_cascade,
            &paths.palm,
            &paths.hand_landmark,
            &paths.emotion,
        ] {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_missing_camera_falls_back_to_unavailable_source() {
        let settings = Settings {
            camera_device: Some("/nonexistent/video-device".into()),
            ..Settings::default()
        };
        let mut source = open_camera(&settings);
        assert!(source.read().is_err());
    }

    #[test]
    fn test_unloadable_cascade_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus");
        std::fs::write(&bogus, b"not a model").unwrap();
        let models = ModelPaths {
            face_cascade: bogus.clone(),
            palm: bogus.clone(),
            hand_landmark: bogus.clone(),
            emotion: bogus,
        };
        let video = LatestValue::<DisplayBuffer>::new();
        let status = LatestValue::<String>::new();
        let result = build_driver(
            &Settings::default(),
            &models,
            Outputs {
                video: Box::new(video),
                status: Box::new(status),
            },
            Box::new(NullPipelineLogger),
        );
        assert!(result.is_err());
    }
}
