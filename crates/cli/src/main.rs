use std::path::PathBuf;
use std::process;

use clap::Parser;

use facesense_core::pipeline::bootstrap::{build_driver, ModelPaths};
use facesense_core::pipeline::display_buffer::DisplayBuffer;
use facesense_core::pipeline::loop_driver::Outputs;
use facesense_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facesense_core::pipeline::sinks::LatestValue;
use facesense_core::pipeline::tick_scheduler::TickScheduler;
use facesense_core::shared::settings::Settings;

/// Live face, hand and emotion detection on a webcam, without a window.
///
/// Unset options fall back to the saved settings file.
#[derive(Parser)]
#[command(name = "facesense")]
struct Cli {
    /// Capture device (e.g. /dev/video1 on Linux, "1" on macOS).
    #[arg(long)]
    camera: Option<String>,

    /// Stop after this many ticks (runs until interrupted if omitted).
    #[arg(long)]
    frames: Option<usize>,

    /// Tick rate in Hz.
    #[arg(long)]
    fps: Option<u32>,

    /// Cascade pyramid scale factor (> 1.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Raw hits a face needs beyond this count to be reported.
    #[arg(long)]
    min_neighbors: Option<usize>,

    /// Smallest face side in pixels.
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Hand detection confidence (0.0-1.0).
    #[arg(long)]
    hand_confidence: Option<f32>,

    /// Maximum hands tracked per frame.
    #[arg(long)]
    max_hands: Option<usize>,

    /// Directory with pre-downloaded model files.
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(camera) = &self.camera {
            settings.camera_device = Some(camera.clone());
        }
        if let Some(fps) = self.fps {
            settings.ticks_per_second = fps;
        }
        if let Some(v) = self.scale_factor {
            settings.scale_factor = v;
        }
        if let Some(v) = self.min_neighbors {
            settings.min_neighbors = v;
        }
        if let Some(v) = self.min_face_size {
            settings.min_face_size = v;
        }
        if let Some(v) = self.hand_confidence {
            settings.hand_confidence = v;
        }
        if let Some(v) = self.max_hands {
            settings.max_hands = v;
        }
        if let Some(dir) = &self.models_dir {
            settings.models_dir = Some(dir.clone());
        }
        settings
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = cli.apply(Settings::load());
    validate(&settings)?;

    let models = ModelPaths::resolve(&settings, Some(download_progress))?;
    eprintln!();

    let video = LatestValue::<DisplayBuffer>::new();
    let status = LatestValue::<String>::new();
    let mut driver = build_driver(
        &settings,
        &models,
        Outputs {
            video: Box::new(video.clone()),
            status: Box::new(status.clone()),
        },
        Box::new(StdoutPipelineLogger::new(settings.ticks_per_second as usize)),
    )?;

    let mut scheduler = TickScheduler::new(settings.ticks_per_second);
    let mut last_status = String::new();
    let mut ticks = 0usize;

    while cli.frames.map_or(true, |limit| ticks < limit) {
        scheduler.wait();
        driver.tick()?;
        ticks += 1;

        if let Some(text) = status.take() {
            if text != last_status {
                log::info!("\n{}", text.trim_end());
                last_status = text;
            }
        }
        if let Some(buffer) = video.take() {
            log::debug!("Annotated frame {}x{}", buffer.width(), buffer.height());
        }
    }
    driver.stop();
    Ok(())
}

fn validate(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if settings.scale_factor <= 1.0 {
        return Err("--scale-factor must be greater than 1.0".into());
    }
    if !(0.0..=1.0).contains(&settings.hand_confidence) {
        return Err("--hand-confidence must be between 0.0 and 1.0".into());
    }
    if settings.ticks_per_second == 0 {
        return Err("--fps must be at least 1".into());
    }
    Ok(())
}

fn download_progress(model: &'static str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {model}... {pct}%");
    } else {
        eprint!("\rDownloading {model}... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from([
            "facesense",
            "--camera",
            "/dev/video2",
            "--fps",
            "15",
            "--min-neighbors",
            "3",
        ]);
        let settings = cli.apply(Settings::default());
        assert_eq!(settings.camera_device.as_deref(), Some("/dev/video2"));
        assert_eq!(settings.ticks_per_second, 15);
        assert_eq!(settings.min_neighbors, 3);
        assert_eq!(settings.min_face_size, Settings::default().min_face_size);
    }

    #[test]
    fn test_validate_rejects_bad_scale_factor() {
        let settings = Settings {
            scale_factor: 1.0,
            ..Settings::default()
        };
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_frames_flag() {
        let cli = Cli::parse_from(["facesense", "--frames", "90"]);
        assert_eq!(cli.frames, Some(90));
    }

    #[test]
    fn test_snapshot_flag_is_rejected() {
        assert!(Cli::try_parse_from(["facesense", "--snapshot", "out.png"]).is_err());
    }
}
