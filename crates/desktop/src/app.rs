use std::thread;
use std::time::Duration;

use iced::widget::{column, container, image, row, text};
use iced::{window, Element, Length, Subscription, Task};

use facesense_core::pipeline::bootstrap::{build_driver, ModelPaths};
use facesense_core::pipeline::display_buffer::DisplayBuffer;
use facesense_core::pipeline::loop_driver::{DriverState, LoopDriver, Outputs};
use facesense_core::pipeline::pipeline_logger::NullPipelineLogger;
use facesense_core::pipeline::sinks::LatestValue;
use facesense_core::pipeline::tick_scheduler::period_for;
use facesense_core::shared::settings::Settings;

/// Outcome of the background start-up: a running driver or the reason
/// it could not be built.
type Boot = Result<LoopDriver, String>;

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    CloseRequested(window::Id),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App {
    boot: LatestValue<Boot>,
    driver: Option<LoopDriver>,
    video: LatestValue<DisplayBuffer>,
    status: LatestValue<String>,
    frame: Option<image::Handle>,
    status_text: String,
    period: Duration,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let app = Self::booting(period_for(settings.ticks_per_second));

        // Model downloads and the geolocation lookup block; keep them off
        // the UI thread so the window paints immediately.
        let boot = app.boot.clone();
        let video = app.video.clone();
        let status = app.status.clone();
        thread::spawn(move || {
            boot.put(start(&settings, &video, &status).map_err(|e| e.to_string()));
        });

        (app, Task::none())
    }

    fn booting(period: Duration) -> Self {
        Self {
            boot: LatestValue::new(),
            driver: None,
            video: LatestValue::new(),
            status: LatestValue::new(),
            frame: None,
            status_text: "Loading models...".to_string(),
            period,
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => match self.step() {
                Flow::Continue => Task::none(),
                Flow::Exit => iced::exit(),
            },
            Message::CloseRequested(id) => {
                if let Some(driver) = self.driver.as_mut() {
                    driver.stop();
                }
                window::close(id).chain(iced::exit())
            }
        }
    }

    /// Picks up the driver once start-up finishes, then runs one tick.
    ///
    /// A failed start or a failed tick ends the app; the camera is released
    /// before `Exit` is returned.
    fn step(&mut self) -> Flow {
        if self.driver.is_none() {
            match self.boot.take() {
                None => return Flow::Continue,
                Some(Ok(driver)) => self.driver = Some(driver),
                Some(Err(e)) => {
                    log::error!("Failed to start: {e}");
                    return Flow::Exit;
                }
            }
        }

        if let Some(driver) = self.driver.as_mut() {
            if let Err(e) = driver.tick() {
                log::error!("Tick failed: {e}");
                driver.stop();
                return Flow::Exit;
            }
        }

        if let Some(buffer) = self.video.take() {
            self.frame = Some(image::Handle::from_rgba(
                buffer.width(),
                buffer.height(),
                buffer.to_top_down_rgba(),
            ));
        }
        if let Some(status) = self.status.take() {
            self.status_text = status;
        }
        Flow::Continue
    }

    pub fn view(&self) -> Element<'_, Message> {
        let video: Element<'_, Message> = match &self.frame {
            Some(handle) => image(handle.clone())
                .width(Length::FillPortion(3))
                .height(Length::Fill)
                .into(),
            None => container(text("Waiting for camera..."))
                .center_x(Length::FillPortion(3))
                .center_y(Length::Fill)
                .into(),
        };

        let status = container(column![text(self.status_text.as_str()).size(16)])
            .width(Length::FillPortion(2))
            .height(Length::Fill)
            .padding(16);

        row![video, status].height(Length::Fill).into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let close = window::close_requests().map(Message::CloseRequested);
        let ticking = match &self.driver {
            None => true,
            Some(driver) => driver.state() == DriverState::Running,
        };
        if ticking {
            Subscription::batch([iced::time::every(self.period).map(|_| Message::Tick), close])
        } else {
            close
        }
    }
}

/// Resolves models and builds a driver publishing into the app's mailboxes.
fn start(
    settings: &Settings,
    video: &LatestValue<DisplayBuffer>,
    status: &LatestValue<String>,
) -> Result<LoopDriver, Box<dyn std::error::Error>> {
    let models = ModelPaths::resolve(settings, Some(log_download))?;
    build_driver(
        settings,
        &models,
        Outputs {
            video: Box::new(video.clone()),
            status: Box::new(status.clone()),
        },
        Box::new(NullPipelineLogger),
    )
}

fn log_download(model: &'static str, downloaded: u64, total: u64) {
    if total > 0 && downloaded == total {
        log::info!("Downloaded {model} ({total} bytes)");
    } else {
        log::debug!("Downloading {model}: {downloaded}/{total} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use facesense_core::capture::domain::frame_source::{CaptureError, FrameSource};
    use facesense_core::detection::domain::face_detector::FaceDetector;
    use facesense_core::detection::domain::hand_detector::{HandDetector, HandObservation};
    use facesense_core::emotion::domain::emotion_classifier::{
        ClassificationOutcome, EmotionClassifier, EmotionLabel,
    };
    use facesense_core::pipeline::clock::SystemClock;
    use facesense_core::pipeline::loop_driver::Perception;
    use facesense_core::shared::face_box::FaceBox;
    use facesense_core::shared::frame::Frame;
    use facesense_core::status::domain::system_context::{
        GeoLocation, SystemContext, SystemInfo,
    };

    struct StubCamera {
        released: Arc<AtomicBool>,
    }

    impl FrameSource for StubCamera {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            Ok(Frame::new(vec![0u8; 8 * 6 * 3], 8, 6, 3, 0))
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    struct StubHands {
        fail: bool,
    }

    impl HandDetector for StubHands {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<HandObservation>, Box<dyn std::error::Error>> {
            if self.fail {
                Err("landmark model crashed".into())
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct NoFaces;

    impl FaceDetector for NoFaces {
        fn detect(
            &mut self,
            _gray: &::image::GrayImage,
        ) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }
    }

    struct AlwaysNeutral;

    impl EmotionClassifier for AlwaysNeutral {
        fn classify(&mut self, _face: &Frame) -> ClassificationOutcome {
            ClassificationOutcome::Label(EmotionLabel::Neutral)
        }
    }

    fn driver_for(app: &App, fail_hands: bool, released: Arc<AtomicBool>) -> LoopDriver {
        let context = SystemContext {
            system: SystemInfo {
                os_name: "Linux".into(),
                os_version: "6.1".into(),
                machine: "x86_64".into(),
                processor: "x86_64".into(),
                local_ip: "127.0.0.1".into(),
            },
            location: GeoLocation::unknown(),
        };
        LoopDriver::new(
            Box::new(StubCamera { released }),
            Perception {
                hands: Box::new(StubHands { fail: fail_hands }),
                faces: Box::new(NoFaces),
                emotions: Box::new(AlwaysNeutral),
            },
            context,
            Outputs {
                video: Box::new(app.video.clone()),
                status: Box::new(app.status.clone()),
            },
            Box::new(SystemClock),
            Box::new(NullPipelineLogger),
        )
    }

    #[test]
    fn test_keeps_waiting_while_start_is_pending() {
        let mut app = App::booting(Duration::from_millis(33));
        assert_eq!(app.step(), Flow::Continue);
        assert!(app.driver.is_none());
        assert_eq!(app.status_text, "Loading models...");
    }

    #[test]
    fn test_failed_start_exits() {
        let mut app = App::booting(Duration::from_millis(33));
        app.boot.put(Err("model not found".into()));
        assert_eq!(app.step(), Flow::Exit);
    }

    #[test]
    fn test_failed_tick_releases_camera_and_exits() {
        let mut app = App::booting(Duration::from_millis(33));
        let released = Arc::new(AtomicBool::new(false));
        let driver = driver_for(&app, true, released.clone());
        app.boot.put(Ok(driver));

        assert_eq!(app.step(), Flow::Exit);
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(
            app.driver.as_ref().map(|d| d.state()),
            Some(DriverState::Stopped)
        );
    }

    #[test]
    fn test_successful_tick_shows_frame_and_status() {
        let mut app = App::booting(Duration::from_millis(33));
        let released = Arc::new(AtomicBool::new(false));
        let driver = driver_for(&app, false, released.clone());
        app.boot.put(Ok(driver));

        assert_eq!(app.step(), Flow::Continue);
        assert!(app.frame.is_some());
        assert!(app.status_text.starts_with("Faces: 0, Hands: 0\nEmotions: None\n"));
        assert!(!released.load(Ordering::SeqCst));
    }
}
