pub const FACE_CASCADE_MODEL_NAME: &str = "haarcascade_frontalface_default.xml";
pub const FACE_CASCADE_MODEL_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades/haarcascade_frontalface_default.xml";

pub const PALM_MODEL_NAME: &str = "palm_detection_mediapipe_2023feb.onnx";
pub const PALM_MODEL_URL: &str =
    "https://github.com/opencv/opencv_zoo/raw/main/models/palm_detection_mediapipe/palm_detection_mediapipe_2023feb.onnx";

pub const HAND_LANDMARK_MODEL_NAME: &str = "handpose_estimation_mediapipe_2023feb.onnx";
pub const HAND_LANDMARK_MODEL_URL: &str =
    "https://github.com/opencv/opencv_zoo/raw/main/models/handpose_estimation_mediapipe/handpose_estimation_mediapipe_2023feb.onnx";

pub const EMOTION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const EMOTION_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

pub const GEOLOCATION_URL: &str = "https://get.geojs.io/v1/ip/geo.json";

/// Nominal tick rate of the loop driver.
pub const TICKS_PER_SECOND: u32 = 30;

/// Cascade tuning; changing these changes which faces are found.
pub const CASCADE_SCALE_FACTOR: f64 = 1.1;
pub const CASCADE_MIN_NEIGHBORS: usize = 5;
pub const CASCADE_MIN_FACE_SIZE: u32 = 30;

pub const HAND_CONFIDENCE: f32 = 0.7;
pub const MAX_HANDS: usize = 2;

pub const CAMERA_UNAVAILABLE_TEXT: &str = "Unable to access the camera!";
pub const UNKNOWN: &str = "Unknown";

/// Application directory name under the platform config/cache roots.
pub const APP_DIR_NAME: &str = "FaceSense";
