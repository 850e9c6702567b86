use chrono::NaiveTime;

use crate::emotion::domain::emotion_classifier::EmotionLabel;
use crate::status::domain::system_context::SystemContext;

/// Per-tick counters, recomputed fresh every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusSnapshot {
    pub faces: usize,
    pub hands: usize,
    pub emotions: Vec<EmotionLabel>,
    pub time: NaiveTime,
}

/// Formats the status panel text.
///
/// Six lines joined by `\n`, then `\n\n\n\n` of padding. Pure: identical
/// inputs always give identical text.
pub fn compose(snapshot: &StatusSnapshot, context: &SystemContext) -> String {
    let emotions = if snapshot.emotions.is_empty() {
        "None".to_string()
    } else {
        snapshot
            .emotions
            .iter()
            .map(EmotionLabel::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let location = &context.location;
    let system = &context.system;

    format!(
        "Faces: {}, Hands: {}\nEmotions: {emotions}\nIP: {}\nLocation: {}, {}\nOS: {} {}\nTime: {}\n\n\n\n",
        snapshot.faces,
        snapshot.hands,
        location.ip,
        location.city,
        location.country,
        system.os_name,
        system.os_version,
        snapshot.time.format("%H:%M:%S"),
    )
}
