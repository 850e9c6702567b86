use std::sync::{Arc, Mutex};

use crate::pipeline::display_buffer::DisplayBuffer;

/// Receives the annotated, display-oriented frame once per tick.
pub trait VideoSink: Send {
    fn publish(&mut self, buffer: DisplayBuffer);
}

/// Receives the status panel text once per tick.
pub trait StatusSink: Send {
    fn publish(&mut self, text: &str);
}

/// Single-slot mailbox holding the latest published value.
///
/// The driver overwrites, the host takes. Clones share the slot, so one
/// clone goes into the driver and the other stays with the host.
pub struct LatestValue<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> LatestValue<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Removes and returns the pending value, if any.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Replaces the pending value.
    pub fn put(&self, value: T) {
        match self.slot.lock() {
            Ok(mut slot) => *slot = Some(value),
            Err(_) => log::error!("Sink mailbox poisoned; dropping update"),
        }
    }
}

impl<T> Clone for LatestValue<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for LatestValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSink for LatestValue<DisplayBuffer> {
    fn publish(&mut self, buffer: DisplayBuffer) {
        self.put(buffer);
    }
}

impl StatusSink for LatestValue<String> {
    fn publish(&mut self, text: &str) {
        self.put(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_returns_latest_then_empties() {
        let host = LatestValue::<String>::new();
        let mut driver_side = host.clone();
        driver_side.publish("first");
        driver_side.publish("second");
        assert_eq!(host.take().as_deref(), Some("second"));
        assert_eq!(host.take(), None);
    }

    #[test]
    fn test_put_from_another_thread_is_visible_to_host() {
        let host = LatestValue::<Result<u32, String>>::new();
        let worker = host.clone();
        std::thread::spawn(move || worker.put(Err("no model".into())))
            .join()
            .unwrap();
        assert_eq!(host.take(), Some(Err("no model".to_string())));
    }

    #[test]
    fn test_video_slot_shared_between_clones() {
        let host = LatestValue::<DisplayBuffer>::new();
        let mut driver_side = host.clone();
        let frame = crate::shared::frame::Frame::new(vec![1, 2, 3], 1, 1, 3, 0);
        driver_side.publish(DisplayBuffer::from_frame(&frame));
        assert_eq!(host.take().map(|b| b.data().to_vec()), Some(vec![1, 2, 3]));
    }
}
