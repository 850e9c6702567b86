use chrono::NaiveTime;

/// Wall-clock source for the status panel.
pub trait Clock: Send {
    fn now(&self) -> NaiveTime;
}

/// Local time of day.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}
