pub mod bootstrap;
pub mod clock;
pub mod display_buffer;
pub mod loop_driver;
pub mod pipeline_logger;
pub mod sinks;
pub mod tick_scheduler;
