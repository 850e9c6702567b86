pub mod status_composer;
pub mod system_context;
