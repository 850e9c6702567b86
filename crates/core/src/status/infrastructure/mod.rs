pub mod geojs_locator;
pub mod host_system_probe;
