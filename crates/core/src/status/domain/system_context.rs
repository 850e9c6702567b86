use crate::shared::constants::UNKNOWN;

/// Host descriptors queried once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub machine: String,
    pub processor: String,
    pub local_ip: String,
}

/// Public-IP geolocation record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoLocation {
    pub ip: String,
    pub city: String,
    pub country: String,
}

impl GeoLocation {
    /// Record used when the lookup failed; kept for the whole run.
    pub fn unknown() -> Self {
        Self {
            ip: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
        }
    }
}

pub trait SystemProbe {
    fn probe(&self) -> SystemInfo;
}

pub trait GeoLocator {
    fn locate(&self) -> Result<GeoLocation, Box<dyn std::error::Error>>;
}

/// Process-wide context, read-only after startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemContext {
    pub system: SystemInfo,
    pub location: GeoLocation,
}

impl SystemContext {
    /// Queries the host and performs the single geolocation lookup.
    ///
    /// A failed lookup is logged and replaced by [`GeoLocation::unknown`];
    /// it is never retried.
    pub fn resolve(probe: &dyn SystemProbe, locator: &dyn GeoLocator) -> Self {
        let system = probe.probe();
        log::info!(
            "Host: {} {} ({}, {}), local IP {}",
            system.os_name,
            system.os_version,
            system.machine,
            system.processor,
            system.local_ip
        );

        let location = match locator.locate() {
            Ok(location) => location,
            Err(e) => {
                log::warn!("Geolocation lookup failed: {e}");
                GeoLocation::unknown()
            }
        };
        Self { system, location }
    }
}
