use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::shared::constants::UNKNOWN;
use crate::status::domain::system_context::{GeoLocation, GeoLocator};

#[derive(Error, Debug)]
pub enum GeoLookupError {
    #[error("geolocation request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed geolocation response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Looks up the public IP's location with the GeoJS JSON endpoint.
pub struct GeoJsLocator {
    url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct GeoJsResponse {
    ip: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

impl GeoJsLocator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    fn fetch(&self) -> Result<String, GeoLookupError> {
        let http = |source| GeoLookupError::Http {
            url: self.url.clone(),
            source,
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(http)?;
        client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(http)
    }
}

impl GeoLocator for GeoJsLocator {
    fn locate(&self) -> Result<GeoLocation, Box<dyn std::error::Error>> {
        let body = self.fetch()?;
        let location = parse_geo_response(&body)?;
        log::info!(
            "Geolocation: {} ({}, {})",
            location.ip,
            location.city,
            location.country
        );
        Ok(location)
    }
}

/// Parses a GeoJS body. Missing or null fields read as `Unknown`.
pub fn parse_geo_response(body: &str) -> Result<GeoLocation, GeoLookupError> {
    let parsed: GeoJsResponse = serde_json::from_str(body)?;
    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
    Ok(GeoLocation {
        ip: or_unknown(parsed.ip),
        city: or_unknown(parsed.city),
        country: or_unknown(parsed.country),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_response() {
        let body = r#"{"organization_name":"Example ISP","region":"Lisbon","accuracy":20,
            "asn":1234,"organization":"AS1234 Example ISP","timezone":"Europe/Lisbon",
            "longitude":"-9.1","country_code3":"PRT","area_code":"0","ip":"203.0.113.7",
            "city":"Lisbon","country":"Portugal","continent_code":"EU","country_code":"PT",
            "latitude":"38.7"}"#;
        let loc = parse_geo_response(body).unwrap();
        assert_eq!(
            loc,
            GeoLocation {
                ip: "203.0.113.7".into(),
                city: "Lisbon".into(),
                country: "Portugal".into(),
            }
        );
    }

    #[test]
    fn test_missing_city_reads_unknown() {
        let body = r#"{"ip":"198.51.100.1","country":"Iceland"}"#;
        let loc = parse_geo_response(body).unwrap();
        assert_eq!(loc.city, "Unknown");
        assert_eq!(loc.country, "Iceland");
    }

    #[test]
    fn test_null_fields_read_unknown() {
        let loc = parse_geo_response(r#"{"ip":null,"city":null}"#).unwrap();
        assert_eq!(loc, GeoLocation::unknown());
    }

    #[test]
    fn test_malformed_body_is_error() {
        assert!(matches!(
            parse_geo_response("<html>rate limited</html>"),
            Err(GeoLookupError::Parse(_))
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_error() {
        let locator = GeoJsLocator::new("http://127.0.0.1:9/geo.json", Duration::from_millis(500));
        assert!(locator.locate().is_err());
    }
}
