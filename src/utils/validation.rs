// file: src/utils/validation.rs
// description: validation of geo parameters and configuration values
// reference: input validation patterns

use crate::error::{Result, SearchError};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Engine distance: a positive number followed by a distance unit
    static ref DISTANCE: Regex =
        Regex::new(r"^\d+(\.\d+)?\s*(mi|miles|yd|yards|ft|feet|in|inch|km|kilometers|m|meters|cm|centimeters|mm|millimeters|NM|nmi|nauticalmiles)$")
            .unwrap();
    static ref GEOHASH: Regex = Regex::new(r"^[0-9b-hjkmnp-z]{1,12}$").unwrap();
    static ref INDEX_NAME: Regex = Regex::new(r"^[a-z0-9][a-z0-9_\-.]*$").unwrap();
}

pub struct Validator;

impl Validator {
    pub fn validate_distance(distance: &str) -> Result<()> {
        if !DISTANCE.is_match(distance.trim()) {
            return Err(SearchError::Validation(format!(
                "Invalid geo distance: {}",
                distance
            )));
        }
        Ok(())
    }

    pub fn validate_geohash(geohash: &str) -> Result<()> {
        if !GEOHASH.is_match(geohash) {
            return Err(SearchError::Validation(format!(
                "Invalid geohash: {}",
                geohash
            )));
        }
        Ok(())
    }

    pub fn validate_lat_lon(lat: f64, lon: f64) -> Result<()> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(SearchError::Validation(format!(
                "Coordinates out of range: lat {}, lon {}",
                lat, lon
            )));
        }
        Ok(())
    }

    /// Engine index names are lowercase and cannot start with `_`, `-` or `+`
    pub fn validate_index_name(name: &str) -> Result<()> {
        if name.len() > 255 || !INDEX_NAME.is_match(name) {
            return Err(SearchError::Config(format!("Invalid index name: {}", name)));
        }
        Ok(())
    }

    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SearchError::Config(format!("Invalid URL format: {}", url)));
        }
        Ok(())
    }
}
