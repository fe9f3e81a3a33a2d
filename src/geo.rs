// src/geo.rs

//! # Local Geodesy
//!
//! Conversion between geodetic fixes and the local north-east-up frame
//! anchored at the GPS origin. Position targets are always expressed in
//! this local frame, in centimetres.

use crate::state::Vector3;
use libm::{atan2f, cosf, sqrtf};

/// Centimetres per 1e-7 degree of latitude (and of longitude at the equator).
pub const DISTANCE_BETWEEN_TWO_LONGITUDE_POINTS_AT_EQUATOR: f32 = 1.113195;

/// Lower bound on the longitude scale, so high latitudes stay finite.
const MIN_LONGITUDE_SCALE: f32 = 0.01;

/// Geodetic position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GeoLocation {
    /// Latitude, in 1e-7 degrees.
    pub lat: i32,
    /// Longitude, in 1e-7 degrees.
    pub lon: i32,
    /// Altitude, in cm.
    pub alt: i32,
}

/// Origin of the local frame, latched from the first valid fix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsOrigin {
    location: GeoLocation,
    scale: f32,
    valid: bool,
}

impl GpsOrigin {
    /// Latches `location` as the origin unless one is already set.
    ///
    /// Returns `true` when the origin was set by this call.
    pub fn set_once(&mut self, location: GeoLocation) -> bool {
        if self.valid {
            return false;
        }
        let lat_rad = (location.lat as f32 * 1e-7).to_radians();
        self.location = location;
        self.scale = cosf(lat_rad).max(MIN_LONGITUDE_SCALE);
        self.valid = true;
        nav_info!("gps origin set: lat {} lon {}", location.lat, location.lon);
        true
    }

    /// Whether an origin has been latched.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The latched origin.
    pub fn location(&self) -> GeoLocation {
        self.location
    }

    /// Converts a geodetic fix to local north-east-up centimetres.
    ///
    /// Returns `None` until an origin is latched.
    pub fn to_local(&self, location: &GeoLocation) -> Option<Vector3> {
        if !self.valid {
            return None;
        }
        let d_lat = location.lat.wrapping_sub(self.location.lat) as f32;
        let d_lon = location.lon.wrapping_sub(self.location.lon) as f32;
        Some(Vector3 {
            x: d_lat * DISTANCE_BETWEEN_TWO_LONGITUDE_POINTS_AT_EQUATOR,
            y: d_lon * DISTANCE_BETWEEN_TWO_LONGITUDE_POINTS_AT_EQUATOR * self.scale,
            z: location.alt.wrapping_sub(self.location.alt) as f32,
        })
    }

    /// Converts local north-east-up centimetres back to a geodetic fix.
    ///
    /// Returns `None` until an origin is latched.
    pub fn to_geodetic(&self, local: &Vector3) -> Option<GeoLocation> {
        if !self.valid {
            return None;
        }
        let d_lat = local.x / DISTANCE_BETWEEN_TWO_LONGITUDE_POINTS_AT_EQUATOR;
        let d_lon = local.y / (DISTANCE_BETWEEN_TWO_LONGITUDE_POINTS_AT_EQUATOR * self.scale);
        Some(GeoLocation {
            lat: self.location.lat.wrapping_add(d_lat as i32),
            lon: self.location.lon.wrapping_add(d_lon as i32),
            alt: self.location.alt.wrapping_add(local.z as i32),
        })
    }
}

/// Horizontal distance in cm and bearing in centidegrees (0..36000,
/// clockwise from north) from `from` to `to`.
pub fn distance_and_bearing(from: &Vector3, to: &Vector3) -> (f32, i32) {
    let d_north = to.x - from.x;
    let d_east = to.y - from.y;
    let distance = sqrtf(d_north * d_north + d_east * d_east);
    let bearing = (atan2f(d_east, d_north).to_degrees() * 100.0) as i32;
    (distance, wrap_36000(bearing))
}

/// Wraps an angle in centidegrees into 0..36000.
pub fn wrap_36000(angle: i32) -> i32 {
    angle.rem_euclid(36000)
}

/// Wraps an angle in centidegrees into -18000..18000.
pub fn wrap_18000(angle: i32) -> i32 {
    let wrapped = wrap_36000(angle);
    if wrapped >= 18000 {
        wrapped - 36000
    } else {
        wrapped
    }
}
