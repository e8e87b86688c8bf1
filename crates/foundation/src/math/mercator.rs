//! Web mercator coordinates as used by slippy-map engines.
//!
//! `x` and `y` span `[0, 1]` over the whole world with `y` growing southward.
//! `z` is altitude expressed in the same units at the coordinate's latitude,
//! so a unit sphere scaled by [`MercatorCoordinate::meter_in_mercator_coordinate_units`]
//! is one meter wide regardless of where it sits.

use std::f64::consts::PI;

use super::Vec3;

/// Mean earth radius (meters) used by web mercator map engines.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;
/// Circumference of the mercator world at the equator (meters).
pub const EARTH_CIRCUMFERENCE_M: f64 = 2.0 * PI * EARTH_RADIUS_M;
/// Latitude at which the web mercator world becomes square.
pub const MAX_MERCATOR_LAT_DEG: f64 = 85.051_128_779_806_6;

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn from_array(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    pub fn is_finite(self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }

    /// True when the latitude is inside the square mercator world.
    pub fn is_projectable(self) -> bool {
        self.is_finite() && self.lat.abs() <= MAX_MERCATOR_LAT_DEG
    }
}

pub fn circumference_at_latitude(lat_deg: f64) -> f64 {
    EARTH_CIRCUMFERENCE_M * lat_deg.to_radians().cos()
}

pub fn mercator_x_from_lng(lng_deg: f64) -> f64 {
    (180.0 + lng_deg) / 360.0
}

pub fn mercator_y_from_lat(lat_deg: f64) -> f64 {
    (180.0 - (180.0 / PI) * (PI / 4.0 + lat_deg * PI / 360.0).tan().ln()) / 360.0
}

pub fn mercator_z_from_altitude(altitude_m: f64, lat_deg: f64) -> f64 {
    altitude_m / circumference_at_latitude(lat_deg)
}

pub fn lng_from_mercator_x(x: f64) -> f64 {
    x * 360.0 - 180.0
}

pub fn lat_from_mercator_y(y: f64) -> f64 {
    let y2 = 180.0 - y * 360.0;
    360.0 / PI * (y2 * PI / 180.0).exp().atan() - 90.0
}

/// Stretch factor of the projection at `lat_deg` (1 at the equator).
pub fn mercator_scale(lat_deg: f64) -> f64 {
    1.0 / lat_deg.to_radians().cos()
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct MercatorCoordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MercatorCoordinate {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_lng_lat(lng_lat: LngLat, altitude_m: f64) -> Self {
        Self::new(
            mercator_x_from_lng(lng_lat.lng),
            mercator_y_from_lat(lng_lat.lat),
            mercator_z_from_altitude(altitude_m, lng_lat.lat),
        )
    }

    pub fn to_lng_lat(self) -> LngLat {
        LngLat::new(lng_from_mercator_x(self.x), lat_from_mercator_y(self.y))
    }

    pub fn to_altitude(self) -> f64 {
        self.z * circumference_at_latitude(lat_from_mercator_y(self.y))
    }

    /// Length of one meter at this coordinate, in mercator units.
    pub fn meter_in_mercator_coordinate_units(self) -> f64 {
        1.0 / EARTH_CIRCUMFERENCE_M * mercator_scale(lat_from_mercator_y(self.y))
    }

    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::{EARTH_CIRCUMFERENCE_M, LngLat, MAX_MERCATOR_LAT_DEG, MercatorCoordinate};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn null_island_is_world_center() {
        let c = MercatorCoordinate::from_lng_lat(LngLat::new(0.0, 0.0), 0.0);
        assert_close(c.x, 0.5, 1e-12);
        assert_close(c.y, 0.5, 1e-12);
        assert_eq!(c.z, 0.0);
    }

    #[test]
    fn mercator_limit_maps_to_world_edge() {
        let north = MercatorCoordinate::from_lng_lat(LngLat::new(-180.0, MAX_MERCATOR_LAT_DEG), 0.0);
        assert_close(north.x, 0.0, 1e-12);
        assert_close(north.y, 0.0, 1e-9);
    }

    #[test]
    fn lng_lat_altitude_round_trip() {
        let boston = LngLat::new(-71.0589, 42.3601);
        let c = MercatorCoordinate::from_lng_lat(boston, 10_500.0);
        let back = c.to_lng_lat();
        assert_close(back.lng, boston.lng, 1e-9);
        assert_close(back.lat, boston.lat, 1e-9);
        assert_close(c.to_altitude(), 10_500.0, 1e-6);
    }

    #[test]
    fn meter_units_grow_toward_the_poles() {
        let equator = MercatorCoordinate::from_lng_lat(LngLat::new(0.0, 0.0), 0.0);
        assert_close(
            equator.meter_in_mercator_coordinate_units(),
            1.0 / EARTH_CIRCUMFERENCE_M,
            1e-18,
        );
        let north = MercatorCoordinate::from_lng_lat(LngLat::new(0.0, 60.0), 0.0);
        assert_close(
            north.meter_in_mercator_coordinate_units(),
            2.0 / EARTH_CIRCUMFERENCE_M,
            1e-15,
        );
    }

    #[test]
    fn altitude_units_match_horizontal_meter_units() {
        let ll = LngLat::new(-71.0, 42.0);
        let c = MercatorCoordinate::from_lng_lat(ll, 1.0);
        assert_close(c.z, c.meter_in_mercator_coordinate_units(), 1e-15);
    }
}
