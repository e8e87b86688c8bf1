//! Web-mercator camera: center, zoom, pitch and bearing over a canvas.

use std::f64::consts::{FRAC_PI_2, PI};

use foundation::math::{
    lat_from_mercator_y, lng_from_mercator_x, mercator_x_from_lng, mercator_y_from_lat, LngLat,
    Mat4, MercatorCoordinate, Vec2, Vec3, MAX_MERCATOR_LAT_DEG,
};
use gpu::CanvasSize;

use crate::options::MapOptions;

pub const TILE_SIZE: f64 = 512.0;

/// Vertical field of view, `2 * atan(0.375)`.
pub const DEFAULT_FOV_RAD: f64 = 0.643_501_108_793_284_4;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraLimits {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_pitch: f64,
}

impl CameraLimits {
    pub fn from_options(options: &MapOptions) -> Self {
        Self {
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            max_pitch: options.max_pitch,
        }
    }
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self::from_options(&MapOptions::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    center: LngLat,
    zoom: f64,
    pitch_deg: f64,
    bearing_deg: f64,
    width: f64,
    height: f64,
    fov_rad: f64,
    limits: CameraLimits,
}

impl Transform {
    pub fn new(size: CanvasSize, limits: CameraLimits) -> Self {
        let mut t = Self {
            center: LngLat::new(0.0, 0.0),
            zoom: limits.min_zoom,
            pitch_deg: 0.0,
            bearing_deg: 0.0,
            width: 1.0,
            height: 1.0,
            fov_rad: DEFAULT_FOV_RAD,
            limits,
        };
        t.resize(size);
        t
    }

    pub fn from_options(options: &MapOptions, size: CanvasSize) -> Self {
        let mut t = Self::new(size, CameraLimits::from_options(options));
        t.jump_to(options.center_lng_lat(), Some(options.zoom));
        t.set_pitch(options.pitch);
        t.set_bearing(options.bearing);
        t
    }

    pub fn center(&self) -> LngLat {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pitch(&self) -> f64 {
        self.pitch_deg
    }

    pub fn bearing(&self) -> f64 {
        self.bearing_deg
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn limits(&self) -> CameraLimits {
        self.limits
    }

    /// Width of the whole world in pixels at the current zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    pub fn camera_to_center_distance(&self) -> f64 {
        0.5 / (self.fov_rad / 2.0).tan() * self.height
    }

    /// Center in world pixels.
    pub fn center_point(&self) -> Vec2 {
        let world = self.world_size();
        Vec2::new(
            mercator_x_from_lng(self.center.lng) * world,
            mercator_y_from_lat(self.center.lat) * world,
        )
    }

    /// Pixel-space projection: world pixels to clip space.
    pub fn projection_matrix(&self) -> Mat4 {
        let pitch = self.pitch_deg.to_radians();
        let half_fov = self.fov_rad / 2.0;
        let distance = self.camera_to_center_distance();

        let ground_angle = FRAC_PI_2 + pitch;
        let top_half_surface = half_fov.sin() * distance
            / (PI - ground_angle - half_fov).clamp(0.01, PI - 0.01).sin();
        let furthest = (FRAC_PI_2 - pitch).cos() * top_half_surface + distance;
        let far = furthest * 1.01;
        let near = self.height / 50.0;

        let center = self.center_point();
        Mat4::perspective(self.fov_rad, self.width / self.height, near, far)
            .scale(Vec3::new(1.0, -1.0, 1.0))
            .translate(Vec3::new(0.0, 0.0, -distance))
            .rotate_x(pitch)
            .rotate_z(-self.bearing_deg.to_radians())
            .translate(Vec3::new(-center.x, -center.y, 0.0))
    }

    /// Mercator units (unit square, z in the same units) to clip space.
    /// This is the matrix custom layers receive each repaint.
    pub fn mercator_matrix(&self) -> Mat4 {
        self.projection_matrix().scale(Vec3::splat(self.world_size()))
    }

    /// Canvas pixel position, origin top-left. `None` behind the camera.
    pub fn project(&self, coord: MercatorCoordinate) -> Option<Vec2> {
        let ndc = self.mercator_matrix().project_point(coord.as_vec3())?;
        let p = Vec2::new(
            (ndc.x + 1.0) / 2.0 * self.width,
            (1.0 - ndc.y) / 2.0 * self.height,
        );
        (p.x.is_finite() && p.y.is_finite()).then_some(p)
    }

    pub fn project_lng_lat(&self, lng_lat: LngLat) -> Option<Vec2> {
        self.project(MercatorCoordinate::from_lng_lat(lng_lat, 0.0))
    }

    pub fn jump_to(&mut self, center: LngLat, zoom: Option<f64>) {
        self.set_center(center);
        if let Some(zoom) = zoom {
            self.set_zoom(zoom);
        }
    }

    pub fn set_center(&mut self, center: LngLat) {
        if !center.is_finite() {
            tracing::warn!(?center, "ignoring non-finite center");
            return;
        }
        self.center = LngLat::new(
            (center.lng + 180.0).rem_euclid(360.0) - 180.0,
            center.lat.clamp(-MAX_MERCATOR_LAT_DEG, MAX_MERCATOR_LAT_DEG),
        );
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.limits.min_zoom, self.limits.max_zoom);
        }
    }

    pub fn set_pitch(&mut self, pitch_deg: f64) {
        if pitch_deg.is_finite() {
            self.pitch_deg = pitch_deg.clamp(0.0, self.limits.max_pitch);
        }
    }

    /// Wraps into `(-180, 180]`.
    pub fn set_bearing(&mut self, bearing_deg: f64) {
        if !bearing_deg.is_finite() {
            return;
        }
        let b = bearing_deg.rem_euclid(360.0);
        self.bearing_deg = if b > 180.0 { b - 360.0 } else { b };
    }

    /// Moves the center by a screen-space offset in pixels.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let offset = Vec2::new(dx, dy).rotate(self.bearing_deg.to_radians());
        let world = self.world_size();
        let target = self.center_point() + offset;
        self.set_center(LngLat::new(
            lng_from_mercator_x(target.x / world),
            lat_from_mercator_y(target.y / world),
        ));
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.set_zoom(self.zoom + delta);
    }

    pub fn rotate_by(&mut self, d_bearing: f64, d_pitch: f64) {
        self.set_bearing(self.bearing_deg + d_bearing);
        self.set_pitch(self.pitch_deg + d_pitch);
    }

    pub fn resize(&mut self, size: CanvasSize) {
        self.width = f64::from(size.width.max(1));
        self.height = f64::from(size.height.max(1));
    }
}
