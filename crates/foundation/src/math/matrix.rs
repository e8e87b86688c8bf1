use super::Vec3;

/// Column-major 4x4 matrix (OpenGL / gl-matrix layout).
///
/// `a * b` applies `b` first. The builder-style helpers (`translate`,
/// `scale`, `rotate_x`, ...) post-multiply, so a chain reads in the same
/// order the transforms are written in camera code.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    cols: [f64; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub const fn from_cols_array(cols: [f64; 16]) -> Self {
        Self { cols }
    }

    pub fn to_cols_array(&self) -> [f64; 16] {
        self.cols
    }

    /// Right-handed perspective projection with clip depth in `[-1, 1]`.
    pub fn perspective(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        let nf = 1.0 / (near - far);
        let mut cols = [0.0; 16];
        cols[0] = f / aspect;
        cols[5] = f;
        cols[10] = (far + near) * nf;
        cols[11] = -1.0;
        cols[14] = 2.0 * far * near * nf;
        Self { cols }
    }

    pub fn translation(v: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[12] = v.x;
        m.cols[13] = v.y;
        m.cols[14] = v.z;
        m
    }

    pub fn scaling(v: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0] = v.x;
        m.cols[5] = v.y;
        m.cols[10] = v.z;
        m
    }

    pub fn rotation_x(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self::from_cols_array([
            1.0, 0.0, 0.0, 0.0, //
            0.0, c, s, 0.0, //
            0.0, -s, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn rotation_z(angle_rad: f64) -> Self {
        let (s, c) = angle_rad.sin_cos();
        Self::from_cols_array([
            c, s, 0.0, 0.0, //
            -s, c, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn mul_mat4(&self, rhs: &Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = a[row] * b[col * 4]
                    + a[4 + row] * b[col * 4 + 1]
                    + a[8 + row] * b[col * 4 + 2]
                    + a[12 + row] * b[col * 4 + 3];
            }
        }
        Self { cols: out }
    }

    pub fn translate(self, v: Vec3) -> Self {
        self.mul_mat4(&Self::translation(v))
    }

    pub fn scale(self, v: Vec3) -> Self {
        self.mul_mat4(&Self::scaling(v))
    }

    pub fn rotate_x(self, angle_rad: f64) -> Self {
        self.mul_mat4(&Self::rotation_x(angle_rad))
    }

    pub fn rotate_z(self, angle_rad: f64) -> Self {
        self.mul_mat4(&Self::rotation_z(angle_rad))
    }

    pub fn transform_vec4(&self, v: [f64; 4]) -> [f64; 4] {
        let m = &self.cols;
        let mut out = [0.0; 4];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = m[row] * v[0] + m[4 + row] * v[1] + m[8 + row] * v[2] + m[12 + row] * v[3];
        }
        out
    }

    /// Transform a point and divide by `w`. `None` when the point is at or
    /// behind the projection plane.
    pub fn project_point(&self, p: Vec3) -> Option<Vec3> {
        let [x, y, z, w] = self.transform_vec4([p.x, p.y, p.z, 1.0]);
        if w <= f64::EPSILON {
            return None;
        }
        Some(Vec3::new(x / w, y / w, z / w))
    }

    pub fn is_finite(&self) -> bool {
        self.cols.iter().all(|v| v.is_finite())
    }

    /// Column-major `f32` layout for GPU uniforms.
    pub fn to_cols_f32(&self) -> [[f32; 4]; 4] {
        let c = &self.cols;
        [
            [c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32],
            [c[4] as f32, c[5] as f32, c[6] as f32, c[7] as f32],
            [c[8] as f32, c[9] as f32, c[10] as f32, c[11] as f32],
            [c[12] as f32, c[13] as f32, c[14] as f32, c[15] as f32],
        ]
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.mul_mat4(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::Vec3;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        let d = (a - b).length();
        assert!(d < 1e-9, "expected {a:?} ~= {b:?}");
    }

    #[test]
    fn identity_is_neutral() {
        let m = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Mat4::IDENTITY * m, m);
        assert_eq!(m * Mat4::IDENTITY, m);
    }

    #[test]
    fn chained_transforms_apply_right_to_left() {
        let m = Mat4::IDENTITY
            .translate(Vec3::new(10.0, 0.0, 0.0))
            .scale(Vec3::splat(2.0));
        let p = m.project_point(Vec3::new(1.0, 1.0, 1.0)).expect("finite w");
        assert_vec_close(p, Vec3::new(12.0, 2.0, 2.0));
    }

    #[test]
    fn rotate_z_quarter_turn_maps_x_to_y() {
        let m = Mat4::rotation_z(std::f64::consts::FRAC_PI_2);
        let p = m.project_point(Vec3::new(1.0, 0.0, 0.0)).expect("finite w");
        assert_vec_close(p, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn rotate_x_quarter_turn_maps_y_to_z() {
        let m = Mat4::rotation_x(std::f64::consts::FRAC_PI_2);
        let p = m.project_point(Vec3::new(0.0, 1.0, 0.0)).expect("finite w");
        assert_vec_close(p, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn perspective_maps_near_and_far_planes_to_clip_bounds() {
        let m = Mat4::perspective(1.0, 1.5, 2.0, 100.0);
        let near = m.project_point(Vec3::new(0.0, 0.0, -2.0)).expect("in front");
        let far = m.project_point(Vec3::new(0.0, 0.0, -100.0)).expect("in front");
        assert!((near.z + 1.0).abs() < 1e-9);
        assert!((far.z - 1.0).abs() < 1e-9);
        assert!(m.project_point(Vec3::new(0.0, 0.0, 5.0)).is_none());
    }
}
