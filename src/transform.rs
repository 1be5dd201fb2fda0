//! A 4x4 transformation matrix stored in row-major order.
//!
//! Used for the model/view/projection transforms that compose parent→child
//! through the render context and are handed to the graphics backend.

use crate::geom::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Matrix data in row-major order: [row0, row1, row2, row3]
    pub data: [f32; 16],
}

impl Transform {
    /// Identity matrix (no transformation)
    pub const IDENTITY: Self = Self {
        data: [
            1.0, 0.0, 0.0, 0.0, // row 0
            0.0, 1.0, 0.0, 0.0, // row 1
            0.0, 0.0, 1.0, 0.0, // row 2
            0.0, 0.0, 0.0, 1.0, // row 3
        ],
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Create a translation transform
    pub fn translate(x: f32, y: f32, z: f32) -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, x, // row 0
                0.0, 1.0, 0.0, y, // row 1
                0.0, 0.0, 1.0, z, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Create a non-uniform scale transform
    pub fn scale(sx: f32, sy: f32, sz: f32) -> Self {
        Self {
            data: [
                sx, 0.0, 0.0, 0.0, // row 0
                0.0, sy, 0.0, 0.0, // row 1
                0.0, 0.0, sz, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Create a rotation transform around the Z axis (2D rotation)
    pub fn rotate_z(angle_radians: f32) -> Self {
        Self::rotation_euler(0.0, 0.0, angle_radians)
    }

    /// Create a rotation transform from Euler angles (radians), routed
    /// through a quaternion so composed axes stay normalized.
    ///
    /// Applies x (pitch), then y (yaw), then z (roll).
    pub fn rotation_euler(x: f32, y: f32, z: f32) -> Self {
        Quat::from_euler(x, y, z).to_matrix()
    }

    /// Compose a translate × rotate × scale matrix with an optional origin
    /// pre-translation: `T(position) * R(rotation) * S(scale) * T(-origin)`.
    ///
    /// The origin shifts the pivot that rotation and scale act around.
    pub fn trs(position: Vec3, rotation: Vec3, scale: Vec3, origin: Vec3) -> Self {
        let mut m = Self::translate(position.x, position.y, position.z);
        if rotation != Vec3::ZERO {
            m = m.then(&Self::rotation_euler(rotation.x, rotation.y, rotation.z));
        }
        if scale != Vec3::ONE {
            m = m.then(&Self::scale(scale.x, scale.y, scale.z));
        }
        if origin != Vec3::ZERO {
            m = m.then(&Self::translate(-origin.x, -origin.y, -origin.z));
        }
        m
    }

    /// An orthographic projection mapping the given volume to NDC.
    ///
    /// For a y-down canvas pass `(0, width, height, 0, near, far)`.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rl = right - left;
        let tb = top - bottom;
        let fne = far - near;
        Self {
            data: [
                2.0 / rl,
                0.0,
                0.0,
                -(right + left) / rl,
                0.0,
                2.0 / tb,
                0.0,
                -(top + bottom) / tb,
                0.0,
                0.0,
                -2.0 / fne,
                -(far + near) / fne,
                0.0,
                0.0,
                0.0,
                1.0,
            ],
        }
    }

    /// A right-handed perspective projection.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y * 0.5).tan();
        let nf = near - far;
        Self {
            data: [
                f / aspect,
                0.0,
                0.0,
                0.0,
                0.0,
                f,
                0.0,
                0.0,
                0.0,
                0.0,
                (far + near) / nf,
                2.0 * far * near / nf,
                0.0,
                0.0,
                -1.0,
                0.0,
            ],
        }
    }

    /// Compose this transform with another: self * other.
    /// Applies `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Transform {
        let a = &self.data;
        let b = &other.data;

        // Matrix multiplication: result[i][j] = sum(a[i][k] * b[k][j])
        // Row-major indexing: element at row i, col j is at index i*4 + j
        let mut result = [0.0f32; 16];

        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[i * 4 + k] * b[k * 4 + j];
                }
                result[i * 4 + j] = sum;
            }
        }

        Transform { data: result }
    }

    /// Compute the full inverse of this transform via cofactor expansion.
    ///
    /// Returns identity when the matrix is singular (zero determinant).
    pub fn inverse(&self) -> Transform {
        let m = &self.data;
        let mut inv = [0.0f32; 16];

        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];
        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];
        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];
        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];
        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];

        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det.abs() < 1e-12 {
            return Self::IDENTITY;
        }
        let inv_det = 1.0 / det;
        for v in &mut inv {
            *v *= inv_det;
        }
        Transform { data: inv }
    }

    /// Transform a 3D point by this matrix, assuming w=1 and ignoring the
    /// resulting w. Correct for affine transforms only; use [`Self::project`]
    /// for projective ones.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let m = &self.data;
        Vec3::new(
            m[0] * p.x + m[1] * p.y + m[2] * p.z + m[3],
            m[4] * p.x + m[5] * p.y + m[6] * p.z + m[7],
            m[8] * p.x + m[9] * p.y + m[10] * p.z + m[11],
        )
    }

    /// Transform a direction (w=0): rotation and scale only, no translation.
    pub fn transform_direction(&self, d: Vec3) -> Vec3 {
        let m = &self.data;
        Vec3::new(
            m[0] * d.x + m[1] * d.y + m[2] * d.z,
            m[4] * d.x + m[5] * d.y + m[6] * d.z,
            m[8] * d.x + m[9] * d.y + m[10] * d.z,
        )
    }

    /// Full projective transform with perspective divide.
    ///
    /// Returns false (leaving `out` untouched) when the resulting w is zero.
    pub fn project(&self, p: Vec3, out: &mut Vec3) -> bool {
        let m = &self.data;
        let w = m[12] * p.x + m[13] * p.y + m[14] * p.z + m[15];
        if w == 0.0 {
            return false;
        }
        let inv_w = 1.0 / w;
        out.x = (m[0] * p.x + m[1] * p.y + m[2] * p.z + m[3]) * inv_w;
        out.y = (m[4] * p.x + m[5] * p.y + m[6] * p.z + m[7]) * inv_w;
        out.z = (m[8] * p.x + m[9] * p.y + m[10] * p.z + m[11]) * inv_w;
        true
    }

    /// Get the rows of the matrix for passing to the graphics backend
    pub fn rows(&self) -> [[f32; 4]; 4] {
        [
            [self.data[0], self.data[1], self.data[2], self.data[3]],
            [self.data[4], self.data[5], self.data[6], self.data[7]],
            [self.data[8], self.data[9], self.data[10], self.data[11]],
            [self.data[12], self.data[13], self.data[14], self.data[15]],
        ]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Minimal quaternion, only used to build rotation matrices from Euler angles.
#[derive(Clone, Copy, Debug)]
struct Quat {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

impl Quat {
    fn from_euler(x: f32, y: f32, z: f32) -> Self {
        let (sx, cx) = (x * 0.5).sin_cos();
        let (sy, cy) = (y * 0.5).sin_cos();
        let (sz, cz) = (z * 0.5).sin_cos();
        // q = qz * qy * qx
        Self {
            x: sx * cy * cz + cx * sy * sz,
            y: cx * sy * cz - sx * cy * sz,
            z: cx * cy * sz + sx * sy * cz,
            w: cx * cy * cz - sx * sy * sz,
        }
    }

    fn to_matrix(self) -> Transform {
        let Self { x, y, z, w } = self;
        let (x2, y2, z2) = (x + x, y + y, z + z);
        let (xx, yy, zz) = (x * x2, y * y2, z * z2);
        let (xy, xz, yz) = (x * y2, x * z2, y * z2);
        let (wx, wy, wz) = (w * x2, w * y2, w * z2);
        Transform {
            data: [
                1.0 - (yy + zz),
                xy - wz,
                xz + wy,
                0.0,
                xy + wz,
                1.0 - (xx + zz),
                yz - wx,
                0.0,
                xz - wy,
                yz + wx,
                1.0 - (xx + yy),
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn approx_vec(a: Vec3, b: Vec3) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
    }

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t, Transform::IDENTITY);
        assert!(t.is_identity());
    }

    #[test]
    fn test_translate() {
        let t = Transform::translate(10.0, 20.0, 5.0);
        let p = t.transform_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(approx_vec(p, Vec3::new(11.0, 22.0, 8.0)));
    }

    #[test]
    fn test_rotate_z_matches_2d_rotation() {
        let t = Transform::rotate_z(std::f32::consts::FRAC_PI_2);
        let p = t.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert!(approx_vec(p, Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_rotation_euler_x() {
        let t = Transform::rotation_euler(std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        let p = t.transform_point(Vec3::new(0.0, 1.0, 0.0));
        assert!(approx_vec(p, Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_compose() {
        // scale.then(translate): first translate, then scale
        let translate = Transform::translate(10.0, 0.0, 0.0);
        let scale = Transform::scale(2.0, 2.0, 2.0);
        let composed = scale.then(&translate);
        let p = composed.transform_point(Vec3::ZERO);
        assert!(approx_vec(p, Vec3::new(20.0, 0.0, 0.0)));
    }

    #[test]
    fn test_trs_origin_is_pivot() {
        // Scaling 2x around origin (5, 5, 0): the pivot itself maps back to
        // the position, points away from the pivot move twice as far.
        let m = Transform::trs(
            Vec3::new(5.0, 5.0, 0.0),
            Vec3::ZERO,
            Vec3::new(2.0, 2.0, 1.0),
            Vec3::new(5.0, 5.0, 0.0),
        );
        assert!(approx_vec(
            m.transform_point(Vec3::new(5.0, 5.0, 0.0)),
            Vec3::new(5.0, 5.0, 0.0)
        ));
        assert!(approx_vec(
            m.transform_point(Vec3::new(6.0, 5.0, 0.0)),
            Vec3::new(7.0, 5.0, 0.0)
        ));
    }

    #[test]
    fn test_inverse_trs_roundtrip() {
        let m = Transform::trs(
            Vec3::new(3.0, -2.0, 1.0),
            Vec3::new(0.2, 0.4, 1.1),
            Vec3::new(2.0, 0.5, 1.5),
            Vec3::new(1.0, 1.0, 0.0),
        );
        let inv = m.inverse();
        let p = Vec3::new(7.0, 11.0, -4.0);
        let roundtrip = inv.transform_point(m.transform_point(p));
        assert!(approx_vec(roundtrip, p));
    }

    #[test]
    fn test_inverse_singular_returns_identity() {
        let m = Transform::scale(0.0, 1.0, 1.0);
        assert_eq!(m.inverse(), Transform::IDENTITY);
    }

    #[test]
    fn test_orthographic_y_down_maps_corners() {
        // Canvas-style projection: (0,0) top-left → (-1, 1) NDC.
        let m = Transform::orthographic(0.0, 800.0, 600.0, 0.0, -1.0, 1.0);
        let tl = m.transform_point(Vec3::ZERO);
        assert!(approx_vec(tl, Vec3::new(-1.0, 1.0, 0.0)));
        let br = m.transform_point(Vec3::new(800.0, 600.0, 0.0));
        assert!(approx_vec(br, Vec3::new(1.0, -1.0, 0.0)));
    }

    #[test]
    fn test_perspective_projects_center() {
        let m = Transform::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let mut out = Vec3::ZERO;
        assert!(m.project(Vec3::new(0.0, 0.0, -10.0), &mut out));
        assert!(approx_eq(out.x, 0.0));
        assert!(approx_eq(out.y, 0.0));
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let vp = Transform::perspective(1.0, 1.5, 0.1, 100.0);
        let inv = vp.inverse();
        let p = Vec3::new(1.0, -2.0, -10.0);
        let mut ndc = Vec3::ZERO;
        assert!(vp.project(p, &mut ndc));
        let mut back = Vec3::ZERO;
        assert!(inv.project(ndc, &mut back));
        assert!(approx_vec(back, p));
    }

    #[test]
    fn test_rows() {
        let t = Transform::translate(1.0, 2.0, 3.0);
        let rows = t.rows();
        assert_eq!(rows[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(rows[1], [0.0, 1.0, 0.0, 2.0]);
        assert_eq!(rows[2], [0.0, 0.0, 1.0, 3.0]);
        assert_eq!(rows[3], [0.0, 0.0, 0.0, 1.0]);
    }
}
