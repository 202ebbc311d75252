//! Transform construction for the viewer.
//!
//! Matrices are column-major `glam::Mat4` and act on column vectors, so a
//! rotation applied with [`rotate_x`] is `mat * rot`: successive calls
//! accumulate in the model's local frame.

use glam::{Mat4, Vec3, Vec4};

pub fn to_radians(degrees: f32) -> f32 {
    degrees * (std::f32::consts::PI / 180.0)
}

pub fn identity() -> Mat4 {
    Mat4::IDENTITY
}

/// Right-multiplies `mat` by a right-handed rotation about X.
pub fn rotate_x(mat: Mat4, rad: f32) -> Mat4 {
    let (s, c) = rad.sin_cos();
    let rot = Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, c, s, 0.0),
        Vec4::new(0.0, -s, c, 0.0),
        Vec4::W,
    );
    mat * rot
}

/// Right-multiplies `mat` by a right-handed rotation about Y.
pub fn rotate_y(mat: Mat4, rad: f32) -> Mat4 {
    let (s, c) = rad.sin_cos();
    let rot = Mat4::from_cols(
        Vec4::new(c, 0.0, -s, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(s, 0.0, c, 0.0),
        Vec4::W,
    );
    mat * rot
}

/// Right-multiplies `mat` by a right-handed rotation about Z.
pub fn rotate_z(mat: Mat4, rad: f32) -> Mat4 {
    let (s, c) = rad.sin_cos();
    let rot = Mat4::from_cols(
        Vec4::new(c, s, 0.0, 0.0),
        Vec4::new(-s, c, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::W,
    );
    mat * rot
}

/// View matrix placing `eye` at the origin and looking down +Z at `center`.
///
/// `right` is `up x forward`; screen X is its negation so a right-handed
/// world is not mirrored on screen.
pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
    let forward = (center - eye).normalize();
    let right = up.cross(forward).normalize();
    let up = forward.cross(right);

    Mat4::from_cols(
        Vec4::new(-right.x, up.x, forward.x, 0.0),
        Vec4::new(-right.y, up.y, forward.y, 0.0),
        Vec4::new(-right.z, up.z, forward.z, 0.0),
        Vec4::new(right.dot(eye), -up.dot(eye), -forward.dot(eye), 1.0),
    )
}

/// Maps the box `[left, right] x [bottom, top] x [near, far]` onto
/// `[-1, 1]` on every axis. Each plane pair must be distinct.
pub fn orthographic(left: i32, right: i32, bottom: i32, top: i32, near: i32, far: i32) -> Mat4 {
    let (l, r) = (left as f32, right as f32);
    let (b, t) = (bottom as f32, top as f32);
    let (n, f) = (near as f32, far as f32);

    let rl = 1.0 / (r - l);
    let tb = 1.0 / (t - b);
    let fn_ = 1.0 / (f - n);

    Mat4::from_cols(
        Vec4::new(2.0 * rl, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * tb, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 2.0 * fn_, 0.0),
        Vec4::new(-(r + l) * rl, -(t + b) * tb, -(f + n) * fn_, 1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn sample_matrix() -> Mat4 {
        rotate_y(rotate_x(identity(), to_radians(33.0)), to_radians(-71.0))
    }

    #[test]
    fn test_to_radians() {
        assert!((to_radians(180.0) - std::f32::consts::PI).abs() < 1e-6);
        assert_eq!(to_radians(0.0), 0.0);
    }

    #[test]
    fn test_rotation_composes() {
        let m = sample_matrix();
        for (a, b) in [(0.3, 1.1), (-2.0, 0.7), (4.0, 5.5)] {
            assert!(rotate_x(rotate_x(m, a), b).abs_diff_eq(rotate_x(m, a + b), EPS));
            assert!(rotate_y(rotate_y(m, a), b).abs_diff_eq(rotate_y(m, a + b), EPS));
            assert!(rotate_z(rotate_z(m, a), b).abs_diff_eq(rotate_z(m, a + b), EPS));
        }
    }

    #[test]
    fn test_zero_rotation_is_noop() {
        let m = sample_matrix();
        assert_eq!(rotate_x(m, 0.0), m);
        assert_eq!(rotate_y(m, 0.0), m);
        assert_eq!(rotate_z(m, 0.0), m);
    }

    #[test]
    fn test_full_revolution_in_half_degree_steps() {
        let start = sample_matrix();
        let step = to_radians(0.5);

        let mut mx = start;
        let mut my = start;
        let mut mz = start;
        for _ in 0..720 {
            mx = rotate_x(mx, step);
            my = rotate_y(my, step);
            mz = rotate_z(mz, step);
        }

        assert!(mx.abs_diff_eq(start, 1e-3));
        assert!(my.abs_diff_eq(start, 1e-3));
        assert!(mz.abs_diff_eq(start, 1e-3));
    }

    #[test]
    fn test_rotations_follow_right_hand_rule() {
        let quarter = to_radians(90.0);

        let y_to_z = rotate_x(identity(), quarter) * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(y_to_z.abs_diff_eq(Vec4::new(0.0, 0.0, 1.0, 1.0), EPS));

        let z_to_x = rotate_y(identity(), quarter) * Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert!(z_to_x.abs_diff_eq(Vec4::new(1.0, 0.0, 0.0, 1.0), EPS));

        let x_to_y = rotate_z(identity(), quarter) * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!(x_to_y.abs_diff_eq(Vec4::new(0.0, 1.0, 0.0, 1.0), EPS));
    }

    #[test]
    fn test_look_at_default_camera() {
        let view = look_at(Vec3::new(0.0, 0.0, -1.0), Vec3::ZERO, Vec3::Y);

        let eye = view * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!(eye.abs_diff_eq(Vec4::new(0.0, 0.0, 0.0, 1.0), EPS));

        let center = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(center.abs_diff_eq(Vec4::new(0.0, 0.0, 1.0, 1.0), EPS));

        // Looking down +Z in a right-handed world puts +X on the left.
        let x = view * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!(x.x < 0.0);

        let y = view * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(y.abs_diff_eq(Vec4::new(0.0, 1.0, 1.0, 1.0), EPS));
    }

    #[test]
    fn test_look_at_is_rigid() {
        let view = look_at(Vec3::new(3.0, -2.0, 5.0), Vec3::new(0.5, 1.0, 0.0), Vec3::Y);
        let rotation = glam::Mat3::from_mat4(view);
        assert!((rotation.determinant().abs() - 1.0).abs() < EPS);
        assert!((rotation * rotation.transpose()).abs_diff_eq(glam::Mat3::IDENTITY, EPS));
    }

    #[test]
    fn test_symmetric_orthographic() {
        let n = 200;
        let proj = orthographic(-n, n, -n, n, -n, n);
        let inv = 1.0 / n as f32;

        assert!((proj.x_axis.x - inv).abs() < 1e-7);
        assert!((proj.y_axis.y - inv).abs() < 1e-7);
        assert!((proj.z_axis.z - inv).abs() < 1e-7);
        assert_eq!(proj.w_axis, Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_orthographic_maps_box_corners() {
        let proj = orthographic(-10, 30, 0, 20, 1, 5);

        let low = proj * Vec4::new(-10.0, 0.0, 1.0, 1.0);
        assert!(low.abs_diff_eq(Vec4::new(-1.0, -1.0, -1.0, 1.0), EPS));

        let high = proj * Vec4::new(30.0, 20.0, 5.0, 1.0);
        assert!(high.abs_diff_eq(Vec4::new(1.0, 1.0, 1.0, 1.0), EPS));
    }
}
