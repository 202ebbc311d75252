pub mod matrix;

pub use matrix::{identity, look_at, orthographic, rotate_x, rotate_y, rotate_z, to_radians};
