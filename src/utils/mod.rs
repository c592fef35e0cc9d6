//! Various utilities functions and types

mod fd;

pub use self::fd::{DevPath, DeviceFd};
