//! Backend helpers for bringing up a display without a windowing system
//!
//! - [`egl`] negotiates the EGL extensions and device functions required to drive a drm device
//!   through EGL, and finds the drm node backing the selected EGL device.
//! - [`drm`] resolves a usable output of that node and performs the initial atomic modeset.

pub mod drm;
pub mod egl;

#[cfg(test)]
pub(crate) mod testing;
