//! EGL capability negotiation
//!
//! Before a DRM device can be driven through EGLStreams, the EGL implementation has to prove it
//! supports everything needed on the way:
//!
//! - the client extensions to enumerate devices and create device platform displays
//!   ([`validate_client_extensions`]),
//! - the extension functions to query devices and to connect streams to output layers
//!   ([`ExtensionFunctions`]),
//! - a device exposing the DRM device file it is backed by ([`select_drm_device`]).
//!
//! [`negotiate`] runs these steps in order against any [`EglDriver`]. With the `backend_egl`
//! feature [`NativeEgl`] provides the system libEGL, loaded at runtime.
//!
//! ## Logging
//!
//! Debug messages of the EGL implementation are forwarded into `tracing` with the
//! `backend_egl` target, if it supports `EGL_KHR_debug`.

pub mod device;
pub mod driver;
mod error;
pub mod extensions;
pub mod functions;
pub mod negotiate;

#[cfg(feature = "backend_egl")]
#[allow(non_camel_case_types, dead_code, unused_mut, non_upper_case_globals)]
pub mod ffi;
#[cfg(feature = "backend_egl")]
mod native;

pub use self::device::{select_drm_device, Devices, EGLDevice};
pub use self::driver::{DeviceHandle, EglDriver};
pub use self::error::*;
#[cfg(feature = "backend_egl")]
pub(crate) use self::error::{wrap_egl_call, wrap_egl_call_bool, wrap_egl_call_ptr};
pub use self::extensions::ExtensionScope;
pub use self::functions::{ExtensionFunctions, ProcAddress};
pub use self::negotiate::{negotiate, validate_client_extensions, NegotiatedDevice};
#[cfg(feature = "backend_egl")]
pub use self::native::NativeEgl;
