//! Drm/Kms output resolution and modesetting
//!
//! This module resolves a usable output of a drm device and brings it up with a single atomic
//! commit.
//!
//! ## How to use it
//!
//! - [`OutputPath::resolve`] walks the kernel object graph: the first connected connector, the
//!   mode to drive it with, a crtc reachable through one of its encoders and a primary plane
//!   usable with that crtc.
//! - [`ModesetProperties::resolve`] looks up the property handles of the crtc, the connector and
//!   the plane. Objects lacking any required property are rejected.
//! - [`AtomicRequest::modeset`] builds the request showing a framebuffer on the output, which
//!   [`AtomicRequest::commit`] applies at once.
//!
//! All of this works against the [`KmsDevice`] trait, which [`DrmDeviceFd`] implements for an
//! open drm node. [`DumbFramebuffer`] provides the framebuffer shown initially.

pub mod atomic;
pub mod control;
pub(crate) mod device;
pub mod dumb;
mod error;
pub mod graph;
pub mod mode;
pub mod properties;

pub use self::atomic::{AtomicRequest, ModeBlob, RequestState};
pub use self::control::{Framebuffer, KernelObject, KmsDevice};
pub use self::device::DrmDeviceFd;
pub use self::dumb::DumbFramebuffer;
pub use self::error::*;
pub use self::graph::{GraphOptions, OutputPath};
pub use self::mode::DisplayMode;
pub use self::properties::{ModesetProperties, PropertyTable};
