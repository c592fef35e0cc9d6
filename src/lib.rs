#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
// Allow acronyms like EGL
#![allow(clippy::upper_case_acronyms)]

//! # kms-pipeline: EGL negotiation and atomic modesetting
//!
//! This crate brings up a display on a drm device driven through EGL streams. It checks that the
//! EGL implementation offers the device and output extensions, picks the EGL device backed by a
//! drm node, resolves a connector → crtc → primary plane path on that node and shows a dumb
//! framebuffer on it with a single atomic commit.
//!
//! ## Structure of the crate
//!
//! - [`backend::egl`] contains the EGL capability checks and device selection.
//! - [`backend::drm`] contains the kernel object graph resolution, the property lookup and the
//!   atomic request.
//! - [`pipeline`] chains both into one call, see [`pipeline::Negotiation`].
//!
//! Both backends are written against traits ([`backend::egl::EglDriver`] and
//! [`backend::drm::KmsDevice`]), the implementations talking to `libEGL` and the kernel being
//! [`backend::egl::NativeEgl`] and [`backend::drm::DrmDeviceFd`].
//!
//! ### Logging
//!
//! This crate makes extensive use of [`tracing`] for its internal logging. Every stage runs in
//! its own span (`egl_negotiate`, `drm_graph`, `drm_atomic`).
//!
//! For release builds it is recommended to limit the log level during compile time.
//! This can be done by adding a dependency to [`tracing`] and enabling the corresponding features.
//! For example to enable `trace` messages for debug builds, but limit release builds to `debug` add
//! the following in your binary crate `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tracing = { version = "0.1", features = ["max_level_trace", "release_max_level_debug"] }
//! ```
//!
//! If you do not want to use [`tracing`], refer to [`log compatibility`](tracing#log-compatibility)
//! for how to forward the debug output to other `log` compatible frameworks.

pub mod backend;
pub mod pipeline;
pub mod utils;
