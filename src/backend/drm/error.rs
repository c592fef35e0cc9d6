use drm::control::{connector, crtc, RawResourceHandle};
use drm_fourcc::DrmFourcc;
use std::{io, path::PathBuf};

use super::control::KernelObject;

/// DRM access error
#[derive(Debug, thiserror::Error)]
#[error("DRM access error: {errmsg} on device `{dev:?}` ({source:})")]
pub struct AccessError {
    /// Error message associated to the access error
    pub errmsg: &'static str,
    /// Device on which the error was generated
    pub dev: Option<PathBuf>,
    /// Underlying device error
    #[source]
    pub source: io::Error,
}

/// Errors thrown while resolving and committing an output on a DRM device
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device encountered an access error
    #[error(transparent)]
    Access(#[from] AccessError),
    /// No connector is connected and exposes modes and encoders
    #[error("No connected connector with modes and encoders found")]
    NoConnectedConnector,
    /// The connector has no mode that could be chosen
    #[error("No suitable mode found for connector `{0:?}`")]
    NoSuitableMode(connector::Handle),
    /// None of the connector's encoders can drive any crtc
    #[error("No crtc available for connector `{0:?}`")]
    NoSuitableCrtc(connector::Handle),
    /// No plane compatible with the crtc is a primary plane
    #[error("No primary plane available for crtc `{0:?}`")]
    NoPrimaryPlane(crtc::Handle),
    /// Properties required to configure an object are missing
    #[error("The {object} is missing the required properties {missing:?}")]
    MissingProperties {
        /// Object lacking the properties
        object: KernelObject,
        /// Every missing property
        missing: Vec<&'static str>,
    },
    /// A property was used that is not part of the object's resolved properties
    #[error("The DrmDevice is missing a required property '{name}' for handle ({handle:?})")]
    UnknownProperty {
        /// Object handle
        handle: RawResourceHandle,
        /// Property name
        name: &'static str,
    },
    /// The kernel returned an empty blob for a mode
    #[error("The kernel returned an empty mode blob")]
    EmptyModeBlob,
    /// Storage for an atomic request could not be allocated
    #[error("Failed to allocate the atomic request")]
    RequestAllocation,
    /// An atomic request without any property was submitted
    #[error("Refusing to commit an empty atomic request")]
    EmptyRequest,
    /// The kernel rejected an atomic commit
    #[error("Atomic commit failed: {0}")]
    CommitFailed(#[source] AccessError),
    /// The format can not be used for dumb buffers
    #[error("Format {0:?} is not supported for dumb buffers")]
    UnsupportedFormat(DrmFourcc),
}

