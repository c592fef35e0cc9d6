//! Kernel display objects as seen by the output negotiation
//!
//! [`KmsDevice`] is the view of a DRM device needed to resolve an output and commit it.
//! [`DrmDeviceFd`](super::DrmDeviceFd) implements it on top of the `drm` crate.

use std::fmt;

use drm::control::{
    connector, crtc, encoder, framebuffer, plane, property, AtomicCommitFlags, RawResourceHandle,
};
use drm_fourcc::DrmFourcc;

use super::{mode::DisplayMode, properties, Error};

/// Connectors and crtcs of a device, in kernel enumeration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    /// All connectors
    pub connectors: Vec<connector::Handle>,
    /// All crtcs, the position of a crtc is its index in crtc masks
    pub crtcs: Vec<crtc::Handle>,
}

/// State of a connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorInfo {
    /// Handle of the connector
    pub handle: connector::Handle,
    /// Connection state
    pub state: connector::State,
    /// Supported modes
    pub modes: Vec<DisplayMode>,
    /// Encoders able to drive the connector
    pub encoders: Vec<encoder::Handle>,
    /// Encoder currently driving the connector
    pub current_encoder: Option<encoder::Handle>,
}

impl ConnectorInfo {
    /// Returns `true` if something is connected and the connector can be driven at all.
    pub fn is_usable(&self) -> bool {
        self.state == connector::State::Connected && !self.modes.is_empty() && !self.encoders.is_empty()
    }
}

/// State of an encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderInfo {
    /// Handle of the encoder
    pub handle: encoder::Handle,
    /// Bit `n` is set if the crtc at index `n` of [`Resources::crtcs`] can drive this encoder
    pub possible_crtcs: u32,
    /// Crtc currently driving the encoder
    pub crtc: Option<crtc::Handle>,
}

/// State of a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneInfo {
    /// Handle of the plane
    pub handle: plane::Handle,
    /// Bit `n` is set if the plane can be used with the crtc at index `n` of [`Resources::crtcs`]
    pub possible_crtcs: u32,
}

/// A property of an object with its current value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    /// Property handle
    pub handle: property::Handle,
    /// Property name
    pub name: String,
    /// Raw current value
    pub value: u64,
}

/// Kernel object carrying properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelObject {
    /// A crtc
    Crtc(crtc::Handle),
    /// A connector
    Connector(connector::Handle),
    /// A plane
    Plane(plane::Handle),
}

impl KernelObject {
    /// Returns the raw object id.
    pub fn raw(&self) -> RawResourceHandle {
        match *self {
            KernelObject::Crtc(handle) => handle.into(),
            KernelObject::Connector(handle) => handle.into(),
            KernelObject::Plane(handle) => handle.into(),
        }
    }

    /// Returns the properties an object of this kind needs for a modeset.
    pub fn required_properties(&self) -> &'static [&'static str] {
        match self {
            KernelObject::Crtc(_) => properties::CRTC_PROPERTIES,
            KernelObject::Connector(_) => properties::CONNECTOR_PROPERTIES,
            KernelObject::Plane(_) => properties::PLANE_PROPERTIES,
        }
    }

    /// Fetches the current properties of the object.
    pub fn fetch_properties<K: KmsDevice + ?Sized>(&self, device: &K) -> Result<Vec<PropertyEntry>, Error> {
        device.properties(*self)
    }

    fn kind(&self) -> &'static str {
        match self {
            KernelObject::Crtc(_) => "crtc",
            KernelObject::Connector(_) => "connector",
            KernelObject::Plane(_) => "plane",
        }
    }
}

impl fmt::Display for KernelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.raw())
    }
}

impl From<crtc::Handle> for KernelObject {
    fn from(handle: crtc::Handle) -> Self {
        KernelObject::Crtc(handle)
    }
}

impl From<connector::Handle> for KernelObject {
    fn from(handle: connector::Handle) -> Self {
        KernelObject::Connector(handle)
    }
}

impl From<plane::Handle> for KernelObject {
    fn from(handle: plane::Handle) -> Self {
        KernelObject::Plane(handle)
    }
}

/// One property value of an atomic request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyAssignment {
    /// Object the property belongs to
    pub object: KernelObject,
    /// Property handle
    pub property: property::Handle,
    /// New raw value
    pub value: u64,
}

/// Framebuffer usable for scan-out
pub trait Framebuffer: AsRef<framebuffer::Handle> + fmt::Debug {
    /// Pixel format of the framebuffer
    fn format(&self) -> DrmFourcc;

    /// Size of the framebuffer in pixels
    fn size(&self) -> (u32, u32);

    /// Fills the whole framebuffer with one color, given as `[r, g, b, a]`.
    fn clear(&mut self, color: [u8; 4]) -> Result<(), Error>;
}

/// Kernel display object interface of a DRM device
pub trait KmsDevice {
    /// Framebuffer type created by [`KmsDevice::create_framebuffer`]
    type Framebuffer: Framebuffer;

    /// Enables the universal planes and atomic client capabilities.
    ///
    /// Primary planes, the atomic-only properties and atomic commits are only available after
    /// this succeeded.
    fn enable_atomic(&self) -> Result<(), Error>;

    /// Returns all connectors and crtcs.
    fn resources(&self) -> Result<Resources, Error>;

    /// Returns all planes.
    fn planes(&self) -> Result<Vec<plane::Handle>, Error>;

    /// Returns the state of a connector, optionally forcing the kernel to probe it again.
    fn connector(&self, handle: connector::Handle, force_probe: bool) -> Result<ConnectorInfo, Error>;

    /// Returns the state of an encoder.
    fn encoder(&self, handle: encoder::Handle) -> Result<EncoderInfo, Error>;

    /// Returns the state of a plane.
    fn plane(&self, handle: plane::Handle) -> Result<PlaneInfo, Error>;

    /// Returns the properties of an object and their current values.
    fn properties(&self, object: KernelObject) -> Result<Vec<PropertyEntry>, Error>;

    /// Registers a mode with the kernel and returns the id of the created blob.
    fn create_mode_blob(&self, mode: &DisplayMode) -> Result<u64, Error>;

    /// Applies all assignments at once, or none of them.
    fn commit_properties(
        &self,
        flags: AtomicCommitFlags,
        assignments: &[PropertyAssignment],
    ) -> Result<(), Error>;

    /// Creates a cpu accessible framebuffer.
    fn create_framebuffer(&self, size: (u32, u32), format: DrmFourcc) -> Result<Self::Framebuffer, Error>;
}
