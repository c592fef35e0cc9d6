//! Establishing a display pipeline
//!
//! A [`Negotiation`] carries everything needed to bring up one output: the EGL implementation
//! and the [`NegotiationConfig`]. [`Negotiation::establish`] runs the stages in order and
//! returns the live [`Pipeline`]:
//!
//! 1. EGL capability negotiation, selecting a device backed by a drm node,
//! 2. opening that drm node and enabling atomic modesetting on it,
//! 3. resolving an output path,
//! 4. creating the bootstrap framebuffer,
//! 5. resolving the property handles of the crtc, connector and plane,
//! 6. one atomic commit binding mode, connector, crtc, plane and framebuffer.
//!
//! A failing stage aborts the negotiation, no later stage is run.
//!
//! ```no_run
//! use kms_pipeline::{backend::egl::NativeEgl, pipeline::{Negotiation, NegotiationConfig}};
//!
//! let egl = NativeEgl::load()?;
//! let pipeline = Negotiation::new(&egl, NegotiationConfig::default()).establish_drm()?;
//! println!("Output is live on {:?}", pipeline.output().crtc);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    io,
    path::{Path, PathBuf},
};

use drm::control::AtomicCommitFlags;
use drm_fourcc::DrmFourcc;
use tracing::{debug, info, instrument};

use crate::backend::{
    drm::{
        AtomicRequest, DrmDeviceFd, Error as DrmError, Framebuffer, GraphOptions, KmsDevice, ModeBlob,
        ModesetProperties, OutputPath,
    },
    egl::{negotiate, EGLDevice, EglDriver, Error as EglError, ExtensionFunctions, NegotiatedDevice},
};

/// Configuration of a [`Negotiation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationConfig {
    /// Format of the bootstrap framebuffer
    pub framebuffer_format: DrmFourcc,
    /// How the output path is resolved
    pub graph: GraphOptions,
    /// Check the modeset with a test-only commit before applying it
    pub test_commit: bool,
    /// Color the bootstrap framebuffer is filled with, as `[r, g, b, a]`
    ///
    /// `None` leaves the buffer contents undefined.
    pub clear_color: Option<[u8; 4]>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        NegotiationConfig {
            framebuffer_format: DrmFourcc::Xrgb8888,
            graph: GraphOptions::default(),
            test_commit: true,
            clear_color: Some([0, 0, 0, 0xff]),
        }
    }
}

/// Failures of system resources during a negotiation
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The EGL implementation failed
    #[error("EGL failure: {0}")]
    Egl(#[source] EglError),
    /// The drm node could not be opened
    #[error("Failed to open drm device {}", path.display())]
    Open {
        /// Path of the drm node
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// The drm device failed
    #[error("DRM failure: {0}")]
    Drm(#[source] DrmError),
}

/// Reasons a negotiation is aborted
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required extension, function or device capability is missing
    #[error("Required capability missing: {0}")]
    CapabilityMissing(#[source] EglError),
    /// No connector, crtc or primary plane could be used
    #[error("No usable output: {0}")]
    NoUsableOutput(#[source] DrmError),
    /// An object lacks properties required for the modeset
    #[error("Failed to resolve properties: {0}")]
    PropertyResolution(#[source] DrmError),
    /// The atomic request could not be built or was rejected
    #[error("Atomic transaction failed: {0}")]
    Transaction(#[source] DrmError),
    /// A system resource failed
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl From<EglError> for Error {
    fn from(err: EglError) -> Self {
        match err {
            EglError::EglExtensionNotSupported { .. }
            | EglError::FunctionsMissing(_)
            | EglError::NoDevices
            | EglError::NoSuitableDevice(_)
            | EglError::EmptyDeviceProperty => Error::CapabilityMissing(err),
            err => Error::Resource(ResourceError::Egl(err)),
        }
    }
}

/// A live output
///
/// Owns the drm device and the bootstrap framebuffer, both are released on drop.
#[derive(Debug)]
pub struct Pipeline<K: KmsDevice> {
    device: EGLDevice,
    functions: ExtensionFunctions,
    drm_path: PathBuf,
    output: OutputPath,
    properties: ModesetProperties,
    mode_blob: ModeBlob,
    framebuffer: K::Framebuffer,
    kms: K,
}

impl<K: KmsDevice> Pipeline<K> {
    /// The negotiated EGL device
    pub fn egl_device(&self) -> &EGLDevice {
        &self.device
    }

    /// Resolved EGL extension functions
    pub fn functions(&self) -> &ExtensionFunctions {
        &self.functions
    }

    /// Path of the drm node backing the EGL device
    pub fn drm_path(&self) -> &Path {
        &self.drm_path
    }

    /// The output that was brought up
    pub fn output(&self) -> &OutputPath {
        &self.output
    }

    /// Property handles of the output's objects
    pub fn properties(&self) -> &ModesetProperties {
        &self.properties
    }

    /// Blob of the active mode
    pub fn mode_blob(&self) -> ModeBlob {
        self.mode_blob
    }

    /// Framebuffer shown since the modeset
    pub fn framebuffer(&self) -> &K::Framebuffer {
        &self.framebuffer
    }

    /// The drm device
    pub fn kms(&self) -> &K {
        &self.kms
    }
}

/// Negotiation of one display pipeline
#[derive(Debug)]
pub struct Negotiation<'a, D: ?Sized> {
    driver: &'a D,
    config: NegotiationConfig,
}

impl<'a, D: EglDriver + ?Sized> Negotiation<'a, D> {
    /// Prepares a negotiation against an EGL implementation.
    pub fn new(driver: &'a D, config: NegotiationConfig) -> Negotiation<'a, D> {
        Negotiation { driver, config }
    }

    /// Establishes the pipeline, opening the negotiated drm node with `open`.
    pub fn establish<K, F>(self, open: F) -> Result<Pipeline<K>, Error>
    where
        K: KmsDevice,
        F: FnOnce(&Path) -> io::Result<K>,
    {
        let NegotiatedDevice {
            device,
            functions,
            drm_path,
        } = negotiate(self.driver)?;

        let kms = open(&drm_path).map_err(|source| ResourceError::Open {
            path: drm_path.clone(),
            source,
        })?;

        let (output, properties, mode_blob, framebuffer) = self.bring_up(&kms)?;
        info!(
            "Pipeline established on {}, connector {:?}",
            drm_path.display(),
            output.connector
        );

        Ok(Pipeline {
            device,
            functions,
            drm_path,
            output,
            properties,
            mode_blob,
            framebuffer,
            kms,
        })
    }

    /// Establishes the pipeline on the drm node reported by the EGL device.
    pub fn establish_drm(self) -> Result<Pipeline<DrmDeviceFd>, Error> {
        self.establish(|path| DrmDeviceFd::open(path))
    }

    #[instrument(level = "debug", skip_all)]
    fn bring_up<K: KmsDevice>(
        &self,
        kms: &K,
    ) -> Result<(OutputPath, ModesetProperties, ModeBlob, K::Framebuffer), Error> {
        kms.enable_atomic().map_err(ResourceError::Drm)?;

        let output = OutputPath::resolve(kms, self.config.graph).map_err(Error::NoUsableOutput)?;

        let mut framebuffer = kms
            .create_framebuffer(output.mode.size(), self.config.framebuffer_format)
            .map_err(ResourceError::Drm)?;
        if let Some(color) = self.config.clear_color {
            framebuffer.clear(color).map_err(ResourceError::Drm)?;
        }

        let properties = ModesetProperties::resolve(kms, output.crtc, output.connector, output.plane)
            .map_err(Error::PropertyResolution)?;

        let mode_blob = ModeBlob::create(kms, &output.mode).map_err(Error::Transaction)?;
        let mut request = AtomicRequest::new(kms).map_err(Error::Transaction)?;
        request
            .modeset(&properties, &output, &mode_blob, &framebuffer)
            .map_err(Error::Transaction)?;

        if self.config.test_commit {
            request
                .test(AtomicCommitFlags::ALLOW_MODESET)
                .map_err(Error::Transaction)?;
            debug!("Modeset passed the test commit");
        }
        request
            .commit(AtomicCommitFlags::ALLOW_MODESET)
            .map_err(Error::Transaction)?;

        Ok((output, properties, mode_blob, framebuffer))
    }
}
