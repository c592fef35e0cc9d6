//! Entry points of the EGL extension functions needed to drive an output through EGLStreams

use std::{os::raw::c_void, ptr::NonNull};

use tracing::{trace, warn};

use super::{EglDriver, Error};

/// Non-null address of an EGL function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcAddress(NonNull<c_void>);

impl ProcAddress {
    /// Wraps a raw address, returning `None` for null.
    pub fn new(ptr: *const c_void) -> Option<ProcAddress> {
        NonNull::new(ptr as *mut c_void).map(ProcAddress)
    }

    /// Returns the raw address
    pub fn as_ptr(&self) -> *const c_void {
        self.0.as_ptr()
    }
}

/// Resolved extension functions
///
/// Every field is `None` until [`ExtensionFunctions::resolve`] succeeded, after which all of
/// them are set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionFunctions {
    /// `eglQueryDevicesEXT`
    pub query_devices: Option<ProcAddress>,
    /// `eglQueryDeviceStringEXT`
    pub query_device_string: Option<ProcAddress>,
    /// `eglGetPlatformDisplayEXT`
    pub get_platform_display: Option<ProcAddress>,
    /// `eglGetOutputLayersEXT`
    pub get_output_layers: Option<ProcAddress>,
    /// `eglCreateStreamKHR`
    pub create_stream: Option<ProcAddress>,
    /// `eglStreamConsumerOutputEXT`
    pub stream_consumer_output: Option<ProcAddress>,
    /// `eglCreateStreamProducerSurfaceKHR`
    pub create_stream_producer_surface: Option<ProcAddress>,
}

type Setter = fn(&mut ExtensionFunctions, Option<ProcAddress>);

const ENTRY_POINTS: &[(&str, Setter)] = &[
    ("eglQueryDevicesEXT", |table: &mut ExtensionFunctions, addr| {
        table.query_devices = addr
    }),
    ("eglQueryDeviceStringEXT", |table: &mut ExtensionFunctions, addr| {
        table.query_device_string = addr
    }),
    ("eglGetPlatformDisplayEXT", |table: &mut ExtensionFunctions, addr| {
        table.get_platform_display = addr
    }),
    ("eglGetOutputLayersEXT", |table: &mut ExtensionFunctions, addr| {
        table.get_output_layers = addr
    }),
    ("eglCreateStreamKHR", |table: &mut ExtensionFunctions, addr| {
        table.create_stream = addr
    }),
    ("eglStreamConsumerOutputEXT", |table: &mut ExtensionFunctions, addr| {
        table.stream_consumer_output = addr
    }),
    ("eglCreateStreamProducerSurfaceKHR", |table: &mut ExtensionFunctions, addr| {
        table.create_stream_producer_surface = addr
    }),
];

impl ExtensionFunctions {
    /// Names of all resolved entry points, in resolution order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        ENTRY_POINTS.iter().map(|(name, _)| *name)
    }

    /// Looks up every entry point through `driver`.
    ///
    /// A missing entry point does not stop the resolution, so the returned
    /// [`Error::FunctionsMissing`] lists all of them.
    pub fn resolve<D: EglDriver + ?Sized>(driver: &D) -> Result<ExtensionFunctions, Error> {
        let mut table = ExtensionFunctions::default();
        let mut missing = Vec::new();

        for &(name, set) in ENTRY_POINTS {
            let addr = driver.proc_address(name);
            match addr {
                Some(addr) => trace!("Resolved {} at {:p}", name, addr.as_ptr()),
                None => {
                    warn!("Extension function '{}' not found", name);
                    missing.push(name);
                }
            }
            set(&mut table, addr);
        }

        if missing.is_empty() {
            Ok(table)
        } else {
            Err(Error::FunctionsMissing(missing))
        }
    }
}
