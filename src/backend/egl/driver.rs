//! Abstraction over the EGL implementation used during negotiation

use std::{os::raw::c_void, path::PathBuf, ptr::NonNull};

use super::{functions::ProcAddress, EGLError, Error};

/// Raw `EGLDeviceEXT` as returned by `eglQueryDevicesEXT`
pub type RawDevice = *const c_void;

/// Non-null `EGLDeviceEXT`
///
/// `EGL_NO_DEVICE_EXT` can never be represented by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(NonNull<c_void>);

impl DeviceHandle {
    /// Wraps a raw device, returning `None` for `EGL_NO_DEVICE_EXT`.
    pub fn new(raw: RawDevice) -> Option<DeviceHandle> {
        NonNull::new(raw as *mut c_void).map(DeviceHandle)
    }

    /// Returns the raw `EGLDeviceEXT`
    pub fn as_raw(&self) -> RawDevice {
        self.0.as_ptr()
    }
}

/// Entry points of an EGL implementation needed to negotiate a device
///
/// [`NativeEgl`](super::NativeEgl) implements this for the system libEGL.
pub trait EglDriver {
    /// Returns the display independent client extension string.
    fn client_extensions(&self) -> Result<String, Error>;

    /// Looks up the entry point of the function `name`.
    fn proc_address(&self, name: &str) -> Option<ProcAddress>;

    /// Queries the available devices.
    ///
    /// Without a buffer only the number of devices is returned, otherwise the buffer is filled
    /// and the number of written devices is returned.
    fn query_devices(&self, devices: Option<&mut [RawDevice]>) -> Result<usize, EGLError>;

    /// Returns the extension string of `device`.
    fn device_extensions(&self, device: DeviceHandle) -> Result<String, EGLError>;

    /// Returns the DRM device file backing `device`, if the implementation reports one.
    fn device_drm_path(&self, device: DeviceHandle) -> Result<Option<PathBuf>, EGLError>;
}

impl<D: EglDriver + ?Sized> EglDriver for &D {
    fn client_extensions(&self) -> Result<String, Error> {
        (**self).client_extensions()
    }

    fn proc_address(&self, name: &str) -> Option<ProcAddress> {
        (**self).proc_address(name)
    }

    fn query_devices(&self, devices: Option<&mut [RawDevice]>) -> Result<usize, EGLError> {
        (**self).query_devices(devices)
    }

    fn device_extensions(&self, device: DeviceHandle) -> Result<String, EGLError> {
        (**self).device_extensions(device)
    }

    fn device_drm_path(&self, device: DeviceHandle) -> Result<Option<PathBuf>, EGLError> {
        (**self).device_drm_path(device)
    }
}
