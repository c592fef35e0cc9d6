//! [`EglDriver`] implementation for the system libEGL

use std::{ffi::CStr, path::PathBuf, ptr};

use tracing::debug;

use super::{
    driver::{DeviceHandle, EglDriver, RawDevice},
    ffi::{self, egl::types::EGLDeviceEXT},
    functions::ProcAddress,
    wrap_egl_call, wrap_egl_call_bool, wrap_egl_call_ptr, EGLError, Error,
};

/// The system libEGL, loaded at runtime
#[derive(Debug)]
pub struct NativeEgl {
    client_extensions: String,
}

impl NativeEgl {
    /// Loads libEGL and queries its client extensions.
    ///
    /// Loading happens once per process, later calls only query the extension string again.
    pub fn load() -> Result<NativeEgl, Error> {
        let client_extensions = ffi::make_sure_egl_is_loaded()?;
        debug!("Loaded libEGL");
        Ok(NativeEgl { client_extensions })
    }
}

/// Copies a string owned by the EGL implementation.
///
/// # Safety
///
/// `raw` must be non-null and point to a nul terminated string.
unsafe fn owned_string(raw: *const ffi::EGLchar) -> String {
    // EGL strings are plain ASCII
    unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
}

impl EglDriver for NativeEgl {
    fn client_extensions(&self) -> Result<String, Error> {
        Ok(self.client_extensions.clone())
    }

    fn proc_address(&self, name: &str) -> Option<ProcAddress> {
        ProcAddress::new(unsafe { ffi::get_proc_address(name) })
    }

    fn query_devices(&self, devices: Option<&mut [RawDevice]>) -> Result<usize, EGLError> {
        let mut amount = 0;
        match devices {
            None => wrap_egl_call_bool(|| unsafe {
                // a zero max and a null array only ask for the number of devices
                ffi::egl::QueryDevicesEXT(0, ptr::null_mut(), &mut amount)
            })?,
            Some(devices) => {
                let max = devices.len().min(ffi::EGLint::MAX as usize) as ffi::EGLint;
                wrap_egl_call_bool(|| unsafe {
                    // SAFETY: the array holds at least `max` entries
                    ffi::egl::QueryDevicesEXT(max, devices.as_mut_ptr() as *mut EGLDeviceEXT, &mut amount)
                })?
            }
        }
        Ok(amount.max(0) as usize)
    }

    fn device_extensions(&self, device: DeviceHandle) -> Result<String, EGLError> {
        let raw = wrap_egl_call_ptr(|| unsafe {
            ffi::egl::QueryDeviceStringEXT(
                device.as_raw() as EGLDeviceEXT,
                ffi::egl::EXTENSIONS as ffi::EGLint,
            )
        })?;
        Ok(unsafe { owned_string(raw) })
    }

    fn device_drm_path(&self, device: DeviceHandle) -> Result<Option<PathBuf>, EGLError> {
        // a null string without a pending error means the attribute is unset
        let raw = wrap_egl_call(|| unsafe {
            ffi::egl::QueryDeviceStringEXT(
                device.as_raw() as EGLDeviceEXT,
                ffi::egl::DRM_DEVICE_FILE_EXT as ffi::EGLint,
            )
        })?;
        if raw.is_null() {
            return Ok(None);
        }

        let path = unsafe { owned_string(raw) };
        if path.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(path)))
        }
    }
}
