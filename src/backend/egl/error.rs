use super::extensions::ExtensionScope;
#[cfg(feature = "backend_egl")]
use super::ffi;

#[derive(thiserror::Error, Debug)]
/// EGL errors
pub enum Error {
    /// libEGL could not be loaded
    #[error("Failed to load libEGL: {0}")]
    LibraryNotLoaded(String),
    /// Querying the client extensions failed
    #[error("Failed to query the EGL client extensions. Err: {0:}")]
    InitFailed(#[source] EGLError),
    /// The required EGL extensions are not supported by the underlying EGL implementation
    #[error("Required EGL {scope} extensions are not supported: {missing:?}")]
    EglExtensionNotSupported {
        /// Where the extensions were looked up
        scope: ExtensionScope,
        /// Every required extension that is missing
        missing: Vec<&'static str>,
    },
    /// Entry points of required extension functions could not be resolved
    #[error("The following EGL extension functions could not be resolved: {0:?}")]
    FunctionsMissing(Vec<&'static str>),
    /// Enumerating the available devices failed
    #[error("Failed to query the available EGL devices. Err: {0:}")]
    QueryDevices(#[source] EGLError),
    /// The implementation reported zero devices
    #[error("No EGL devices found")]
    NoDevices,
    /// No device supports the required device extension
    #[error("No EGL device supports `{0}`")]
    NoSuitableDevice(&'static str),
    /// Failed to query a device property
    #[error("Failed to query device property. Err: {0:}")]
    QueryDeviceProperty(#[source] EGLError),
    /// The device property was empty
    #[error("The device property was empty")]
    EmptyDeviceProperty,
}

/// Raw EGL error
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EGLError {
    /// EGL is not initialized, or could not be initialized, for the specified EGL display connection.
    #[error(
        "EGL is not initialized, or could not be initialized, for the specified EGL display connection."
    )]
    NotInitialized,
    /// EGL cannot access a requested resource (for example a context is bound in another thread).
    #[error("EGL cannot access a requested resource (for example a context is bound in another thread).")]
    BadAccess,
    /// EGL failed to allocate resources for the requested operation.
    #[error("EGL failed to allocate resources for the requested operation.")]
    BadAlloc,
    /// An unrecognized attribute or attribute value was passed in the attribute list.
    #[error("An unrecognized attribute or attribute value was passed in the attribute list.")]
    BadAttribute,
    /// An EGLDisplay argument does not name a valid EGL display connection.
    #[error("An EGLDisplay argument does not name a valid EGL display connection.")]
    BadDisplay,
    /// An EGLDeviceEXT argument does not name a valid EGL device.
    #[error("An EGLDeviceEXT argument does not name a valid EGL device.")]
    BadDevice,
    /// Arguments are inconsistent.
    #[error("Arguments are inconsistent.")]
    BadMatch,
    /// One or more argument values are invalid.
    #[error("One or more argument values are invalid.")]
    BadParameter,
    /// An unknown error
    #[error("An unknown error ({0:x})")]
    Unknown(u32),
}

#[cfg(feature = "backend_egl")]
const BAD_DEVICE_EXT: u32 = 0x322B;

#[cfg(feature = "backend_egl")]
impl From<u32> for EGLError {
    fn from(value: u32) -> Self {
        match value {
            ffi::egl::NOT_INITIALIZED => EGLError::NotInitialized,
            ffi::egl::BAD_ACCESS => EGLError::BadAccess,
            ffi::egl::BAD_ALLOC => EGLError::BadAlloc,
            ffi::egl::BAD_ATTRIBUTE => EGLError::BadAttribute,
            ffi::egl::BAD_DISPLAY => EGLError::BadDisplay,
            BAD_DEVICE_EXT => EGLError::BadDevice,
            ffi::egl::BAD_MATCH => EGLError::BadMatch,
            ffi::egl::BAD_PARAMETER => EGLError::BadParameter,
            x => EGLError::Unknown(x),
        }
    }
}

#[cfg(feature = "backend_egl")]
impl EGLError {
    fn from_last_call() -> Result<(), EGLError> {
        match unsafe { ffi::egl::GetError() as u32 } {
            ffi::egl::SUCCESS => Ok(()),
            x => Err(EGLError::from(x)),
        }
    }

    // A failing call that left no error behind is reported as unknown.
    fn last_or_unknown() -> EGLError {
        EGLError::from_last_call().err().unwrap_or(EGLError::Unknown(0))
    }
}

#[cfg(feature = "backend_egl")]
pub(crate) fn wrap_egl_call<R, F: FnOnce() -> R>(call: F) -> Result<R, EGLError> {
    let res = call();
    EGLError::from_last_call().map(|()| res)
}

#[cfg(feature = "backend_egl")]
pub(crate) fn wrap_egl_call_ptr<R, F: FnOnce() -> *const R>(call: F) -> Result<*const R, EGLError> {
    let res = call();
    if res.is_null() {
        Err(EGLError::last_or_unknown())
    } else {
        Ok(res)
    }
}

#[cfg(feature = "backend_egl")]
pub(crate) fn wrap_egl_call_bool<F: FnOnce() -> ffi::egl::types::EGLBoolean>(
    call: F,
) -> Result<(), EGLError> {
    let res = call();
    if res == ffi::egl::FALSE {
        Err(EGLError::last_or_unknown())
    } else {
        Ok(())
    }
}
