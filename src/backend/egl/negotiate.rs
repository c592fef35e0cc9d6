//! Negotiation of the EGL capabilities needed to scan out through a DRM device

use std::path::PathBuf;

use tracing::{info, info_span, instrument};

use super::{
    device::{select_drm_device, EGLDevice},
    driver::EglDriver,
    extensions::{check_extensions, ExtensionScope, CLIENT_EXTENSIONS},
    functions::ExtensionFunctions,
    Error,
};

/// Outcome of a successful EGL negotiation
#[derive(Debug, Clone)]
pub struct NegotiatedDevice {
    /// The selected device
    pub device: EGLDevice,
    /// Resolved extension functions
    pub functions: ExtensionFunctions,
    /// DRM device file backing `device`
    pub drm_path: PathBuf,
}

/// Checks the client extensions required to enumerate devices and create device displays.
#[instrument(level = "debug", skip_all)]
pub fn validate_client_extensions<D: EglDriver + ?Sized>(driver: &D) -> Result<(), Error> {
    let extensions = driver.client_extensions()?;
    check_extensions(&extensions, CLIENT_EXTENSIONS, ExtensionScope::Client)
}

/// Negotiates an EGL device backed by a DRM device.
///
/// Runs, in order and aborting on the first failing step:
/// - validation of the client extensions,
/// - resolution of the extension function table,
/// - selection of the first device exposing its DRM device file.
pub fn negotiate<D: EglDriver + ?Sized>(driver: &D) -> Result<NegotiatedDevice, Error> {
    let span = info_span!("egl_negotiate");
    let _guard = span.enter();

    validate_client_extensions(driver)?;
    let functions = ExtensionFunctions::resolve(driver)?;
    let device = select_drm_device(driver)?;
    let drm_path = device.drm_device_path(driver)?;
    info!("EGL device uses drm device {}", drm_path.display());

    Ok(NegotiatedDevice {
        device,
        functions,
        drm_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::DummyEgl;

    #[test]
    fn negotiates_first_drm_device() {
        let driver = DummyEgl::nvidia();
        let negotiated = negotiate(&driver).unwrap();
        assert!(negotiated.device.has_extension("EGL_EXT_device_drm"));
        assert_eq!(negotiated.drm_path, PathBuf::from("/dev/dri/card0"));
        assert!(negotiated.functions.get_output_layers.is_some());
    }

    #[test]
    fn missing_platform_device_stops_before_functions() {
        let mut driver = DummyEgl::nvidia();
        driver.set_client_extensions(
            "EGL_EXT_device_base EGL_EXT_device_enumeration EGL_EXT_device_query EGL_EXT_platform_base",
        );

        match negotiate(&driver) {
            Err(Error::EglExtensionNotSupported { scope, missing }) => {
                assert_eq!(scope, ExtensionScope::Client);
                assert_eq!(missing, vec!["EGL_EXT_platform_device"]);
            }
            res => panic!("unexpected result {:?}", res),
        }
        assert_eq!(driver.proc_lookups(), 0);
        assert_eq!(driver.device_queries(), 0);
    }

    #[test]
    fn missing_function_stops_before_devices() {
        let mut driver = DummyEgl::nvidia();
        driver.remove_function("eglStreamConsumerOutputEXT");

        assert!(matches!(negotiate(&driver), Err(Error::FunctionsMissing(_))));
        assert_eq!(driver.device_queries(), 0);
    }
}
