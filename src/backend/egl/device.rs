//! Enumeration of EGL devices and selection of the one backed by a drm node

use std::{fmt, path::PathBuf, ptr};

use tracing::{debug, info, warn};

use super::{
    driver::{DeviceHandle, EglDriver, RawDevice},
    extensions::{contains_extension, DEVICE_DRM_EXTENSION},
    EGLError, Error,
};

/// EGLDevice together with the extensions it supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EGLDevice {
    handle: DeviceHandle,
    extensions: String,
}

impl EGLDevice {
    /// Returns the raw extension string of the device.
    pub fn extensions(&self) -> &str {
        &self.extensions
    }

    /// Returns `true` if the device supports the extension `name`.
    pub fn has_extension(&self, name: &str) -> bool {
        contains_extension(&self.extensions, name)
    }

    /// Returns the underlying device handle.
    ///
    /// The handle stays valid for as long as the EGL implementation is loaded.
    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    /// Returns the path to the drm node of this EGLDevice.
    ///
    /// This function will return an error if the following extensions are not available:
    /// - [`EGL_EXT_device_drm`](https://www.khronos.org/registry/EGL/extensions/EXT/EGL_EXT_device_drm.txt)
    pub fn drm_device_path<D: EglDriver + ?Sized>(&self, driver: &D) -> Result<PathBuf, Error> {
        if !self.has_extension(DEVICE_DRM_EXTENSION) {
            return Err(Error::EglExtensionNotSupported {
                scope: super::ExtensionScope::Device,
                missing: vec![DEVICE_DRM_EXTENSION],
            });
        }

        driver
            .device_drm_path(self.handle)
            .map_err(Error::QueryDeviceProperty)?
            .ok_or(Error::EmptyDeviceProperty)
    }
}

/// Devices reported by an EGL implementation
///
/// Nothing is queried until [`Devices::iter`] is called. Every call queries the implementation
/// again, so the sequence can be restarted to pick up a changed set of devices.
pub struct Devices<'a, D: ?Sized> {
    driver: &'a D,
}

impl<'a, D: ?Sized> fmt::Debug for Devices<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Devices").finish_non_exhaustive()
    }
}

impl<'a, D: EglDriver + ?Sized> Devices<'a, D> {
    /// Creates the sequence of devices of `driver`.
    pub fn new(driver: &'a D) -> Devices<'a, D> {
        Devices { driver }
    }

    /// Enumerates the devices.
    ///
    /// The implementation is asked for the number of devices first and then for that many
    /// devices. Devices vanishing in between shorten the returned sequence, new ones are not
    /// picked up until the next call.
    pub fn iter(&self) -> Result<DeviceIter<'a, D>, Error> {
        let amount = self.driver.query_devices(None).map_err(Error::QueryDevices)?;
        if amount == 0 {
            return Err(Error::NoDevices);
        }

        let mut raw: Vec<RawDevice> = vec![ptr::null(); amount];
        let filled = self
            .driver
            .query_devices(Some(&mut raw))
            .map_err(Error::QueryDevices)?;
        if filled != amount {
            debug!("Device count changed from {} to {} while enumerating", amount, filled);
        }
        raw.truncate(filled.min(amount));

        Ok(DeviceIter {
            driver: self.driver,
            raw: raw.into_iter(),
        })
    }
}

/// Iterator over the devices of one enumeration
pub struct DeviceIter<'a, D: ?Sized> {
    driver: &'a D,
    raw: std::vec::IntoIter<RawDevice>,
}

impl<'a, D: ?Sized> fmt::Debug for DeviceIter<'a, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIter")
            .field("remaining", &self.raw.len())
            .finish_non_exhaustive()
    }
}

impl<'a, D: EglDriver + ?Sized> Iterator for DeviceIter<'a, D> {
    type Item = Result<EGLDevice, EGLError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.raw.next()?;
            let Some(handle) = DeviceHandle::new(raw) else {
                warn!("Skipping EGL_NO_DEVICE_EXT returned by device enumeration");
                continue;
            };
            return Some(
                self.driver
                    .device_extensions(handle)
                    .map(|extensions| EGLDevice { handle, extensions }),
            );
        }
    }
}

/// Selects the first device able to report its DRM device file.
///
/// All devices are enumerated and logged, even after a match was found.
pub fn select_drm_device<D: EglDriver + ?Sized>(driver: &D) -> Result<EGLDevice, Error> {
    let mut selected: Option<EGLDevice> = None;

    for (index, device) in Devices::new(driver).iter()?.enumerate() {
        let device = match device {
            Ok(device) => device,
            Err(err) => {
                warn!("Failed to query extensions of device {}: {}", index, err);
                continue;
            }
        };
        debug!("Device {} extensions: {}", index, device.extensions());

        if !device.has_extension(DEVICE_DRM_EXTENSION) {
            debug!("Device {} lacks {}", index, DEVICE_DRM_EXTENSION);
            continue;
        }
        if selected.is_none() {
            info!("Selected EGL device {} ({:?})", index, device.handle());
            selected = Some(device);
        }
    }

    selected.ok_or(Error::NoSuitableDevice(DEVICE_DRM_EXTENSION))
}
