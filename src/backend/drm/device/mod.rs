use std::io;

use drm::{
    control::{
        atomic::AtomicModeReq, connector, encoder, plane, property, AtomicCommitFlags, CrtcListFilter,
        Device as ControlDevice, Mode, ResourceHandles,
    },
    ClientCapability, Device as BasicDevice,
};
use drm_fourcc::DrmFourcc;
use tracing::{debug, trace};

use super::{
    control::{
        ConnectorInfo, EncoderInfo, KernelObject, KmsDevice, PlaneInfo, PropertyAssignment, PropertyEntry,
        Resources,
    },
    dumb::DumbFramebuffer,
    error::{AccessError, Error},
    mode::DisplayMode,
};
use crate::utils::DevPath;

mod fd;
pub use self::fd::DrmDeviceFd;

fn access_error<'a>(device: &'a DrmDeviceFd, errmsg: &'static str) -> impl FnOnce(io::Error) -> Error + 'a {
    move |source| {
        Error::Access(AccessError {
            errmsg,
            dev: device.dev_path(),
            source,
        })
    }
}

// Turns the kernel's crtc filter into a mask over the positions in `res.crtcs()`.
fn crtc_mask(res: &ResourceHandles, filter: CrtcListFilter) -> u32 {
    let allowed = res.filter_crtcs(filter);
    res.crtcs()
        .iter()
        .enumerate()
        .take(u32::BITS as usize)
        .filter(|(_, crtc)| allowed.contains(*crtc))
        .fold(0, |mask, (index, _)| mask | (1 << index))
}

impl KmsDevice for DrmDeviceFd {
    type Framebuffer = DumbFramebuffer;

    fn enable_atomic(&self) -> Result<(), Error> {
        // primary planes are only listed with universal planes enabled
        self.set_client_capability(ClientCapability::UniversalPlanes, true)
            .map_err(access_error(self, "Driver does not support universal planes"))?;
        // atomic-only properties and the atomic ioctl are hidden without this
        self.set_client_capability(ClientCapability::Atomic, true)
            .map_err(access_error(self, "Driver does not support atomic modesetting"))?;
        debug!(
            "Enabled atomic modesetting on {:?} (master: {})",
            self.dev_path(),
            self.is_privileged()
        );
        Ok(())
    }

    fn resources(&self) -> Result<Resources, Error> {
        let res = self
            .resource_handles()
            .map_err(access_error(self, "Error loading resource handles"))?;
        Ok(Resources {
            connectors: res.connectors().to_vec(),
            crtcs: res.crtcs().to_vec(),
        })
    }

    fn planes(&self) -> Result<Vec<plane::Handle>, Error> {
        self.plane_handles()
            .map_err(access_error(self, "Error loading plane handles"))
    }

    fn connector(&self, handle: connector::Handle, force_probe: bool) -> Result<ConnectorInfo, Error> {
        let info = self
            .get_connector(handle, force_probe)
            .map_err(access_error(self, "Error loading connector info"))?;
        Ok(ConnectorInfo {
            handle,
            state: info.state(),
            modes: info.modes().iter().copied().map(DisplayMode::from).collect(),
            encoders: info.encoders().to_vec(),
            current_encoder: info.current_encoder(),
        })
    }

    fn encoder(&self, handle: encoder::Handle) -> Result<EncoderInfo, Error> {
        let info = self
            .get_encoder(handle)
            .map_err(access_error(self, "Error loading encoder info"))?;
        let res = self
            .resource_handles()
            .map_err(access_error(self, "Error loading resource handles"))?;
        Ok(EncoderInfo {
            handle,
            possible_crtcs: crtc_mask(&res, info.possible_crtcs()),
            crtc: info.crtc(),
        })
    }

    fn plane(&self, handle: plane::Handle) -> Result<PlaneInfo, Error> {
        let info = self
            .get_plane(handle)
            .map_err(access_error(self, "Error loading plane info"))?;
        let res = self
            .resource_handles()
            .map_err(access_error(self, "Error loading resource handles"))?;
        Ok(PlaneInfo {
            handle,
            possible_crtcs: crtc_mask(&res, info.possible_crtcs()),
        })
    }

    fn properties(&self, object: KernelObject) -> Result<Vec<PropertyEntry>, Error> {
        let props = match object {
            KernelObject::Crtc(handle) => self.get_properties(handle),
            KernelObject::Connector(handle) => self.get_properties(handle),
            KernelObject::Plane(handle) => self.get_properties(handle),
        }
        .map_err(access_error(self, "Error reading properties"))?;

        let (handles, values) = props.as_props_and_values();
        handles
            .iter()
            .zip(values.iter())
            .map(|(&handle, &value)| {
                let info = self
                    .get_property(handle)
                    .map_err(access_error(self, "Error reading property info"))?;
                Ok(PropertyEntry {
                    handle,
                    name: info.name().to_string_lossy().into_owned(),
                    value,
                })
            })
            .collect()
    }

    fn create_mode_blob(&self, mode: &DisplayMode) -> Result<u64, Error> {
        let mode = Mode::from(mode);
        let blob = self
            .create_property_blob(&mode)
            .map_err(access_error(self, "Failed to create Property Blob for mode"))?;
        match blob {
            property::Value::Blob(id) => Ok(id),
            _ => Ok(0),
        }
    }

    #[profiling::function]
    fn commit_properties(
        &self,
        flags: AtomicCommitFlags,
        assignments: &[PropertyAssignment],
    ) -> Result<(), Error> {
        let mut req = AtomicModeReq::new();
        for assignment in assignments {
            req.add_raw_property(assignment.object.raw(), assignment.property, assignment.value);
        }
        trace!("Submitting atomic request with flags {:?}", flags);

        ControlDevice::atomic_commit(self, flags, req)
            .map_err(access_error(self, "Error committing atomic request"))
    }

    fn create_framebuffer(&self, size: (u32, u32), format: DrmFourcc) -> Result<DumbFramebuffer, Error> {
        DumbFramebuffer::create(self, size, format)
    }
}
