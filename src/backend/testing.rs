#![allow(missing_docs)]
//! Dummy EGL and KMS implementations for tests

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    io,
    os::raw::c_void,
    path::PathBuf,
};

use drm::control::{
    connector, crtc, encoder, framebuffer, plane, property, AtomicCommitFlags, PlaneType,
};
use drm_fourcc::DrmFourcc;

use crate::backend::{
    drm::{
        control::{
            ConnectorInfo, EncoderInfo, Framebuffer, KernelObject, KmsDevice, PlaneInfo, PropertyAssignment,
            PropertyEntry, Resources,
        },
        dumb::format_info,
        AccessError, DisplayMode, Error as DrmError,
    },
    egl::{
        driver::{DeviceHandle, EglDriver, RawDevice},
        functions::ExtensionFunctions,
        EGLError, Error as EglError, ProcAddress,
    },
};

const NVIDIA_CLIENT_EXTENSIONS: &str = "EGL_EXT_platform_base EGL_EXT_device_base EGL_EXT_device_enumeration \
     EGL_EXT_device_query EGL_KHR_debug EGL_EXT_platform_device EGL_EXT_platform_x11";

#[derive(Debug)]
pub struct DummyEgl {
    client_extensions: String,
    functions: Vec<&'static str>,
    devices: Vec<String>,
    shrink_to: Option<usize>,
    device_query_error: Option<EGLError>,
    proc_lookups: Cell<usize>,
    device_queries: Cell<usize>,
    extension_queries: Cell<usize>,
}

impl DummyEgl {
    /// One device exposing its drm node, every extension and function present.
    pub fn nvidia() -> DummyEgl {
        DummyEgl {
            client_extensions: NVIDIA_CLIENT_EXTENSIONS.into(),
            functions: ExtensionFunctions::names().collect(),
            devices: vec!["EGL_NV_device_cuda EGL_EXT_device_drm".into()],
            shrink_to: None,
            device_query_error: None,
            proc_lookups: Cell::new(0),
            device_queries: Cell::new(0),
            extension_queries: Cell::new(0),
        }
    }

    /// Fake address of a function, distinct per name.
    pub fn address_of(name: &str) -> ProcAddress {
        let hash = name
            .bytes()
            .fold(0xcbf2_9ce4_u32, |hash, byte| (hash ^ byte as u32).wrapping_mul(0x0100_0193));
        ProcAddress::new(((hash as usize) << 4 | 0x8) as *const c_void).unwrap()
    }

    pub fn device_handle(index: usize) -> DeviceHandle {
        DeviceHandle::new(((index + 1) * 0x10) as *const c_void).unwrap()
    }

    fn device_index(handle: DeviceHandle) -> usize {
        handle.as_raw() as usize / 0x10 - 1
    }

    pub fn set_client_extensions(&mut self, extensions: &str) {
        self.client_extensions = extensions.into();
    }

    pub fn remove_function(&mut self, name: &str) {
        self.functions.retain(|f| *f != name);
    }

    pub fn set_devices(&mut self, devices: Vec<String>) {
        self.devices = devices;
    }

    /// Makes the fetching call return at most `amount` devices.
    pub fn shrink_on_fetch(&mut self, amount: usize) {
        self.shrink_to = Some(amount);
    }

    pub fn fail_device_query(&mut self, err: EGLError) {
        self.device_query_error = Some(err);
    }

    pub fn proc_lookups(&self) -> usize {
        self.proc_lookups.get()
    }

    pub fn device_queries(&self) -> usize {
        self.device_queries.get()
    }

    pub fn extension_queries(&self) -> usize {
        self.extension_queries.get()
    }
}

impl EglDriver for DummyEgl {
    fn client_extensions(&self) -> Result<String, EglError> {
        Ok(self.client_extensions.clone())
    }

    fn proc_address(&self, name: &str) -> Option<ProcAddress> {
        self.proc_lookups.set(self.proc_lookups.get() + 1);
        self.functions
            .iter()
            .any(|f| *f == name)
            .then(|| DummyEgl::address_of(name))
    }

    fn query_devices(&self, devices: Option<&mut [RawDevice]>) -> Result<usize, EGLError> {
        self.device_queries.set(self.device_queries.get() + 1);
        if let Some(err) = self.device_query_error {
            return Err(err);
        }

        match devices {
            None => Ok(self.devices.len()),
            Some(buffer) => {
                let amount = buffer
                    .len()
                    .min(self.devices.len())
                    .min(self.shrink_to.unwrap_or(usize::MAX));
                for (index, slot) in buffer.iter_mut().take(amount).enumerate() {
                    *slot = DummyEgl::device_handle(index).as_raw();
                }
                Ok(amount)
            }
        }
    }

    fn device_extensions(&self, device: DeviceHandle) -> Result<String, EGLError> {
        self.extension_queries.set(self.extension_queries.get() + 1);
        self.devices
            .get(DummyEgl::device_index(device))
            .cloned()
            .ok_or(EGLError::BadDevice)
    }

    fn device_drm_path(&self, device: DeviceHandle) -> Result<Option<PathBuf>, EGLError> {
        let index = DummyEgl::device_index(device);
        if index >= self.devices.len() {
            return Err(EGLError::BadDevice);
        }
        Ok(Some(PathBuf::from(format!("/dev/dri/card{}", index))))
    }
}

pub fn crtc(id: u32) -> crtc::Handle {
    drm::control::from_u32(id).unwrap()
}

pub fn encoder(id: u32) -> encoder::Handle {
    drm::control::from_u32(id).unwrap()
}

pub fn output_connector() -> connector::Handle {
    drm::control::from_u32(20).unwrap()
}

pub fn crtc_0() -> crtc::Handle {
    crtc(40)
}

pub fn crtc_1() -> crtc::Handle {
    crtc(41)
}

pub fn overlay_plane() -> plane::Handle {
    drm::control::from_u32(50).unwrap()
}

pub fn primary_plane() -> plane::Handle {
    drm::control::from_u32(51).unwrap()
}

#[derive(Debug)]
pub struct DummyFramebuffer {
    handle: framebuffer::Handle,
    size: (u32, u32),
    format: DrmFourcc,
    cleared: Option<[u8; 4]>,
}

impl DummyFramebuffer {
    pub fn cleared(&self) -> Option<[u8; 4]> {
        self.cleared
    }
}

impl AsRef<framebuffer::Handle> for DummyFramebuffer {
    fn as_ref(&self) -> &framebuffer::Handle {
        &self.handle
    }
}

impl Framebuffer for DummyFramebuffer {
    fn format(&self) -> DrmFourcc {
        self.format
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self, color: [u8; 4]) -> Result<(), DrmError> {
        self.cleared = Some(color);
        Ok(())
    }
}

#[derive(Debug)]
pub struct DummyKms {
    connectors: Vec<ConnectorInfo>,
    encoders: Vec<EncoderInfo>,
    crtcs: Vec<crtc::Handle>,
    planes: Vec<PlaneInfo>,
    properties: HashMap<KernelObject, Vec<PropertyEntry>>,
    next_property: u32,
    applied: RefCell<Vec<PropertyAssignment>>,
    last_flags: Cell<Option<AtomicCommitFlags>>,
    commit_calls: Cell<usize>,
    fail_commits: Cell<bool>,
    fail_blobs: Cell<bool>,
    next_blob: Cell<u64>,
    next_fb: Cell<u32>,
    force_probed: Cell<bool>,
    property_queries: RefCell<HashMap<KernelObject, usize>>,
    broken_objects: HashSet<KernelObject>,
    broken_properties: HashSet<KernelObject>,
    refuse_atomic: bool,
    atomic_enabled: Cell<bool>,
}

fn injected(errmsg: &'static str) -> DrmError {
    DrmError::Access(AccessError {
        errmsg,
        dev: None,
        source: io::Error::from(io::ErrorKind::InvalidInput),
    })
}

impl DummyKms {
    fn empty() -> DummyKms {
        DummyKms {
            connectors: Vec::new(),
            encoders: Vec::new(),
            crtcs: Vec::new(),
            planes: Vec::new(),
            properties: HashMap::new(),
            next_property: 100,
            applied: RefCell::new(Vec::new()),
            last_flags: Cell::new(None),
            commit_calls: Cell::new(0),
            fail_commits: Cell::new(false),
            fail_blobs: Cell::new(false),
            next_blob: Cell::new(1),
            next_fb: Cell::new(60),
            force_probed: Cell::new(false),
            property_queries: RefCell::new(HashMap::new()),
            broken_objects: HashSet::new(),
            broken_properties: HashSet::new(),
            refuse_atomic: false,
            atomic_enabled: Cell::new(false),
        }
    }

    /// One connected connector with a non-preferred 1920x1080 and a preferred 1280x720 mode,
    /// one encoder able to drive the second of two crtcs, an overlay and a primary plane both
    /// usable with that crtc.
    pub fn single_output() -> DummyKms {
        let mut kms = DummyKms::empty();
        kms.crtcs = vec![crtc_0(), crtc_1()];
        kms.connectors.push(ConnectorInfo {
            handle: output_connector(),
            state: connector::State::Connected,
            modes: vec![DisplayMode::new(1920, 1080, 60), DisplayMode::new(1280, 720, 60).preferred()],
            encoders: vec![encoder(30)],
            current_encoder: None,
        });
        kms.set_encoder(encoder(30), 0b10, None);
        kms.planes = vec![
            PlaneInfo {
                handle: overlay_plane(),
                possible_crtcs: 0b10,
            },
            PlaneInfo {
                handle: primary_plane(),
                possible_crtcs: 0b10,
            },
        ];

        for crtc in kms.crtcs.clone() {
            kms.add_properties(crtc.into(), &[("MODE_ID", 0), ("ACTIVE", 0), ("GAMMA_LUT_SIZE", 256)]);
        }
        kms.add_properties(
            output_connector().into(),
            &[("EDID", 0), ("DPMS", 0), ("CRTC_ID", 0)],
        );
        kms.add_plane_properties(overlay_plane(), PlaneType::Overlay);
        kms.add_plane_properties(primary_plane(), PlaneType::Primary);
        kms
    }

    fn add_plane_properties(&mut self, plane: plane::Handle, plane_type: PlaneType) {
        self.add_properties(
            plane.into(),
            &[
                ("type", plane_type as u64),
                ("FB_ID", 0),
                ("IN_FORMATS", 0),
                ("CRTC_ID", 0),
                ("SRC_X", 0),
                ("SRC_Y", 0),
                ("SRC_W", 0),
                ("SRC_H", 0),
                ("CRTC_X", 0),
                ("CRTC_Y", 0),
                ("CRTC_W", 0),
                ("CRTC_H", 0),
            ],
        );
    }

    fn add_properties(&mut self, object: KernelObject, props: &[(&str, u64)]) {
        for (name, value) in props {
            let handle = drm::control::from_u32(self.next_property).unwrap();
            self.next_property += 1;
            self.properties.entry(object).or_default().push(PropertyEntry {
                handle,
                name: name.to_string(),
                value: *value,
            });
        }
    }

    fn connector_mut(&mut self) -> &mut ConnectorInfo {
        &mut self.connectors[0]
    }

    pub fn set_connector_state(&mut self, state: connector::State) {
        self.connector_mut().state = state;
    }

    pub fn set_connector_encoders(&mut self, encoders: Vec<encoder::Handle>) {
        self.connector_mut().encoders = encoders;
    }

    pub fn set_current_encoder(&mut self, encoder: Option<encoder::Handle>) {
        self.connector_mut().current_encoder = encoder;
    }

    pub fn set_encoder(&mut self, handle: encoder::Handle, possible_crtcs: u32, crtc: Option<crtc::Handle>) {
        self.encoders.retain(|e| e.handle != handle);
        self.encoders.push(EncoderInfo {
            handle,
            possible_crtcs,
            crtc,
        });
    }

    pub fn set_plane_mask(&mut self, plane: plane::Handle, possible_crtcs: u32) {
        for info in self.planes.iter_mut().filter(|p| p.handle == plane) {
            info.possible_crtcs = possible_crtcs;
        }
    }

    pub fn remove_plane(&mut self, plane: plane::Handle) {
        self.planes.retain(|p| p.handle != plane);
    }

    pub fn remove_property(&mut self, object: KernelObject, name: &str) {
        if let Some(props) = self.properties.get_mut(&object) {
            props.retain(|p| p.name != name);
        }
    }

    /// Makes loading the object fail.
    pub fn break_object(&mut self, object: KernelObject) {
        self.broken_objects.insert(object);
    }

    /// Makes reading the object's properties fail.
    pub fn break_properties(&mut self, object: KernelObject) {
        self.broken_properties.insert(object);
    }

    /// Makes the driver refuse the atomic client capability.
    pub fn refuse_atomic(&mut self) {
        self.refuse_atomic = true;
    }

    pub fn atomic_enabled(&self) -> bool {
        self.atomic_enabled.get()
    }

    pub fn property_handle(&self, object: KernelObject, name: &str) -> property::Handle {
        self.properties[&object]
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.handle)
            .unwrap()
    }

    pub fn property_queries(&self, object: KernelObject) -> usize {
        self.property_queries.borrow().get(&object).copied().unwrap_or(0)
    }

    pub fn was_force_probed(&self) -> bool {
        self.force_probed.get()
    }

    pub fn applied(&self) -> Vec<PropertyAssignment> {
        self.applied.borrow().clone()
    }

    pub fn last_flags(&self) -> Option<AtomicCommitFlags> {
        self.last_flags.get()
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.get()
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.set(fail);
    }

    pub fn fail_blobs(&self, fail: bool) {
        self.fail_blobs.set(fail);
    }
}

impl KmsDevice for DummyKms {
    type Framebuffer = DummyFramebuffer;

    fn enable_atomic(&self) -> Result<(), DrmError> {
        if self.refuse_atomic {
            return Err(injected("Driver does not support atomic modesetting"));
        }
        self.atomic_enabled.set(true);
        Ok(())
    }

    fn resources(&self) -> Result<Resources, DrmError> {
        Ok(Resources {
            connectors: self.connectors.iter().map(|c| c.handle).collect(),
            crtcs: self.crtcs.clone(),
        })
    }

    fn planes(&self) -> Result<Vec<plane::Handle>, DrmError> {
        Ok(self.planes.iter().map(|p| p.handle).collect())
    }

    fn connector(&self, handle: connector::Handle, force_probe: bool) -> Result<ConnectorInfo, DrmError> {
        if force_probe {
            self.force_probed.set(true);
        }
        self.connectors
            .iter()
            .find(|c| c.handle == handle)
            .cloned()
            .ok_or_else(|| injected("Unknown connector"))
    }

    fn encoder(&self, handle: encoder::Handle) -> Result<EncoderInfo, DrmError> {
        self.encoders
            .iter()
            .find(|e| e.handle == handle)
            .copied()
            .ok_or_else(|| injected("Unknown encoder"))
    }

    fn plane(&self, handle: plane::Handle) -> Result<PlaneInfo, DrmError> {
        if self.broken_objects.contains(&KernelObject::from(handle)) {
            return Err(injected("Injected plane failure"));
        }
        self.planes
            .iter()
            .find(|p| p.handle == handle)
            .copied()
            .ok_or_else(|| injected("Unknown plane"))
    }

    fn properties(&self, object: KernelObject) -> Result<Vec<PropertyEntry>, DrmError> {
        *self.property_queries.borrow_mut().entry(object).or_default() += 1;
        if self.broken_properties.contains(&object) {
            return Err(injected("Injected property failure"));
        }
        Ok(self.properties.get(&object).cloned().unwrap_or_default())
    }

    fn create_mode_blob(&self, _mode: &DisplayMode) -> Result<u64, DrmError> {
        if self.fail_blobs.get() {
            return Ok(0);
        }
        let id = self.next_blob.get();
        self.next_blob.set(id + 1);
        Ok(id)
    }

    fn commit_properties(
        &self,
        flags: AtomicCommitFlags,
        assignments: &[PropertyAssignment],
    ) -> Result<(), DrmError> {
        self.commit_calls.set(self.commit_calls.get() + 1);
        self.last_flags.set(Some(flags));
        if self.fail_commits.get() {
            return Err(injected("Injected commit failure"));
        }

        let known = assignments.iter().all(|a| {
            self.properties
                .get(&a.object)
                .map_or(false, |props| props.iter().any(|p| p.handle == a.property))
        });
        if !known {
            return Err(injected("Unknown property in request"));
        }

        if !flags.contains(AtomicCommitFlags::TEST_ONLY) {
            self.applied.borrow_mut().extend_from_slice(assignments);
        }
        Ok(())
    }

    fn create_framebuffer(&self, size: (u32, u32), format: DrmFourcc) -> Result<DummyFramebuffer, DrmError> {
        format_info(format).ok_or(DrmError::UnsupportedFormat(format))?;
        let id = self.next_fb.get();
        self.next_fb.set(id + 1);
        Ok(DummyFramebuffer {
            handle: drm::control::from_u32(id).unwrap(),
            size,
            format,
            cleared: None,
        })
    }
}
