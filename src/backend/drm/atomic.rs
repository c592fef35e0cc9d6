//! Building and committing atomic modeset requests

use std::{fmt, num::NonZeroU64};

use drm::control::{AtomicCommitFlags, RawResourceHandle};
use tracing::{debug, error, info, info_span, trace};

use super::{
    control::{Framebuffer, KmsDevice, PropertyAssignment},
    graph::OutputPath,
    mode::DisplayMode,
    properties::{ModesetProperties, PropertyTable},
    Error,
};

/// Number of properties set by [`AtomicRequest::modeset`]
pub const MODESET_ENTRIES: usize = 13;

/// Kernel blob holding a display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeBlob(NonZeroU64);

impl ModeBlob {
    /// Registers `mode` with the kernel.
    pub fn create<K: KmsDevice + ?Sized>(device: &K, mode: &DisplayMode) -> Result<ModeBlob, Error> {
        let id = device.create_mode_blob(mode)?;
        let blob = NonZeroU64::new(id).map(ModeBlob).ok_or(Error::EmptyModeBlob)?;
        debug!("Created blob {} for mode {}", id, mode.name);
        Ok(blob)
    }

    /// Id of the blob
    pub fn id(&self) -> u64 {
        self.0.get()
    }
}

/// Lifecycle of an [`AtomicRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Storage is allocated, nothing was added yet
    Allocated,
    /// Properties were added
    Populated,
    /// The kernel applied the request
    Committed,
    /// The kernel rejected the request, nothing was applied
    Aborted,
}

/// Atomic request under construction
///
/// Every property comes from a resolved [`PropertyTable`]. The request is submitted once, by
/// [`AtomicRequest::commit`], which consumes it.
pub struct AtomicRequest<'a, K: KmsDevice + ?Sized> {
    device: &'a K,
    entries: Vec<PropertyAssignment>,
    state: RequestState,
    span: tracing::Span,
}

impl<'a, K: KmsDevice + ?Sized> fmt::Debug for AtomicRequest<'a, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicRequest")
            .field("entries", &self.entries)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a, K: KmsDevice + ?Sized> AtomicRequest<'a, K> {
    /// Allocates an empty request.
    pub fn new(device: &'a K) -> Result<AtomicRequest<'a, K>, Error> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(MODESET_ENTRIES)
            .map_err(|_| Error::RequestAllocation)?;

        Ok(AtomicRequest {
            device,
            entries,
            state: RequestState::Allocated,
            span: info_span!("drm_atomic"),
        })
    }

    /// Current state of the request
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Added properties, in order
    pub fn entries(&self) -> &[PropertyAssignment] {
        &self.entries
    }

    /// Sets the property `name` of the table's object.
    pub fn add(&mut self, table: &PropertyTable, name: &'static str, value: u64) -> Result<(), Error> {
        let property = table.get(name)?;
        let object = table.object();
        trace!(parent: &self.span, "{} {} = {}", object, name, value);

        self.entries.push(PropertyAssignment {
            object,
            property,
            value,
        });
        self.state = RequestState::Populated;
        Ok(())
    }

    /// Adds everything needed to show `framebuffer` on the output `path`.
    ///
    /// The framebuffer is scanned out in full, scaled to the size of the mode.
    pub fn modeset<F: Framebuffer + ?Sized>(
        &mut self,
        props: &ModesetProperties,
        path: &OutputPath,
        blob: &ModeBlob,
        framebuffer: &F,
    ) -> Result<(), Error> {
        let crtc = raw_id(path.crtc);
        let fb = raw_id(*framebuffer.as_ref());
        let (src_w, src_h) = framebuffer.size();
        let (dst_w, dst_h) = path.mode.size();

        self.add(&props.crtc, "MODE_ID", blob.id())?;
        self.add(&props.crtc, "ACTIVE", 1)?;
        self.add(&props.connector, "CRTC_ID", crtc)?;

        // source coordinates are 16.16 fixed point
        self.add(&props.plane, "SRC_X", 0)?;
        self.add(&props.plane, "SRC_Y", 0)?;
        self.add(&props.plane, "SRC_W", to_fixed(src_w))?;
        self.add(&props.plane, "SRC_H", to_fixed(src_h))?;
        self.add(&props.plane, "CRTC_X", 0)?;
        self.add(&props.plane, "CRTC_Y", 0)?;
        self.add(&props.plane, "CRTC_W", dst_w as u64)?;
        self.add(&props.plane, "CRTC_H", dst_h as u64)?;
        self.add(&props.plane, "FB_ID", fb)?;
        self.add(&props.plane, "CRTC_ID", crtc)?;

        Ok(())
    }

    /// Asks the kernel whether the request would be accepted, without applying it.
    pub fn test(&self, flags: AtomicCommitFlags) -> Result<(), Error> {
        let _guard = self.span.enter();
        if self.state == RequestState::Allocated {
            return Err(Error::EmptyRequest);
        }

        self.device
            .commit_properties(flags | AtomicCommitFlags::TEST_ONLY, &self.entries)
            .map_err(into_commit_error)?;
        debug!("Test commit of {} properties succeeded", self.entries.len());
        Ok(())
    }

    /// Submits the request.
    ///
    /// The kernel applies either every property or none of them.
    pub fn commit(mut self, flags: AtomicCommitFlags) -> Result<(), Error> {
        let span = self.span.clone();
        let _guard = span.enter();
        if self.state == RequestState::Allocated {
            return Err(Error::EmptyRequest);
        }

        match self.device.commit_properties(flags, &self.entries) {
            Ok(()) => {
                self.state = RequestState::Committed;
                info!("Committed {} properties", self.entries.len());
                Ok(())
            }
            Err(err) => {
                self.state = RequestState::Aborted;
                error!("Atomic commit failed, request {:?}: {}", self.state, err);
                Err(into_commit_error(err))
            }
        }
    }
}

fn into_commit_error(err: Error) -> Error {
    match err {
        Error::Access(source) => Error::CommitFailed(source),
        err => err,
    }
}

fn raw_id<H: Into<RawResourceHandle>>(handle: H) -> u64 {
    handle.into().get() as u64
}

/// Converts an integer into 16.16 fixed point
pub fn to_fixed(n: u32) -> u64 {
    (n as u64) << 16
}
