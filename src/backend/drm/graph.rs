//! Resolution of a connector → crtc → primary plane path through the kernel object graph

use drm::control::{connector, crtc, plane, PlaneType};
use tracing::{debug, info, info_span, trace, warn};

use super::{
    control::{ConnectorInfo, KmsDevice, Resources},
    mode::{select_mode, DisplayMode},
    properties::lookup_property,
    Error,
};

/// Options for resolving an [`OutputPath`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Make the kernel probe connectors again instead of reporting cached state
    pub force_probe: bool,
    /// Try the crtc currently bound to the connector's encoder before any other one
    pub prefer_current_crtc: bool,
}

/// A usable output
///
/// `crtc` can drive `connector` through one of its encoders and `plane` is a primary plane
/// usable with `crtc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    /// The connector
    pub connector: connector::Handle,
    /// The crtc
    pub crtc: crtc::Handle,
    /// Index of `crtc` in the device's crtc list
    pub crtc_index: usize,
    /// The primary plane
    pub plane: plane::Handle,
    /// Mode to drive the connector with
    pub mode: DisplayMode,
}

impl OutputPath {
    /// Resolves the first usable output of a device.
    pub fn resolve<K: KmsDevice + ?Sized>(device: &K, options: GraphOptions) -> Result<OutputPath, Error> {
        let span = info_span!("drm_graph");
        let _guard = span.enter();

        let res = device.resources()?;
        debug!(
            "Device has {} connectors and {} crtcs",
            res.connectors.len(),
            res.crtcs.len()
        );

        let connector = select_connector(device, &res, options.force_probe)?;
        let mode = select_mode(&connector.modes)
            .cloned()
            .ok_or(Error::NoSuitableMode(connector.handle))?;
        let (crtc, crtc_index) = select_crtc(device, &res, &connector, options.prefer_current_crtc)?;
        let plane = select_plane(device, crtc, crtc_index)?;

        info!(
            "Using connector {:?} on crtc {:?} (index {}) with plane {:?} and mode {}@{}",
            connector.handle, crtc, crtc_index, plane, mode.name, mode.vrefresh
        );

        Ok(OutputPath {
            connector: connector.handle,
            crtc,
            crtc_index,
            plane,
            mode,
        })
    }
}

/// Returns the first connector that is connected and has modes and encoders.
///
/// Connectors failing to load are skipped.
pub fn select_connector<K: KmsDevice + ?Sized>(
    device: &K,
    res: &Resources,
    force_probe: bool,
) -> Result<ConnectorInfo, Error> {
    for &handle in &res.connectors {
        let info = match device.connector(handle, force_probe) {
            Ok(info) => info,
            Err(err) => {
                warn!("Failed to load connector {:?}: {}", handle, err);
                continue;
            }
        };
        trace!(
            "Connector {:?}: {:?}, {} modes, {} encoders",
            handle,
            info.state,
            info.modes.len(),
            info.encoders.len()
        );
        if info.is_usable() {
            return Ok(info);
        }
    }

    Err(Error::NoConnectedConnector)
}

/// Returns the first crtc of `crtcs` allowed by an encoder's crtc mask, with its index.
pub fn crtc_for_encoder(crtcs: &[crtc::Handle], possible_crtcs: u32) -> Option<(crtc::Handle, usize)> {
    crtcs
        .iter()
        .enumerate()
        .take(u32::BITS as usize)
        .find(|(index, _)| possible_crtcs & (1 << index) != 0)
        .map(|(index, crtc)| (*crtc, index))
}

/// Returns a crtc able to drive `connector`, with its index.
///
/// Encoders are tried in the order the connector lists them, the first one allowing any crtc
/// decides. Encoders failing to load are skipped.
pub fn select_crtc<K: KmsDevice + ?Sized>(
    device: &K,
    res: &Resources,
    connector: &ConnectorInfo,
    prefer_current: bool,
) -> Result<(crtc::Handle, usize), Error> {
    if prefer_current {
        if let Some(current) = current_crtc(device, res, connector) {
            debug!("Reusing crtc {:?} of the current encoder", current.0);
            return Ok(current);
        }
    }

    for &handle in &connector.encoders {
        let encoder = match device.encoder(handle) {
            Ok(encoder) => encoder,
            Err(err) => {
                warn!("Failed to load encoder {:?}: {}", handle, err);
                continue;
            }
        };
        trace!("Encoder {:?} crtc mask {:#b}", handle, encoder.possible_crtcs);
        if let Some(found) = crtc_for_encoder(&res.crtcs, encoder.possible_crtcs) {
            return Ok(found);
        }
    }

    Err(Error::NoSuitableCrtc(connector.handle))
}

fn current_crtc<K: KmsDevice + ?Sized>(
    device: &K,
    res: &Resources,
    connector: &ConnectorInfo,
) -> Option<(crtc::Handle, usize)> {
    let encoder = device.encoder(connector.current_encoder?).ok()?;
    let crtc = encoder.crtc?;
    let index = res.crtcs.iter().position(|&c| c == crtc)?;
    (index < u32::BITS as usize && encoder.possible_crtcs & (1 << index) != 0).then_some((crtc, index))
}

/// Returns the first primary plane usable with the crtc at `crtc_index`.
///
/// Planes failing to load are skipped.
pub fn select_plane<K: KmsDevice + ?Sized>(
    device: &K,
    crtc: crtc::Handle,
    crtc_index: usize,
) -> Result<plane::Handle, Error> {
    if crtc_index >= u32::BITS as usize {
        return Err(Error::NoPrimaryPlane(crtc));
    }

    for handle in device.planes()? {
        let info = match device.plane(handle) {
            Ok(info) => info,
            Err(err) => {
                warn!("Failed to load plane {:?}: {}", handle, err);
                continue;
            }
        };
        if info.possible_crtcs & (1 << crtc_index) == 0 {
            continue;
        }

        let plane_type = match lookup_property(device, handle.into(), "type") {
            Ok(plane_type) => plane_type,
            Err(err) => {
                warn!("Failed to read the type of plane {:?}: {}", handle, err);
                continue;
            }
        };
        trace!("Plane {:?} has type {:?}", handle, plane_type);
        if plane_type == Some(PlaneType::Primary as u64) {
            return Ok(handle);
        }
    }

    Err(Error::NoPrimaryPlane(crtc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{
        crtc, crtc_0, crtc_1, encoder, output_connector, overlay_plane, primary_plane, DummyKms,
    };

    #[test]
    fn mask_selects_only_eligible_indices() {
        let crtcs = [crtc(10), crtc(11), crtc(12), crtc(13)];
        assert_eq!(crtc_for_encoder(&crtcs, 0b0101), Some((crtc(10), 0)));
        assert_eq!(crtc_for_encoder(&crtcs, 0b0100), Some((crtc(12), 2)));
        assert_eq!(crtc_for_encoder(&crtcs, 0b1_0000), None);
        assert_eq!(crtc_for_encoder(&crtcs, 0), None);
    }

    #[test]
    fn mask_never_yields_unset_bit() {
        let crtcs = [crtc(10), crtc(11), crtc(12), crtc(13)];
        for mask in 0u32..16 {
            if let Some((_, index)) = crtc_for_encoder(&crtcs, mask) {
                assert_ne!(mask & (1 << index), 0);
                assert_eq!(mask.trailing_zeros() as usize, index);
            }
        }
    }

    #[test]
    fn resolves_single_output() {
        let kms = DummyKms::single_output();
        let path = OutputPath::resolve(&kms, GraphOptions::default()).unwrap();

        assert_eq!(path.connector, output_connector());
        assert_eq!(path.crtc, crtc_1());
        assert_eq!(path.crtc_index, 1);
        assert_eq!(path.plane, primary_plane());
        assert_eq!(path.mode.size(), (1280, 720));
    }

    #[test]
    fn overlay_plane_is_never_picked() {
        let mut kms = DummyKms::single_output();
        kms.set_plane_mask(overlay_plane(), 0b11);
        kms.remove_plane(primary_plane());

        assert!(matches!(select_plane(&kms, crtc_1(), 1), Err(Error::NoPrimaryPlane(c)) if c == crtc_1()));
    }

    #[test]
    fn broken_planes_are_skipped() {
        let mut kms = DummyKms::single_output();
        kms.break_object(overlay_plane().into());
        assert_eq!(select_plane(&kms, crtc_1(), 1).unwrap(), primary_plane());

        // the overlay loads, but its properties cannot be read
        let mut kms = DummyKms::single_output();
        kms.set_plane_mask(overlay_plane(), 0b11);
        kms.break_properties(overlay_plane().into());
        assert_eq!(select_plane(&kms, crtc_1(), 1).unwrap(), primary_plane());
    }

    #[test]
    fn plane_must_match_crtc_index() {
        let kms = DummyKms::single_output();
        assert!(matches!(select_plane(&kms, crtc_0(), 0), Err(Error::NoPrimaryPlane(_))));
    }

    #[test]
    fn disconnected_connector_is_skipped() {
        let mut kms = DummyKms::single_output();
        kms.set_connector_state(connector::State::Disconnected);
        assert!(matches!(
            OutputPath::resolve(&kms, GraphOptions::default()),
            Err(Error::NoConnectedConnector)
        ));
    }

    #[test]
    fn connector_without_encoders_is_skipped() {
        let mut kms = DummyKms::single_output();
        kms.set_connector_encoders(Vec::new());
        assert!(matches!(
            OutputPath::resolve(&kms, GraphOptions::default()),
            Err(Error::NoConnectedConnector)
        ));
    }

    #[test]
    fn encoder_without_crtcs() {
        let mut kms = DummyKms::single_output();
        kms.set_encoder(encoder(30), 0, None);
        assert!(matches!(
            OutputPath::resolve(&kms, GraphOptions::default()),
            Err(Error::NoSuitableCrtc(c)) if c == output_connector()
        ));
    }

    #[test]
    fn current_crtc_is_preferred_when_asked() {
        let mut kms = DummyKms::single_output();
        kms.set_encoder(encoder(30), 0b11, Some(crtc_1()));
        kms.set_current_encoder(Some(encoder(30)));

        let res = kms.resources().unwrap();
        let connector = kms.connector(output_connector(), false).unwrap();
        assert_eq!(select_crtc(&kms, &res, &connector, false).unwrap(), (crtc_0(), 0));
        assert_eq!(select_crtc(&kms, &res, &connector, true).unwrap(), (crtc_1(), 1));
    }

    #[test]
    fn force_probe_is_forwarded() {
        let kms = DummyKms::single_output();
        OutputPath::resolve(
            &kms,
            GraphOptions {
                force_probe: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(kms.was_force_probed());
    }
}
