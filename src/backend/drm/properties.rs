//! Resolution of the property handles needed for an atomic modeset

use std::collections::HashMap;

use drm::control::{connector, crtc, plane, property};
use tracing::{trace, warn};

use super::{
    control::{KernelObject, KmsDevice, PropertyEntry},
    Error,
};

/// Crtc properties set by a modeset
pub const CRTC_PROPERTIES: &[&str] = &["MODE_ID", "ACTIVE"];
/// Connector properties set by a modeset
pub const CONNECTOR_PROPERTIES: &[&str] = &["CRTC_ID"];
/// Plane properties set by a modeset
pub const PLANE_PROPERTIES: &[&str] = &[
    "SRC_X", "SRC_Y", "SRC_W", "SRC_H", "CRTC_X", "CRTC_Y", "CRTC_W", "CRTC_H", "FB_ID", "CRTC_ID",
];

/// Property handles of one object
///
/// A table only exists if every property required for its object was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTable {
    object: KernelObject,
    handles: HashMap<&'static str, property::Handle>,
}

impl PropertyTable {
    /// Resolves the properties an object needs for a modeset.
    pub fn resolve<K: KmsDevice + ?Sized>(device: &K, object: KernelObject) -> Result<PropertyTable, Error> {
        PropertyTable::resolve_with(device, object, object.required_properties())
    }

    /// Resolves the properties `required` of `object`.
    ///
    /// Every missing property is logged before failing with [`Error::MissingProperties`].
    pub fn resolve_with<K: KmsDevice + ?Sized>(
        device: &K,
        object: KernelObject,
        required: &[&'static str],
    ) -> Result<PropertyTable, Error> {
        let props = object.fetch_properties(device)?;
        PropertyTable::from_entries(object, &props, required)
    }

    fn from_entries(
        object: KernelObject,
        props: &[PropertyEntry],
        required: &[&'static str],
    ) -> Result<PropertyTable, Error> {
        let mut handles = HashMap::with_capacity(required.len());
        for prop in props {
            if let Some(name) = required.iter().find(|name| **name == prop.name) {
                trace!("{} property {} is {:?}", object, name, prop.handle);
                handles.insert(*name, prop.handle);
            }
        }

        let missing = required
            .iter()
            .copied()
            .filter(|name| !handles.contains_key(name))
            .collect::<Vec<_>>();
        for name in &missing {
            warn!("{} is missing the property {}", object, name);
        }

        if missing.is_empty() {
            Ok(PropertyTable { object, handles })
        } else {
            Err(Error::MissingProperties { object, missing })
        }
    }

    /// Object the table belongs to
    pub fn object(&self) -> KernelObject {
        self.object
    }

    /// Returns the handle of a resolved property.
    pub fn get(&self, name: &'static str) -> Result<property::Handle, Error> {
        self.handles.get(name).copied().ok_or(Error::UnknownProperty {
            handle: self.object.raw(),
            name,
        })
    }
}

/// Returns the current value of a single property, or `None` if the object does not have it.
pub fn lookup_property<K: KmsDevice + ?Sized>(
    device: &K,
    object: KernelObject,
    name: &str,
) -> Result<Option<u64>, Error> {
    Ok(device
        .properties(object)?
        .into_iter()
        .find(|prop| prop.name == name)
        .map(|prop| prop.value))
}

/// Property tables of all objects taking part in a modeset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModesetProperties {
    /// Crtc properties
    pub crtc: PropertyTable,
    /// Connector properties
    pub connector: PropertyTable,
    /// Plane properties
    pub plane: PropertyTable,
}

impl ModesetProperties {
    /// Resolves the tables of all three objects.
    ///
    /// Every object is resolved before failing, so the logs list all missing properties. The
    /// returned error is the first failing object's.
    pub fn resolve<K: KmsDevice + ?Sized>(
        device: &K,
        crtc: crtc::Handle,
        connector: connector::Handle,
        plane: plane::Handle,
    ) -> Result<ModesetProperties, Error> {
        let crtc = PropertyTable::resolve(device, crtc.into());
        let connector = PropertyTable::resolve(device, connector.into());
        let plane = PropertyTable::resolve(device, plane.into());

        Ok(ModesetProperties {
            crtc: crtc?,
            connector: connector?,
            plane: plane?,
        })
    }
}
