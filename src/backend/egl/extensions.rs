//! Matching of EGL extension strings
//!
//! EGL advertises extensions as a single space separated string. Looking for an extension
//! with a plain substring search yields false positives (`EGL_EXT_device_base` is a prefix of
//! `EGL_EXT_device_baseless`), so every match has to be bounded by a space or the end of the
//! string on both sides.

use std::fmt;

use tracing::{debug, warn};

use super::Error;

/// Client extensions required to enumerate devices and create device platform displays.
pub const CLIENT_EXTENSIONS: &[&str] = &[
    "EGL_EXT_device_base",
    "EGL_EXT_device_enumeration",
    "EGL_EXT_device_query",
    "EGL_EXT_platform_base",
    "EGL_EXT_platform_device",
];

/// Device extension exposing the DRM device file backing an `EGLDeviceEXT`.
pub const DEVICE_DRM_EXTENSION: &str = "EGL_EXT_device_drm";

/// Where an extension string was queried from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionScope {
    /// Display independent client extensions
    Client,
    /// Extensions of a single `EGLDeviceEXT`
    Device,
}

impl fmt::Display for ExtensionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionScope::Client => f.write_str("client"),
            ExtensionScope::Device => f.write_str("device"),
        }
    }
}

/// Returns `true` if `name` appears as a complete token of the extension string `list`.
pub fn contains_extension(list: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    list.match_indices(name).any(|(pos, _)| {
        let before = list[..pos].chars().next_back();
        let after = list[pos + name.len()..].chars().next();
        matches!(before, None | Some(' ')) && matches!(after, None | Some(' '))
    })
}

/// Returns every name of `required` that is not part of the extension string `list`.
pub fn missing_extensions(list: &str, required: &[&'static str]) -> Vec<&'static str> {
    required
        .iter()
        .copied()
        .filter(|name| !contains_extension(list, name))
        .collect()
}

/// Checks that every extension of `required` is supported.
///
/// All names are checked before returning, every missing one is logged, so a single call
/// reports the complete set of missing extensions.
pub fn check_extensions(list: &str, required: &[&'static str], scope: ExtensionScope) -> Result<(), Error> {
    debug!("Supported extensions on {}: {}", scope, list);

    let missing = missing_extensions(list, required);
    for name in &missing {
        warn!("EGL {} extension {} not found", scope, name);
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::EglExtensionNotSupported { scope, missing })
    }
}
