//! Display modes and the selection of the mode an output is driven with

use std::os::raw::c_char;

use drm::control::{Mode, ModeTypeFlags};

/// Timings of a display mode
///
/// Owned copy of a kernel `drm_mode_modeinfo`, it stays valid after the connector it was read
/// from is gone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    /// Pixel clock in kHz
    pub clock: u32,
    /// Horizontal active pixels
    pub hdisplay: u16,
    /// Horizontal sync start
    pub hsync_start: u16,
    /// Horizontal sync end
    pub hsync_end: u16,
    /// Horizontal total
    pub htotal: u16,
    /// Horizontal skew
    pub hskew: u16,
    /// Vertical active lines
    pub vdisplay: u16,
    /// Vertical sync start
    pub vsync_start: u16,
    /// Vertical sync end
    pub vsync_end: u16,
    /// Vertical total
    pub vtotal: u16,
    /// Vertical scan
    pub vscan: u16,
    /// Refresh rate in Hz
    pub vrefresh: u32,
    /// `DRM_MODE_FLAG_*` bits
    pub flags: u32,
    /// `DRM_MODE_TYPE_*` bits
    pub mode_type: u32,
    /// Mode name, e.g. `1920x1080`
    pub name: String,
}

impl DisplayMode {
    /// Creates a mode with the given active area and refresh rate, every other timing is zero.
    pub fn new(width: u16, height: u16, vrefresh: u32) -> DisplayMode {
        DisplayMode {
            clock: 0,
            hdisplay: width,
            hsync_start: 0,
            hsync_end: 0,
            htotal: 0,
            hskew: 0,
            vdisplay: height,
            vsync_start: 0,
            vsync_end: 0,
            vtotal: 0,
            vscan: 0,
            vrefresh,
            flags: 0,
            mode_type: 0,
            name: format!("{}x{}", width, height),
        }
    }

    /// Marks the mode as preferred by the display.
    pub fn preferred(mut self) -> DisplayMode {
        self.mode_type |= ModeTypeFlags::PREFERRED.bits();
        self
    }

    /// Active area in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.hdisplay as u32, self.vdisplay as u32)
    }

    /// Number of active pixels
    pub fn area(&self) -> u64 {
        self.hdisplay as u64 * self.vdisplay as u64
    }

    /// Returns `true` if the driver flagged the mode as preferred.
    pub fn is_preferred(&self) -> bool {
        self.mode_type & ModeTypeFlags::PREFERRED.bits() != 0
    }
}

impl From<Mode> for DisplayMode {
    fn from(mode: Mode) -> Self {
        let raw = drm_ffi::drm_mode_modeinfo::from(mode);
        let name = raw
            .name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8 as char)
            .collect();

        DisplayMode {
            clock: raw.clock,
            hdisplay: raw.hdisplay,
            hsync_start: raw.hsync_start,
            hsync_end: raw.hsync_end,
            htotal: raw.htotal,
            hskew: raw.hskew,
            vdisplay: raw.vdisplay,
            vsync_start: raw.vsync_start,
            vsync_end: raw.vsync_end,
            vtotal: raw.vtotal,
            vscan: raw.vscan,
            vrefresh: raw.vrefresh,
            flags: raw.flags,
            mode_type: raw.type_,
            name,
        }
    }
}

impl From<&DisplayMode> for Mode {
    fn from(mode: &DisplayMode) -> Self {
        // the kernel expects a nul terminated name
        let mut name = [0 as c_char; 32];
        for (dst, src) in name.iter_mut().zip(mode.name.bytes().take(31)) {
            *dst = src as c_char;
        }

        Mode::from(drm_ffi::drm_mode_modeinfo {
            clock: mode.clock,
            hdisplay: mode.hdisplay,
            hsync_start: mode.hsync_start,
            hsync_end: mode.hsync_end,
            htotal: mode.htotal,
            hskew: mode.hskew,
            vdisplay: mode.vdisplay,
            vsync_start: mode.vsync_start,
            vsync_end: mode.vsync_end,
            vtotal: mode.vtotal,
            vscan: mode.vscan,
            vrefresh: mode.vrefresh,
            flags: mode.flags,
            type_: mode.mode_type,
            name,
        })
    }
}

/// Picks the mode to drive a connector with.
///
/// The first mode flagged as preferred wins. Without one the mode with the largest area is
/// chosen, the earliest one if several share it. Returns `None` only for an empty list.
pub fn select_mode(modes: &[DisplayMode]) -> Option<&DisplayMode> {
    let mut largest: Option<&DisplayMode> = None;

    for mode in modes {
        if mode.is_preferred() {
            return Some(mode);
        }
        if largest.map_or(true, |largest| mode.area() > largest.area()) {
            largest = Some(mode);
        }
    }

    largest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_beats_larger() {
        let modes = [DisplayMode::new(1920, 1080, 60), DisplayMode::new(1280, 720, 60).preferred()];
        assert_eq!(select_mode(&modes).unwrap().size(), (1280, 720));
    }

    #[test]
    fn largest_without_preferred() {
        let modes = [
            DisplayMode::new(1280, 720, 60),
            DisplayMode::new(2560, 1440, 60),
            DisplayMode::new(1920, 1080, 60),
        ];
        assert_eq!(select_mode(&modes).unwrap().size(), (2560, 1440));
    }

    #[test]
    fn first_of_equal_area_wins() {
        let modes = [DisplayMode::new(1920, 1080, 60), DisplayMode::new(1920, 1080, 144)];
        assert_eq!(select_mode(&modes).unwrap().vrefresh, 60);
    }

    #[test]
    fn first_preferred_wins() {
        let modes = [
            DisplayMode::new(800, 600, 60),
            DisplayMode::new(1024, 768, 60).preferred(),
            DisplayMode::new(1920, 1080, 60).preferred(),
        ];
        assert_eq!(select_mode(&modes).unwrap().size(), (1024, 768));
    }

    #[test]
    fn selection_is_deterministic() {
        let modes = [DisplayMode::new(1920, 1080, 60), DisplayMode::new(1280, 720, 60).preferred()];
        assert_eq!(select_mode(&modes), select_mode(&modes));
        assert!(select_mode(&[]).is_none());
    }

    #[test]
    fn kernel_mode_conversion_keeps_timings() {
        let mut mode = DisplayMode::new(1920, 1080, 60).preferred();
        mode.clock = 148_500;
        mode.htotal = 2200;
        mode.vtotal = 1125;

        let kernel = Mode::from(&mode);
        assert_eq!(kernel.size(), (1920, 1080));
        assert_eq!(kernel.vrefresh(), 60);
        assert_eq!(DisplayMode::from(kernel), mode);
    }
}
