//! Framebuffers backed by
//! [dumb buffers](https://01.org/linuxgraphics/gfx-docs/drm/gpu/drm-kms.html#dumb-buffer-objects)

use std::fmt;

use drm::buffer::Buffer as DrmBuffer;
use drm::control::{dumbbuffer::DumbBuffer, framebuffer, Device as ControlDevice};
use drm_fourcc::DrmFourcc;
use tracing::{debug, error};

use super::{
    control::Framebuffer,
    error::{AccessError, Error},
    DrmDeviceFd,
};
use crate::utils::DevPath;

/// Returns the bits per pixel and the color depth of formats usable for dumb buffers.
pub const fn format_info(format: DrmFourcc) -> Option<(u32, u32)> {
    match format {
        DrmFourcc::Xrgb8888 | DrmFourcc::Xbgr8888 => Some((32, 24)),
        DrmFourcc::Argb8888 | DrmFourcc::Abgr8888 => Some((32, 32)),
        DrmFourcc::Rgb565 => Some((16, 16)),
        _ => None,
    }
}

/// Encodes `[r, g, b, a]` as one pixel of `format`, in memory order.
pub fn pack_pixel(format: DrmFourcc, [r, g, b, a]: [u8; 4]) -> Option<Vec<u8>> {
    // fourcc formats are little endian
    match format {
        DrmFourcc::Xrgb8888 => Some(vec![b, g, r, 0xff]),
        DrmFourcc::Argb8888 => Some(vec![b, g, r, a]),
        DrmFourcc::Xbgr8888 => Some(vec![r, g, b, 0xff]),
        DrmFourcc::Abgr8888 => Some(vec![r, g, b, a]),
        DrmFourcc::Rgb565 => {
            let value = ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3);
            Some(value.to_le_bytes().to_vec())
        }
        _ => None,
    }
}

/// Dumb buffer registered as a framebuffer
///
/// Both the framebuffer and the buffer are destroyed on drop.
pub struct DumbFramebuffer {
    device: DrmDeviceFd,
    buffer: DumbBuffer,
    fb: framebuffer::Handle,
    format: DrmFourcc,
}

impl fmt::Debug for DumbFramebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumbFramebuffer")
            .field("fb", &self.fb)
            .field("format", &self.format)
            .field("size", &self.size())
            .finish()
    }
}

impl DumbFramebuffer {
    /// Allocates a dumb buffer of the given size and registers it as a framebuffer.
    pub fn create(
        device: &DrmDeviceFd,
        size: (u32, u32),
        format: DrmFourcc,
    ) -> Result<DumbFramebuffer, Error> {
        let (bpp, depth) = format_info(format).ok_or(Error::UnsupportedFormat(format))?;

        let buffer = device
            .create_dumb_buffer(size, format, bpp)
            .map_err(|source| AccessError {
                errmsg: "Failed to create dumb buffer",
                dev: device.dev_path(),
                source,
            })?;

        let fb = match device.add_framebuffer(&buffer, depth, bpp) {
            Ok(fb) => fb,
            Err(source) => {
                if let Err(err) = device.destroy_dumb_buffer(buffer) {
                    error!("Failed to destroy dumb buffer: {}", err);
                }
                return Err(AccessError {
                    errmsg: "Failed to add framebuffer",
                    dev: device.dev_path(),
                    source,
                }
                .into());
            }
        };
        debug!("Created framebuffer {:?} of size {:?} ({:?})", fb, size, format);

        Ok(DumbFramebuffer {
            device: device.clone(),
            buffer,
            fb,
            format,
        })
    }

    /// Maps the buffer and calls `f` with its memory and its pitch.
    pub fn map<T>(&mut self, f: impl FnOnce(&mut [u8], u32) -> T) -> Result<T, Error> {
        let pitch = self.buffer.pitch();
        let mut mapping = self
            .device
            .map_dumb_buffer(&mut self.buffer)
            .map_err(|source| AccessError {
                errmsg: "Failed to map dumb buffer",
                dev: self.device.dev_path(),
                source,
            })?;
        Ok(f(mapping.as_mut(), pitch))
    }
}

impl AsRef<framebuffer::Handle> for DumbFramebuffer {
    fn as_ref(&self) -> &framebuffer::Handle {
        &self.fb
    }
}

impl Framebuffer for DumbFramebuffer {
    fn format(&self) -> DrmFourcc {
        self.format
    }

    fn size(&self) -> (u32, u32) {
        self.buffer.size()
    }

    #[profiling::function]
    fn clear(&mut self, color: [u8; 4]) -> Result<(), Error> {
        let pixel = pack_pixel(self.format, color).ok_or(Error::UnsupportedFormat(self.format))?;
        let (width, _) = self.size();
        let row_len = width as usize * pixel.len();

        self.map(|data, pitch| {
            for row in data.chunks_mut(pitch as usize) {
                let len = row_len.min(row.len());
                for px in row[..len].chunks_exact_mut(pixel.len()) {
                    px.copy_from_slice(&pixel);
                }
            }
        })
    }
}

impl Drop for DumbFramebuffer {
    fn drop(&mut self) {
        if let Err(err) = self.device.destroy_framebuffer(self.fb) {
            error!("Failed to destroy framebuffer {:?}: {}", self.fb, err);
        }
        if let Err(err) = self.device.destroy_dumb_buffer(self.buffer) {
            error!("Failed to destroy dumb buffer: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bpp_and_depth() {
        assert_eq!(format_info(DrmFourcc::Xrgb8888), Some((32, 24)));
        assert_eq!(format_info(DrmFourcc::Argb8888), Some((32, 32)));
        assert_eq!(format_info(DrmFourcc::Rgb565), Some((16, 16)));
        assert_eq!(format_info(DrmFourcc::Nv12), None);
    }

    #[test]
    fn little_endian_pixels() {
        let color = [0x10, 0x20, 0x30, 0x40];
        assert_eq!(pack_pixel(DrmFourcc::Xrgb8888, color).unwrap(), vec![0x30, 0x20, 0x10, 0xff]);
        assert_eq!(pack_pixel(DrmFourcc::Abgr8888, color).unwrap(), vec![0x10, 0x20, 0x30, 0x40]);
        assert_eq!(pack_pixel(DrmFourcc::Rgb565, [0xff, 0, 0, 0xff]).unwrap(), vec![0x00, 0xf8]);
        assert!(pack_pixel(DrmFourcc::Nv12, color).is_none());
    }
}
