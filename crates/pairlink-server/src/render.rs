//! Pairing code rendering.
//!
//! The renderer only decorates status responses. It never touches session
//! state, and the service treats any failure here as "no image".

use std::io::Cursor;

use image::{imageops, GrayImage, ImageFormat, Luma};
use pairlink_core::RenderError;
use pairlink_settings::QrSettings;
use qrcode::{EcLevel, QrCode};

/// Turns a pairing token into image bytes. Must be deterministic per token.
pub trait TokenRenderer: Send + Sync {
    fn render(&self, token: &str) -> Result<Vec<u8>, RenderError>;
}

/// PNG QR code at the highest error-correction level, for camera scanning.
///
/// `border` is the quiet zone width in modules; scanners want at least 4.
#[derive(Clone, Debug)]
pub struct QrPngRenderer {
    module_size: u32,
    border: u32,
}

impl QrPngRenderer {
    pub fn new(module_size: u32) -> Self {
        Self {
            module_size: module_size.max(1),
            border: 4,
        }
    }

    pub fn with_border(mut self, border: u32) -> Self {
        self.border = border;
        self
    }
}

impl Default for QrPngRenderer {
    fn default() -> Self {
        Self::from(&QrSettings::default())
    }
}

impl From<&QrSettings> for QrPngRenderer {
    fn from(settings: &QrSettings) -> Self {
        Self::new(settings.module_size).with_border(settings.border)
    }
}

impl TokenRenderer for QrPngRenderer {
    fn render(&self, token: &str) -> Result<Vec<u8>, RenderError> {
        let code = QrCode::with_error_correction_level(token.as_bytes(), EcLevel::H)
            .map_err(|e| RenderError::Encode(e.to_string()))?;

        let modules = code
            .render::<Luma<u8>>()
            .module_dimensions(self.module_size, self.module_size)
            .quiet_zone(false)
            .build();

        let pad = self.border.saturating_mul(self.module_size);
        let mut image = GrayImage::from_pixel(
            modules.width().saturating_add(pad.saturating_mul(2)),
            modules.height().saturating_add(pad.saturating_mul(2)),
            Luma([255]),
        );
        imageops::overlay(&mut image, &modules, i64::from(pad), i64::from(pad));

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| RenderError::Image(e.to_string()))?;
        Ok(png.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn renders_png() {
        let bytes = QrPngRenderer::default()
            .render("pair://v2/abcdefghijklmnop-1700000000000-qrstuvwxyz")
            .unwrap();
        assert!(bytes.starts_with(PNG_MAGIC));
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = QrPngRenderer::new(4);
        let a = renderer.render("pair://v2/token").unwrap();
        let b = renderer.render("pair://v2/token").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_tokens_render_differently() {
        let renderer = QrPngRenderer::new(4);
        let a = renderer.render("pair://v2/one").unwrap();
        let b = renderer.render("pair://v2/two").unwrap();
        assert_ne!(a, b);
    }

    fn dimensions(png: &[u8]) -> (u32, u32) {
        let decoded = image::load_from_memory(png).unwrap();
        (decoded.width(), decoded.height())
    }

    #[test]
    fn border_setting_pads_the_image() {
        let token = "pair://v2/abcdefghijklmnop-1700000000000-qrstuvwxyz";
        let bare = QrPngRenderer::from(&QrSettings {
            module_size: 4,
            border: 0,
        })
        .render(token)
        .unwrap();
        let padded = QrPngRenderer::from(&QrSettings {
            module_size: 4,
            border: 12,
        })
        .render(token)
        .unwrap();

        let (bw, bh) = dimensions(&bare);
        let (pw, ph) = dimensions(&padded);
        assert_eq!(bw, bh);
        assert_eq!(pw, bw + 2 * 12 * 4);
        assert_eq!(ph, bh + 2 * 12 * 4);
    }

    #[test]
    fn quiet_zone_is_white() {
        let png = QrPngRenderer::new(3).with_border(2).render("pair://v2/x").unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        for offset in 0..6 {
            assert_eq!(decoded.get_pixel(offset, offset).0, [255]);
        }
        // Finder pattern corner starts right after the border.
        assert_eq!(decoded.get_pixel(6, 6).0, [0]);
    }

    #[test]
    fn oversized_payload_is_an_encode_error() {
        // Level H tops out well below 3 KB of binary data.
        let payload = "x".repeat(4000);
        let err = QrPngRenderer::new(1).render(&payload).unwrap_err();
        assert!(matches!(err, RenderError::Encode(_)));
    }
}
