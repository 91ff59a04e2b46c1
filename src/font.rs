//! Font manager
//!
//! Measures text for layout with cosmic-text. The font system (and the system
//! font scan that comes with it) is created the first time non-empty text is
//! measured, so windows that never show text never pay for it.

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping};

use crate::error::{Error, Result};
use crate::geom::Size;

/// Default UI font size in points.
pub const DEFAULT_POINT_SIZE: f32 = 12.0;

pub struct FontManager {
    dpi_x: f32,
    dpi_y: f32,
    font_system: Option<FontSystem>,
}

impl std::fmt::Debug for FontManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontManager")
            .field("dpi_x", &self.dpi_x)
            .field("dpi_y", &self.dpi_y)
            .field("loaded", &self.font_system.is_some())
            .finish()
    }
}

impl FontManager {
    pub fn init(dpi_x: f32, dpi_y: f32) -> Result<Self> {
        Self::check_dpi(dpi_x, dpi_y)?;
        log::debug!("font manager: dpi {}x{}", dpi_x, dpi_y);
        Ok(Self {
            dpi_x,
            dpi_y,
            font_system: None,
        })
    }

    fn check_dpi(dpi_x: f32, dpi_y: f32) -> Result<()> {
        if !(dpi_x > 0.0 && dpi_y > 0.0) {
            return Err(Error::Font(format!("invalid dpi {}x{}", dpi_x, dpi_y)));
        }
        Ok(())
    }

    pub fn dpi(&self) -> (f32, f32) {
        (self.dpi_x, self.dpi_y)
    }

    /// Update the DPI after the window moved to another screen. Invalid
    /// values are ignored.
    pub fn set_dpi(&mut self, dpi_x: f32, dpi_y: f32) {
        match Self::check_dpi(dpi_x, dpi_y) {
            Ok(()) => {
                self.dpi_x = dpi_x;
                self.dpi_y = dpi_y;
            }
            Err(e) => log::warn!("font manager: {}", e),
        }
    }

    /// Pixel size of the default font at the current DPI.
    pub fn font_px(&self) -> f32 {
        DEFAULT_POINT_SIZE * self.dpi_y / 72.0
    }

    /// Measure text dimensions for layout
    pub fn measure(&mut self, text: &str) -> Size {
        if text.is_empty() {
            return Size::default();
        }

        let font_size = self.font_px();
        let metrics = Metrics::new(font_size, font_size * 1.2);
        let font_system = self.font_system_mut();
        let mut buffer = Buffer::new(font_system, metrics);
        buffer.set_size(font_system, None, None);

        let attrs = Attrs::new().family(Family::SansSerif);
        buffer.set_text(font_system, text, attrs, Shaping::Advanced);
        buffer.shape_until_scroll(font_system, false);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;
        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += metrics.line_height;
        }

        // Ensure minimum height for text with no shaped runs
        if total_height == 0.0 {
            total_height = metrics.line_height;
        }

        Size::new(total_width.ceil(), total_height.ceil())
    }

    fn font_system_mut(&mut self) -> &mut FontSystem {
        self.font_system.get_or_insert_with(|| {
            log::info!("font manager: loading system fonts");
            FontSystem::new()
        })
    }
}

impl Drop for FontManager {
    fn drop(&mut self) {
        log::debug!("font manager: released");
    }
}
