//! Window configuration

use crate::style::Stylesheet;

/// Render mode selection - determines software vs GPU rendering path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Software rendering via CPU framebuffer (used for tests)
    Software,
    /// GPU rendering via wgpu
    #[default]
    Gpu,
}

/// Options for [`Toolkit::open_window`](crate::toolkit::Toolkit::open_window).
#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Native handle of a window to embed into, where the platform supports it.
    pub parent: Option<u64>,
    pub render_mode: RenderMode,
    pub stylesheet: Stylesheet,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "trellis".to_string(),
            width: 640,
            height: 480,
            parent: None,
            render_mode: RenderMode::default(),
            stylesheet: Stylesheet::default(),
        }
    }
}

impl WindowOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn parent(mut self, handle: u64) -> Self {
        self.parent = Some(handle);
        self
    }

    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn stylesheet(mut self, stylesheet: Stylesheet) -> Self {
        self.stylesheet = stylesheet;
        self
    }
}
