//! Decoded GIF frame data structures

/// Pixel rectangle of a sub-frame within the animation canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    /// X offset of the left edge (can be negative)
    pub left: i32,
    /// Y offset of the top edge (can be negative)
    pub top: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Bounds {
    /// Creates a new bounds rectangle
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> i32 {
        self.left.saturating_add(self.width as i32)
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i32 {
        self.top.saturating_add(self.height as i32)
    }

    /// Smallest rectangle covering both `self` and `other`
    pub fn union(&self, other: &Bounds) -> Bounds {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Bounds::new(left, top, (right - left) as u32, (bottom - top) as u32)
    }

    /// Returns true if the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// How the canvas is altered after a frame has been displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposal {
    /// Leave the canvas as is; the next frame draws on top
    #[default]
    None,
    /// Clear the frame's rectangle to fully transparent
    RestoreBackground,
    /// Restore the canvas to its state before the frame was drawn
    RestorePrevious,
}

impl From<gif::DisposalMethod> for Disposal {
    fn from(method: gif::DisposalMethod) -> Self {
        match method {
            gif::DisposalMethod::Any | gif::DisposalMethod::Keep => Disposal::None,
            gif::DisposalMethod::Background => Disposal::RestoreBackground,
            gif::DisposalMethod::Previous => Disposal::RestorePrevious,
        }
    }
}

/// A single GIF-native frame: indexed pixels covering `bounds`
#[derive(Debug, Clone)]
pub struct SubFrame {
    /// Position and size within the canvas
    pub bounds: Bounds,
    /// Palette indices, row-major, `width * height` entries
    pub indices: Vec<u8>,
    /// Resolved RGBA palette; the transparent index already has alpha 0
    pub palette: Vec<[u8; 4]>,
    /// Disposal applied before the next frame is drawn
    pub disposal: Disposal,
    /// Display time in hundredths of a second (0 means "use the default")
    pub delay: u16,
}

impl SubFrame {
    /// Creates a new sub-frame
    pub fn new(
        bounds: Bounds,
        indices: Vec<u8>,
        palette: Vec<[u8; 4]>,
        disposal: Disposal,
        delay: u16,
    ) -> Self {
        Self {
            bounds,
            indices,
            palette,
            disposal,
            delay,
        }
    }

    /// Resolves a packed RGB palette (as stored in GIF color tables) into RGBA,
    /// marking `transparent` with alpha 0
    pub fn resolve_palette(rgb: &[u8], transparent: Option<u8>) -> Vec<[u8; 4]> {
        rgb.chunks_exact(3)
            .enumerate()
            .map(|(i, c)| {
                let alpha = if transparent == Some(i as u8) { 0 } else { 255 };
                [c[0], c[1], c[2], alpha]
            })
            .collect()
    }

    /// RGBA color of the pixel at (`x`, `y`) relative to the frame's own origin.
    ///
    /// Indices missing from the palette, and coordinates outside the pixel
    /// data, resolve to transparent.
    pub fn color_at(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.bounds.width || y >= self.bounds.height {
            return [0, 0, 0, 0];
        }
        let offset = y as usize * self.bounds.width as usize + x as usize;
        self.indices
            .get(offset)
            .and_then(|&index| self.palette.get(index as usize))
            .copied()
            .unwrap_or([0, 0, 0, 0])
    }
}
