//! Frame compositor applying GIF disposal rules

use image::{Rgba, RgbaImage};
use jif_core::{Bounds, Disposal, SubFrame};
use log::debug;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Smallest rectangle enclosing every sub-frame
pub fn canvas_bounds(frames: &[SubFrame]) -> Bounds {
    let mut bounds = frames.iter().map(|f| f.bounds);
    match bounds.next() {
        Some(first) => bounds.fold(first, |acc, b| acc.union(&b)),
        None => Bounds::default(),
    }
}

/// Composites every frame, returning one canvas snapshot per sub-frame
pub fn composite(frames: &[SubFrame]) -> Vec<RgbaImage> {
    FrameCompositor::new(frames).collect()
}

/// Iterator producing fully composited canvas snapshots in frame order.
///
/// Each snapshot is an independent copy, so later disposal steps never
/// change frames that were already yielded.
pub struct FrameCompositor<'a> {
    frames: &'a [SubFrame],
    canvas: Bounds,
    current: RgbaImage,
    saved: RgbaImage,
    next: usize,
}

impl<'a> FrameCompositor<'a> {
    /// Creates a new compositor over `frames`
    pub fn new(frames: &'a [SubFrame]) -> Self {
        let canvas = canvas_bounds(frames);
        debug!(
            "Compositing {} frames on a {}x{} canvas at ({}, {})",
            frames.len(),
            canvas.width,
            canvas.height,
            canvas.left,
            canvas.top
        );
        Self {
            frames,
            canvas,
            current: RgbaImage::from_pixel(canvas.width, canvas.height, TRANSPARENT),
            saved: RgbaImage::from_pixel(canvas.width, canvas.height, TRANSPARENT),
            next: 0,
        }
    }

    fn dispose(&mut self, previous: &SubFrame) {
        match previous.disposal {
            Disposal::None => {}
            Disposal::RestoreBackground => self.clear(previous.bounds),
            Disposal::RestorePrevious => self.current.clone_from(&self.saved),
        }
    }

    /// Resets the given rectangle of `current` to fully transparent
    fn clear(&mut self, bounds: Bounds) {
        let (x0, y0) = self.to_canvas(bounds.left, bounds.top);
        let (x1, y1) = self.to_canvas(bounds.right(), bounds.bottom());
        let x1 = x1.min(self.current.width() as i64);
        let y1 = y1.min(self.current.height() as i64);

        for y in y0.max(0)..y1 {
            for x in x0.max(0)..x1 {
                self.current.put_pixel(x as u32, y as u32, TRANSPARENT);
            }
        }
    }

    fn draw(&mut self, frame: &SubFrame) {
        let (origin_x, origin_y) = self.to_canvas(frame.bounds.left, frame.bounds.top);
        let canvas_width = self.current.width() as i64;
        let canvas_height = self.current.height() as i64;

        for y in 0..frame.bounds.height {
            let dest_y = origin_y + y as i64;
            if dest_y < 0 || dest_y >= canvas_height {
                continue;
            }
            for x in 0..frame.bounds.width {
                let dest_x = origin_x + x as i64;
                if dest_x < 0 || dest_x >= canvas_width {
                    continue;
                }
                let pixel = self.current.get_pixel_mut(dest_x as u32, dest_y as u32);
                blend_over(pixel, frame.color_at(x, y));
            }
        }
    }

    fn to_canvas(&self, x: i32, y: i32) -> (i64, i64) {
        (
            x as i64 - self.canvas.left as i64,
            y as i64 - self.canvas.top as i64,
        )
    }
}

impl Iterator for FrameCompositor<'_> {
    type Item = RgbaImage;

    fn next(&mut self) -> Option<RgbaImage> {
        let frames = self.frames;
        let frame = frames.get(self.next)?;

        if let Some(previous) = self.next.checked_sub(1).map(|i| &frames[i]) {
            self.dispose(previous);
        }
        if frame.disposal == Disposal::RestorePrevious {
            self.saved.clone_from(&self.current);
        }
        self.draw(frame);

        self.next += 1;
        Some(self.current.clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.frames.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameCompositor<'_> {}

/// Porter-Duff "over" of a straight-alpha source onto `dest`
fn blend_over(dest: &mut Rgba<u8>, src: [u8; 4]) {
    match src[3] {
        0 => {}
        255 => *dest = Rgba(src),
        alpha => {
            let src_a = alpha as f32 / 255.0;
            let dest_a = dest[3] as f32 / 255.0 * (1.0 - src_a);
            let out_a = src_a + dest_a;

            let mut out = [0u8; 4];
            for c in 0..3 {
                let value = (src[c] as f32 * src_a + dest[c] as f32 * dest_a) / out_a;
                out[c] = value.round().clamp(0.0, 255.0) as u8;
            }
            out[3] = (out_a * 255.0).round() as u8;
            *dest = Rgba(out);
        }
    }
}
