//! Half-block rasterization of composited frames
//!
//! Every output cell holds one glyph covering a 1x2 pixel column pair. The
//! glyph is printed as two identical characters so a cell is roughly square
//! on a typical terminal font.

use crossterm::style::{Color, Stylize};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

const UPPER_HALF: &str = "▀▀";
const LOWER_HALF: &str = "▄▄";
const BLANK: &str = "  ";

/// Snapshot of a rasterization in progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Text of every completed row so far
    pub partial: String,
    /// Number of completed output rows
    pub rows_complete: usize,
    /// Number of output rows the frame will have
    pub total_rows: usize,
}

/// Fits a `src_width` x `src_height` image into a grid of `cell_width` x
/// `cell_height` half-block cells, preserving aspect ratio.
///
/// Returns the pixel size to resample to. Width is bounded by `cell_width`
/// and height by `cell_height * 2`.
pub fn calculate_image_size(
    src_width: u32,
    src_height: u32,
    cell_width: u32,
    cell_height: u32,
) -> (u32, u32) {
    if src_width == 0 || src_height == 0 || cell_width == 0 || cell_height == 0 {
        return (0, 0);
    }

    let ratio = src_height as f64 / src_width as f64;
    let max_height = cell_height * 2;
    let mut width = cell_width;
    let mut height = (width as f64 * ratio * 2.0) as u32;

    if height > max_height {
        height = max_height;
        width = (height as f64 / ratio / 2.0) as u32;
    }

    (width, height)
}

/// Rasterizes `canvas` into half-block text
pub fn rasterize(canvas: &RgbaImage, cell_width: u32, cell_height: u32) -> String {
    render(canvas, cell_width, cell_height, None)
}

/// Rasterizes `canvas`, calling `progress` after every second row and after the last one
pub fn rasterize_with_progress<F>(
    canvas: &RgbaImage,
    cell_width: u32,
    cell_height: u32,
    mut progress: F,
) -> String
where
    F: FnMut(Progress),
{
    render(canvas, cell_width, cell_height, Some(&mut progress))
}

fn render(
    canvas: &RgbaImage,
    cell_width: u32,
    cell_height: u32,
    mut progress: Option<&mut dyn FnMut(Progress)>,
) -> String {
    let (width, height) =
        calculate_image_size(canvas.width(), canvas.height(), cell_width, cell_height);
    if width == 0 || height == 0 {
        return String::new();
    }

    let wide = DynamicImage::ImageRgba8(canvas.clone()).into_rgba16();
    let resized = imageops::resize(&wide, width, height, FilterType::Lanczos3);

    let total_rows = (height as usize + 1) / 2;
    let mut out = String::new();
    let mut rows_complete = 0;

    for y in (0..height).step_by(2) {
        for x in 0..width {
            let top = *resized.get_pixel(x, y);
            let bottom = if y + 1 < height {
                *resized.get_pixel(x, y + 1)
            } else {
                Rgba([0, 0, 0, 0])
            };
            out.push_str(&render_cell(top, bottom));
        }
        out.push('\n');
        rows_complete += 1;

        if let Some(sink) = progress.as_deref_mut() {
            if rows_complete % 2 == 0 || y + 2 >= height {
                sink(Progress {
                    partial: out.clone(),
                    rows_complete,
                    total_rows,
                });
            }
        }
    }

    out
}

/// Renders two vertically stacked pixels as one styled half-block glyph
fn render_cell(top: Rgba<u16>, bottom: Rgba<u16>) -> String {
    match (top[3] != 0, bottom[3] != 0) {
        (false, false) => BLANK.to_string(),
        (false, true) => LOWER_HALF.with(truecolor(bottom)).to_string(),
        (true, false) => UPPER_HALF.with(truecolor(top)).to_string(),
        (true, true) => UPPER_HALF
            .with(truecolor(top))
            .on(truecolor(bottom))
            .to_string(),
    }
}

/// Reduces a 16-bit pixel to a 24-bit terminal color by truncation
fn truecolor(pixel: Rgba<u16>) -> Color {
    Color::Rgb {
        r: (pixel[0] >> 8) as u8,
        g: (pixel[1] >> 8) as u8,
        b: (pixel[2] >> 8) as u8,
    }
}
