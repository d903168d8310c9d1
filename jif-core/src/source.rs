//! Loading GIF data from local files or URLs

use crate::{Bounds, Error, Result, SubFrame};
use log::{debug, info};
use std::io::Read;
use std::path::Path;

/// A fully decoded GIF animation
#[derive(Debug, Clone)]
pub struct FrameSource {
    /// Logical screen width from the GIF header
    pub screen_width: u16,
    /// Logical screen height from the GIF header
    pub screen_height: u16,
    frames: Vec<SubFrame>,
}

impl FrameSource {
    /// Wraps already-decoded frames. An animation needs at least one frame.
    pub fn from_frames(
        screen_width: u16,
        screen_height: u16,
        frames: Vec<SubFrame>,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::NoFrames);
        }
        Ok(Self {
            screen_width,
            screen_height,
            frames,
        })
    }

    /// Decodes a complete GIF stream from a reader
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(reader)?;

        let screen_width = decoder.width();
        let screen_height = decoder.height();
        let global_palette = decoder.global_palette().map(<[u8]>::to_vec);

        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame()? {
            let rgb = frame
                .palette
                .as_deref()
                .or(global_palette.as_deref())
                .unwrap_or(&[]);

            frames.push(SubFrame::new(
                Bounds::new(
                    frame.left as i32,
                    frame.top as i32,
                    frame.width as u32,
                    frame.height as u32,
                ),
                frame.buffer.to_vec(),
                SubFrame::resolve_palette(rgb, frame.transparent),
                frame.dispose.into(),
                frame.delay,
            ));
        }

        debug!(
            "Decoded {} frames, logical screen {}x{}",
            frames.len(),
            screen_width,
            screen_height
        );

        Self::from_frames(screen_width, screen_height, frames)
    }

    /// Decodes a GIF held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(bytes)
    }

    /// Reads and decodes a local GIF file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Downloads and decodes a GIF with an HTTP GET. Anything but `200 OK` is an error.
    pub fn fetch(url: &str) -> Result<Self> {
        info!("Downloading GIF from {}...", url);

        let response = match ureq::get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                return Err(Error::HttpStatus {
                    url: url.to_string(),
                    status,
                    reason: response.status_text().to_string(),
                })
            }
            Err(e) => {
                return Err(Error::Fetch {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };

        if response.status() != 200 {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: response.status(),
                reason: response.status_text().to_string(),
            });
        }

        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        debug!("Downloaded {} bytes", bytes.len());

        Self::from_bytes(&bytes)
    }

    /// Loads from a URL when `source` starts with `http://` or `https://`,
    /// otherwise from a local path
    pub fn load(source: &str) -> Result<Self> {
        if is_url(source) {
            Self::fetch(source)
        } else {
            Self::open(source)
        }
    }

    /// All frames in display order
    pub fn frames(&self) -> &[SubFrame] {
        &self.frames
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a constructed source
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Delay of frame `index` in hundredths of a second
    pub fn delay(&self, index: usize) -> Option<u16> {
        self.frames.get(index).map(|f| f.delay)
    }
}

/// Returns true if `source` should be fetched over HTTP
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
