use anyhow::{Context, Result};
use image::DynamicImage;
use image::imageops::FilterType;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use std::path::Path;
use tracing::debug;

pub const COVER_COLUMNS: u16 = 16;
pub const COVER_ROWS: u16 = 8;

/// A cover image downsampled to terminal cells, two pixels per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    columns: u16,
    rows: u16,
    pixels: Vec<[u8; 3]>,
}

impl CoverArt {
    pub fn from_image(image: &DynamicImage, columns: u16, rows: u16) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let resized = image
            .resize_exact(u32::from(columns), u32::from(rows) * 2, FilterType::Triangle)
            .to_rgb8();
        let pixels = resized.pixels().map(|pixel| pixel.0).collect();
        Self {
            columns,
            rows,
            pixels,
        }
    }

    pub fn open(path: &Path, columns: u16, rows: u16) -> Result<Self> {
        let image =
            image::open(path).with_context(|| format!("failed to decode cover {}", path.display()))?;
        Ok(Self::from_image(&image, columns, rows))
    }

    /// Tries the track's own cover, then the default one.
    pub fn load_with_fallback(primary: &Path, fallback: &Path, columns: u16, rows: u16) -> Option<Self> {
        match Self::open(primary, columns, rows) {
            Ok(cover) => Some(cover),
            Err(err) => {
                debug!("{err:#}");
                Self::open(fallback, columns, rows)
                    .inspect_err(|err| debug!("{err:#}"))
                    .ok()
            }
        }
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    fn pixel(&self, x: u16, y: u16) -> Color {
        let index = usize::from(y) * usize::from(self.columns) + usize::from(x);
        let [r, g, b] = self.pixels.get(index).copied().unwrap_or([0, 0, 0]);
        Color::Rgb(r, g, b)
    }

    /// Upper half blocks: the glyph carries the top pixel, the cell background
    /// the bottom one.
    pub fn lines(&self) -> Vec<Line<'static>> {
        (0..self.rows)
            .map(|row| {
                let spans: Vec<Span<'static>> = (0..self.columns)
                    .map(|column| {
                        let top = self.pixel(column, row * 2);
                        let bottom = self.pixel(column, row * 2 + 1);
                        Span::styled("▀", Style::default().fg(top).bg(bottom))
                    })
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}
