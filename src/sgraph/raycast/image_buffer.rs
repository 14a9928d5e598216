use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use cgmath::{Vector3, Zero};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to write image {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode image {path:?}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Linear RGB pixels, row-major from the top row down
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Vector3<f32>>,
}

fn to_byte(channel: f32) -> u8 {
    (255.0 * channel.clamp(0.0, 1.0)) as u8
}

impl ImageBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vector3::zero(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Vector3<f32> {
        self.pixels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Vector3<f32>) {
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    /// Plain text PPM (`P3`), channels clamped to `[0, 1]` and scaled to 255
    pub fn write_ppm<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "P3")?;
        writeln!(out, "{} {}", self.width, self.height)?;
        writeln!(out, "255")?;
        for row in self.pixels.chunks(self.width.max(1) as usize) {
            let line: Vec<String> = row
                .iter()
                .map(|c| format!("{} {} {}", to_byte(c.x), to_byte(c.y), to_byte(c.z)))
                .collect();
            writeln!(out, "{}", line.join("  "))?;
        }
        Ok(())
    }

    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, y| {
            let c = self.get(x, y);
            image::Rgb([to_byte(c.x), to_byte(c.y), to_byte(c.z)])
        })
    }

    /// Writes a PNG when the path ends in `.png`, a PPM otherwise
    pub fn save(&self, path: &Path) -> Result<(), ImageError> {
        let is_png = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false);

        if is_png {
            return self
                .to_rgb_image()
                .save_with_format(path, image::ImageFormat::Png)
                .map_err(|source| ImageError::Encode {
                    path: path.to_path_buf(),
                    source,
                });
        }

        let io_err = |source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
        self.write_ppm(&mut out).map_err(io_err)?;
        out.flush().map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ppm_header_and_clamping() {
        let mut image = ImageBuffer::new(2, 1);
        image.set(0, 0, Vector3::new(1.0, 0.5, 0.0));
        image.set(1, 0, Vector3::new(2.0, -1.0, 0.25));

        let mut out = Vec::new();
        image.write_ppm(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "P3\n2 1\n255\n255 127 0  255 0 63\n");
    }

    #[test]
    fn rows_run_top_to_bottom() {
        let mut image = ImageBuffer::new(1, 2);
        image.set(0, 1, Vector3::new(1.0, 1.0, 1.0));

        let mut out = Vec::new();
        image.write_ppm(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().skip(3).collect();
        assert_eq!(rows, vec!["0 0 0", "255 255 255"]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn pixel_index_does_not_wrap_in_u32() {
        let image = ImageBuffer {
            width: 100_000,
            height: 100_000,
            pixels: Vec::new(),
        };
        assert_eq!(image.index(99_999, 99_999), 9_999_999_999);
    }

    #[test]
    fn save_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let image = ImageBuffer::new(3, 2);

        let ppm = dir.path().join("out.ppm");
        image.save(&ppm).unwrap();
        assert!(std::fs::read_to_string(&ppm).unwrap().starts_with("P3\n3 2\n"));

        let png = dir.path().join("out.png");
        image.save(&png).unwrap();
        let decoded = image::open(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3, 2));
    }
}
