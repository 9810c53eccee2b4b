//! Image file decoding.

mod jpeg;

use std::{fs, path::Path};

use anyhow::{bail, Context};

use crate::{
    error::{Error, Result},
    frame::{ChannelOrder, Frame},
    resolution::Resolution,
};

/// Enumeration of image formats supported by this library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageFormat {
    /// JFIF JPEG.
    Jpeg,
    /// Portable Network Graphics.
    Png,
    /// Windows Bitmap.
    Bmp,
}

impl ImageFormat {
    /// File extensions of all supported formats, suitable for a file picker filter.
    pub const EXTENSIONS: &'static [&'static str] = &["png", "jpg", "jpeg", "bmp"];

    /// Determines the format of an image file from its extension (case-insensitive).
    pub fn from_extension(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("png") => Ok(Self::Png),
            Some("bmp") => Ok(Self::Bmp),
            _ => bail!(
                "unsupported image format (file extension must be one of {:?})",
                Self::EXTENSIONS,
            ),
        }
    }

    /// Determines the format of an image file from its content.
    ///
    /// Files are identified by their signature, so a PNG named `photo.jpg` still decodes. The
    /// extension is only consulted when the content matches no known signature.
    pub fn detect(path: &Path, data: &[u8]) -> anyhow::Result<Self> {
        let format = match image::guess_format(data) {
            Ok(image::ImageFormat::Jpeg) => Self::Jpeg,
            Ok(image::ImageFormat::Png) => Self::Png,
            Ok(image::ImageFormat::Bmp) => Self::Bmp,
            Ok(other) => bail!("unsupported image format {other:?}"),
            Err(_) => return Self::from_extension(path),
        };

        if let Ok(ext_format) = Self::from_extension(path) {
            if ext_format != format {
                log::debug!(
                    "'{}' contains {format:?} data despite its extension",
                    path.display()
                );
            }
        }
        Ok(format)
    }
}

/// Loads an image file into a [`Frame`] in [`ChannelOrder::NATIVE`] order.
///
/// PNG, JPEG and BMP files are supported; the format is detected as described in
/// [`ImageFormat::detect`]. Missing, unreadable, empty, corrupt, and zero-sized images result in
/// an [`Error::Decode`] carrying the path and the underlying cause.
pub fn decode<P: AsRef<Path>>(path: P) -> Result<Frame> {
    decode_impl(path.as_ref())
}

fn decode_impl(path: &Path) -> Result<Frame> {
    match load(path) {
        Ok(frame) => {
            log::debug!("decoded '{}' ({:?})", path.display(), frame);
            Ok(frame)
        }
        Err(e) => {
            log::debug!("failed to decode '{}': {:#}", path.display(), e);
            Err(Error::Decode {
                path: path.to_path_buf(),
                source: e.into(),
            })
        }
    }
}

fn load(path: &Path) -> anyhow::Result<Frame> {
    // TODO: add a file size limit; this loads the whole file into memory!
    let data = fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    if data.is_empty() {
        bail!("file is empty");
    }
    let format = ImageFormat::detect(path, &data)?;

    let DecodedImage { res, rgb } = match format {
        ImageFormat::Jpeg => jpeg::decode_jpeg(&data)?,
        ImageFormat::Png => decode_with_image(&data, image::ImageFormat::Png)?,
        ImageFormat::Bmp => decode_with_image(&data, image::ImageFormat::Bmp)?,
    };
    if res.is_empty() {
        bail!("image has no pixels ({res})");
    }

    let frame = Frame::from_raw(res, ChannelOrder::Rgb, rgb)?;
    Ok(frame.to_channel_order(ChannelOrder::NATIVE))
}

/// Tightly packed RGB pixel data produced by a decoder.
struct DecodedImage {
    res: Resolution,
    rgb: Vec<u8>,
}

fn decode_with_image(data: &[u8], format: image::ImageFormat) -> anyhow::Result<DecodedImage> {
    let buf = image::load_from_memory_with_format(data, format)?.to_rgb8();
    Ok(DecodedImage {
        res: Resolution::new(buf.width(), buf.height()),
        rgb: buf.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::{Rgb, RgbImage};

    use super::*;
    use crate::{color::Color, error::ErrorKind};

    fn sample_image() -> RgbImage {
        RgbImage::from_fn(8, 6, |x, y| {
            if x < 4 && y < 3 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        })
    }

    fn write_sample(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        sample_image().save(&path).unwrap();
        path
    }

    #[test]
    fn format_from_extension() {
        let fmt = |p: &str| ImageFormat::from_extension(Path::new(p)).ok();
        assert_eq!(fmt("a.png"), Some(ImageFormat::Png));
        assert_eq!(fmt("a.JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(fmt("dir/a.jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(fmt("a.bmp"), Some(ImageFormat::Bmp));
        assert_eq!(fmt("a.gif"), None);
        assert_eq!(fmt("png"), None);
    }

    #[test]
    fn decodes_lossless_formats_into_native_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["sample.png", "sample.bmp"] {
            let frame = decode(write_sample(dir.path(), name)).unwrap();
            assert_eq!(frame.resolution(), Resolution::new(8, 6), "{name}");
            assert_eq!(frame.channel_order(), ChannelOrder::NATIVE);
            assert_eq!(frame.pixel(0, 0), &[0, 0, 255], "{name}");
            assert_eq!(frame.color(0, 0), Color::RED);
            assert_eq!(frame.color(7, 5), Color::BLUE);
        }
    }

    #[test]
    fn decodes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let frame = decode(write_sample(dir.path(), "sample.jpg")).unwrap();
        assert_eq!(frame.resolution(), Resolution::new(8, 6));
        assert_eq!(frame.channel_count(), 3);
    }

    #[test]
    fn format_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = fs::read(write_sample(dir.path(), "sample.png")).unwrap();
        let jpg = fs::read(write_sample(dir.path(), "sample.jpg")).unwrap();

        let detect = |name: &str, data: &[u8]| ImageFormat::detect(Path::new(name), data).ok();
        assert_eq!(detect("photo.jpg", &png), Some(ImageFormat::Png));
        assert_eq!(detect("photo.png", &jpg), Some(ImageFormat::Jpeg));
        assert_eq!(detect("no_extension", &png), Some(ImageFormat::Png));
        // Unknown content falls back to the extension.
        assert_eq!(detect("photo.bmp", b"????"), Some(ImageFormat::Bmp));
        assert_eq!(detect("photo.gif", b"????"), None);
    }

    #[test]
    fn decodes_misnamed_files() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_sample(dir.path(), "sample.png");
        let misnamed = dir.path().join("photo.jpg");
        fs::copy(&png, &misnamed).unwrap();

        let frame = decode(&misnamed).unwrap();
        assert_eq!(frame.resolution(), Resolution::new(8, 6));
        assert_eq!(frame.color(0, 0), Color::RED);
        assert_eq!(frame.color(7, 5), Color::BLUE);

        let bmp = write_sample(dir.path(), "sample.bmp");
        let misnamed = dir.path().join("photo.png");
        fs::copy(&bmp, &misnamed).unwrap();
        assert_eq!(decode(&misnamed).unwrap().color(0, 0), Color::RED);
    }

    #[test]
    fn missing_file() {
        let err = decode("definitely/not/here.png").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        match err {
            Error::Decode { path, .. } => assert_eq!(path, Path::new("definitely/not/here.png")),
            _ => unreachable!(),
        }
    }

    #[test]
    fn empty_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();

        let empty = dir.path().join("empty.jpg");
        fs::write(&empty, b"").unwrap();
        assert_eq!(decode(&empty).unwrap_err().kind(), ErrorKind::Decode);

        let corrupt = dir.path().join("corrupt.png");
        fs::write(&corrupt, b"\x89PNG but not really").unwrap();
        assert_eq!(decode(&corrupt).unwrap_err().kind(), ErrorKind::Decode);
    }

    #[test]
    fn unsupported_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.tiff");
        fs::write(&path, b"II*\0").unwrap();
        assert_eq!(decode(&path).unwrap_err().kind(), ErrorKind::Decode);

        // Content wins over the extension, even when the content is unsupported.
        let path = dir.path().join("image.png");
        fs::write(&path, b"GIF89a").unwrap();
        assert_eq!(decode(&path).unwrap_err().kind(), ErrorKind::Decode);
    }
}
