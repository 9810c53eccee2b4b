use std::env::{self, VarError};

use anyhow::{anyhow, bail};
use once_cell::sync::Lazy;

use crate::resolution::Resolution;

use super::DecodedImage;

/// Because computers, we support two different JPEG decoding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JpegBackend {
    /// Uses the `jpeg-decoder` crate through `image`, a robust pure-Rust JPEG decoder.
    JpegDecoder,
    /// Uses the `zune-jpeg` crate, a pure-Rust JPEG decoder somewhat faster than `jpeg-decoder`.
    ZuneJpeg,
}

const DEFAULT_BACKEND: JpegBackend = JpegBackend::JpegDecoder;

static JPEG_BACKEND: Lazy<JpegBackend> = Lazy::new(|| {
    let backend = match env::var("POSEVIEW_JPEG_BACKEND") {
        Ok(v) => parse_backend(&v).unwrap_or_else(|| {
            log::warn!(
                "invalid value set for `POSEVIEW_JPEG_BACKEND` variable: '{v}'; using {DEFAULT_BACKEND:?}"
            );
            DEFAULT_BACKEND
        }),
        Err(VarError::NotPresent) => DEFAULT_BACKEND,
        Err(VarError::NotUnicode(s)) => {
            log::warn!(
                "invalid value set for `POSEVIEW_JPEG_BACKEND` variable: {}; using {DEFAULT_BACKEND:?}",
                s.to_string_lossy()
            );
            DEFAULT_BACKEND
        }
    };
    log::debug!("using JPEG decode backend: {:?}", backend);
    backend
});

fn parse_backend(name: &str) -> Option<JpegBackend> {
    match name {
        "jpeg-decoder" => Some(JpegBackend::JpegDecoder),
        "zune-jpeg" => Some(JpegBackend::ZuneJpeg),
        _ => None,
    }
}

pub(super) fn decode_jpeg(data: &[u8]) -> anyhow::Result<DecodedImage> {
    decode_with(*JPEG_BACKEND, data)
}

fn decode_with(backend: JpegBackend, data: &[u8]) -> anyhow::Result<DecodedImage> {
    match backend {
        JpegBackend::JpegDecoder => {
            let buf =
                image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?.to_rgb8();
            Ok(DecodedImage {
                res: Resolution::new(buf.width(), buf.height()),
                rgb: buf.into_raw(),
            })
        }
        JpegBackend::ZuneJpeg => {
            use zune_jpeg::zune_core::colorspace::ColorSpace;
            use zune_jpeg::zune_core::options::DecoderOptions;

            let mut decomp = zune_jpeg::JpegDecoder::new_with_options(
                DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB),
                data,
            );
            decomp.decode_headers()?;
            let colorspace = decomp
                .get_output_colorspace()
                .ok_or_else(|| anyhow!("JPEG headers did not specify a colorspace"))?;
            // Grayscale images are not converted to the requested RGB output.
            if colorspace != ColorSpace::RGB && colorspace != ColorSpace::Luma {
                bail!("unsupported colorspace {colorspace:?} (expected RGB or Luma)");
            }

            let size = decomp
                .output_buffer_size()
                .ok_or_else(|| anyhow!("JPEG headers did not specify an image size"))?;
            let mut pixels = vec![0; size];
            decomp.decode_into(&mut pixels)?;
            let (width, height) = decomp
                .dimensions()
                .ok_or_else(|| anyhow!("JPEG headers did not specify an image size"))?;
            let rgb = if colorspace == ColorSpace::Luma {
                pixels.iter().flat_map(|&l| [l; 3]).collect()
            } else {
                pixels
            };
            Ok(DecodedImage {
                res: Resolution::new(u32::from(width), u32::from(height)),
                rgb,
            })
        }
    }
}
