//! The single-image processing pipeline.
//!
//! [`process`] runs a pose engine on a decoded frame and checks that it kept its end of the
//! contract. [`Pipeline`] strings decoding, processing, and display conversion together into the
//! one operation a UI needs: [`Pipeline::load_and_process`].

use std::path::Path;

use crate::{
    decode::decode,
    display::{to_display_buffer, DisplayBuffer, DISPLAY_REGION},
    engine::PoseEngine,
    error::{Error, Result},
    frame::{AnnotatedFrame, Frame},
    resolution::Resolution,
    timer::{Timer, Timers},
};

/// Runs `engine` on `frame` and validates the result.
///
/// The annotated frame has to have the same resolution, channel count, and channel order as
/// `frame`. If it does not, [`Error::PipelineContractViolation`] is returned and the result is
/// discarded. Errors returned by the engine are passed through unchanged.
pub fn process<E: PoseEngine + ?Sized>(frame: &Frame, engine: &E) -> Result<AnnotatedFrame> {
    let annotated = engine.annotate(frame)?;

    let (expected, actual) = (frame.geometry(), annotated.frame().geometry());
    let (expected_order, actual_order) = (frame.channel_order(), annotated.frame().channel_order());
    if expected != actual || expected_order != actual_order {
        let err = Error::PipelineContractViolation {
            expected,
            actual,
            expected_order,
            actual_order,
        };
        log::error!("{err}");
        return Err(err);
    }

    Ok(annotated)
}

/// Display buffers produced for one image.
#[derive(Debug, Clone)]
pub struct Processed {
    /// The image as it was loaded.
    pub original: DisplayBuffer,
    /// The image with pose annotations.
    pub annotated: DisplayBuffer,
}

/// Decodes, annotates, and converts images for display.
///
/// A pipeline owns (or borrows, since `&E` is a [`PoseEngine`] too) the engine it runs, which is
/// created once up front. Requests are processed one at a time; the pipeline does not support
/// concurrent use.
pub struct Pipeline<E> {
    engine: E,
    region: Resolution,
    timers: Timers<3>,
}

impl<E: PoseEngine> Pipeline<E> {
    /// Creates a pipeline that fits its output into [`DISPLAY_REGION`].
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            region: DISPLAY_REGION,
            timers: Timers([
                Timer::new("decode"),
                Timer::new("annotate"),
                Timer::new("display"),
            ]),
        }
    }

    /// Sets the size of the region both display buffers are fitted into.
    pub fn with_display_region(mut self, region: Resolution) -> Self {
        self.region = region;
        self
    }

    pub fn display_region(&self) -> Resolution {
        self.region
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Loads the image at `path`, annotates it, and converts both versions for display.
    ///
    /// Either both display buffers are returned, or none are: any failure along the way is
    /// returned as an [`Error`] and no partial output is produced.
    pub fn load_and_process<P: AsRef<Path>>(&mut self, path: P) -> Result<Processed> {
        let result = self.load_and_process_impl(path.as_ref());
        self.timers.log_and_reset();
        result
    }

    fn load_and_process_impl(&mut self, path: &Path) -> Result<Processed> {
        let [decode_t, annotate_t, display_t] = &mut self.timers.0;

        let frame = decode_t.time(|| decode(path))?;
        log::debug!("loaded '{}': {:?}", path.display(), frame);

        let engine = &self.engine;
        let annotated = annotate_t.time(|| process(&frame, engine))?;

        let region = self.region;
        let (original, annotated) = display_t.time(|| -> Result<_> {
            Ok((
                to_display_buffer(&frame, region)?,
                to_display_buffer(&annotated, region)?,
            ))
        })?;

        Ok(Processed {
            original,
            annotated,
        })
    }
}
