//! Frame sampling.
//!
//! The sampler walks a video resource at fixed time offsets `0, I, 2I, …`
//! up to and including the duration, and rasterizes each offset into a
//! bounded-resolution JPEG still. The walk is strictly sequential: one
//! seek/decode/capture cycle completes before the next seek is issued, so
//! frame ordering needs no synchronization and the decode context never
//! sees overlapping seeks.
//!
//! Fixed-interval sampling may miss very short-lived UI states, but it keeps
//! the output deterministic and bounds the frame count at `D / I`, which in
//! turn bounds the downstream payload and model-context cost.

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::Pixel,
    format::context::Input,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{ExtendedColorType, codecs::jpeg::JpegEncoder};

use crate::{
    config::SamplerOptions,
    conversion::{packed_rgb_plane, pts_to_seconds, seconds_to_global_timestamp},
    error::PipelineError,
    progress::{ProgressReporter, ProgressSink, percent_of},
    resource::MediaResource,
};

/// MIME type of every sampled frame image.
pub const FRAME_MIME_TYPE: &str = "image/jpeg";

/// Seeks never land bit-exactly on the requested PTS; frames this close to
/// the target count as "at" it.
const SEEK_TOLERANCE_SECONDS: f64 = 0.001;

/// One rasterized still captured at a fixed offset.
///
/// `index` equals emission order, starting at 0; `time` is
/// `index * interval` clamped to the resource duration. Frames are immutable
/// once produced and are referenced (not owned) by manual steps via their
/// index.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Capture offset in seconds from the start of the resource.
    pub time: f64,
    /// Emission order, monotonically increasing from 0.
    pub index: usize,
    /// Encoded JPEG bytes.
    pub image: Vec<u8>,
}

impl SampledFrame {
    /// Transport-safe rendition of the image for the generation boundary.
    pub fn to_base64(&self) -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(&self.image)
    }
}

/// Compute the capture offsets for a resource of `duration` seconds sampled
/// every `interval` seconds: `0, I, 2I, … ≤ duration`.
///
/// Returns an empty plan for non-positive or non-finite inputs; callers
/// reject those before planning.
///
/// # Example
///
/// ```
/// let offsets = docuflow::plan_offsets(10.0, 2.5);
/// assert_eq!(offsets, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
/// ```
pub fn plan_offsets(duration: f64, interval: f64) -> Vec<f64> {
    if !duration.is_finite() || duration <= 0.0 || !interval.is_finite() || interval <= 0.0 {
        return Vec::new();
    }
    let mut offsets = Vec::new();
    for step in 0.. {
        let offset = step as f64 * interval;
        if offset > duration {
            break;
        }
        offsets.push(offset);
    }
    offsets
}

/// Resolve output dimensions so that height ≤ `max_height` with the source
/// aspect ratio preserved. Frames are never upscaled
/// (`scale = min(1, max_height / native_height)`).
///
/// # Example
///
/// ```
/// assert_eq!(docuflow::scaled_dimensions(1920, 1080, 720), (1280, 720));
/// assert_eq!(docuflow::scaled_dimensions(640, 480, 720), (640, 480));
/// ```
pub fn scaled_dimensions(width: u32, height: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let scale = (f64::from(max_height) / f64::from(height)).min(1.0);
    let out_width = (f64::from(width) * scale).round().max(1.0) as u32;
    let out_height = (f64::from(height) * scale).round().max(1.0) as u32;
    (out_width, out_height)
}

/// Sample a resource into an ordered sequence of JPEG stills.
///
/// Walks offsets `0, interval, 2·interval, …` while they do not exceed the
/// resource duration. For each offset the demuxer seeks, the decoder runs
/// forward to the first frame at or after the target, and the frame is
/// downscaled and JPEG-encoded. After every settled seek the sink receives
/// `round(100 · t / duration)`, non-decreasing; the final report on success
/// is 100.
///
/// A truly static resource still yields the frame at `t = 0`.
///
/// # Errors
///
/// - [`PipelineError::InvalidOptions`] for out-of-range tunables.
/// - [`PipelineError::NoVideoStream`] if the resource has no video.
/// - [`PipelineError::MediaDecode`] if the duration is unusable or any
///   seek/decode cycle fails. All-or-nothing: no partial frames are
///   returned.
/// - [`PipelineError::Cancelled`] if the options carry a cancelled token.
///
/// # Example
///
/// ```no_run
/// use docuflow::{MediaResource, NoOpProgress, SamplerOptions, sample};
///
/// let resource = MediaResource::open("recording.mp4")?;
/// let frames = sample(&resource, &SamplerOptions::new(), &NoOpProgress)?;
/// println!("captured {} frames", frames.len());
/// # Ok::<(), docuflow::PipelineError>(())
/// ```
pub fn sample(
    resource: &MediaResource,
    options: &SamplerOptions,
    progress: &dyn ProgressSink,
) -> Result<Vec<SampledFrame>, PipelineError> {
    options.validate()?;

    let duration = resource.info().duration;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(PipelineError::MediaDecode(format!(
            "resource duration is unusable ({duration} s)"
        )));
    }

    let mut input = resource.demux()?;

    let (stream_index, time_base, parameters) = {
        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(PipelineError::NoVideoStream)?;
        (stream.index(), stream.time_base(), stream.parameters())
    };

    let decoder_context = CodecContext::from_parameters(parameters)?;
    let mut decoder = decoder_context.decoder().video()?;

    let native_width = decoder.width();
    let native_height = decoder.height();
    if native_width == 0 || native_height == 0 {
        return Err(PipelineError::MediaDecode(
            "video stream reports zero dimensions".to_string(),
        ));
    }

    let (output_width, output_height) =
        scaled_dimensions(native_width, native_height, options.max_height);
    let mut scaler = ScalingContext::get(
        decoder.format(),
        native_width,
        native_height,
        Pixel::RGB24,
        output_width,
        output_height,
        ScalingFlags::BILINEAR,
    )?;

    let jpeg_quality = (options.jpeg_quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let offsets = plan_offsets(duration, options.interval);
    let mut frames = Vec::with_capacity(offsets.len());
    let mut reporter = ProgressReporter::new(progress);

    log::debug!(
        "sampling {} offsets from {} ({}x{} -> {}x{})",
        offsets.len(),
        resource.path().display(),
        native_width,
        native_height,
        output_width,
        output_height,
    );

    for (index, &target) in offsets.iter().enumerate() {
        if options.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let timestamp = seconds_to_global_timestamp(target);
        input.seek(timestamp, ..timestamp)?;
        decoder.flush();

        let image = capture_at(
            &mut input,
            &mut decoder,
            &mut scaler,
            stream_index,
            time_base,
            target,
            output_width,
            output_height,
            jpeg_quality,
        )?;

        frames.push(SampledFrame {
            time: target,
            index,
            image,
        });
        reporter.report(percent_of(target, duration));
    }

    reporter.finish();
    Ok(frames)
}

/// Decode forward from the current (post-seek) position to the first frame
/// at or after `target` seconds and encode it.
///
/// Containers routinely report a duration slightly past the last frame's
/// PTS, so when the stream ends before the target is reached the last frame
/// the decoder yielded stands in for it, the same clamping a playback
/// surface applies.
#[allow(clippy::too_many_arguments)]
fn capture_at(
    input: &mut Input,
    decoder: &mut ffmpeg_next::decoder::Video,
    scaler: &mut ScalingContext,
    stream_index: usize,
    time_base: ffmpeg_next::Rational,
    target: f64,
    output_width: u32,
    output_height: u32,
    jpeg_quality: u8,
) -> Result<Vec<u8>, PipelineError> {
    let mut decoded = VideoFrame::empty();
    let mut rgb = VideoFrame::empty();
    // receive_frame unrefs its argument before filling it, so the fallback
    // frame has to be an owned copy.
    let mut last_before_target: Option<VideoFrame> = None;

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }

        decoder.send_packet(&packet)?;

        while decoder.receive_frame(&mut decoded).is_ok() {
            let seconds = pts_to_seconds(decoded.pts().unwrap_or(0), time_base);
            if seconds + SEEK_TOLERANCE_SECONDS >= target {
                return encode_jpeg(
                    scaler,
                    &decoded,
                    &mut rgb,
                    output_width,
                    output_height,
                    jpeg_quality,
                );
            }
            last_before_target = Some(decoded.clone());
        }
    }

    // Stream exhausted before the target: drain the decoder and fall back to
    // the last frame it produced.
    let _ = decoder.send_eof();
    while decoder.receive_frame(&mut decoded).is_ok() {
        let seconds = pts_to_seconds(decoded.pts().unwrap_or(0), time_base);
        if seconds + SEEK_TOLERANCE_SECONDS >= target {
            return encode_jpeg(
                scaler,
                &decoded,
                &mut rgb,
                output_width,
                output_height,
                jpeg_quality,
            );
        }
        last_before_target = Some(decoded.clone());
    }

    match last_before_target {
        Some(frame) => encode_jpeg(
            scaler,
            &frame,
            &mut rgb,
            output_width,
            output_height,
            jpeg_quality,
        ),
        None => Err(PipelineError::MediaDecode(format!(
            "no frame could be decoded at offset {target:.3} s"
        ))),
    }
}

/// Scale a decoded frame to the output resolution and encode it as JPEG.
fn encode_jpeg(
    scaler: &mut ScalingContext,
    decoded: &VideoFrame,
    rgb: &mut VideoFrame,
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, PipelineError> {
    scaler.run(decoded, rgb)?;
    let pixels = packed_rgb_plane(rgb, width, height);

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.encode(&pixels, width, height, ExtendedColorType::Rgb8)?;
    Ok(bytes)
}
