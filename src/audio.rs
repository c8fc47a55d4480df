//! Best-effort audio capture.
//!
//! [`extract_audio`] pulls the audio track of a resource through a
//! decode → resample → encode → in-memory mux pipeline and returns the
//! encoded payload plus its MIME type. The operation never fails outwardly:
//! a missing audio stream, an unsupported encoder, a decode error, or an
//! empty payload all collapse to `None`. Audio is an enhancement for the
//! downstream generation call, never a requirement for the run to proceed.
//!
//! Internally every exit is a tagged [`AbsentReason`] so the cause is still
//! visible in the logs, even though the public contract only exposes
//! presence or absence.
//!
//! Capture is bounded by a wall-clock safety deadline of
//! `duration + safety_margin`; when it trips, the chunks collected so far
//! are finalized and returned instead of waiting on a stuck demuxer.

use std::{
    ffi::CString,
    fmt::{Display, Formatter, Result as FmtResult},
    time::{Duration, Instant},
};

use ffmpeg_next::{
    ChannelLayout, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    decoder::Audio as AudioDecoder,
    encoder::Audio as AudioEncoder,
    format::{Sample, sample::Type as SampleType},
    frame::Audio as AudioFrame,
    media::Type,
    packet::Mut,
    software::resampling::Context as ResamplingContext,
};
use ffmpeg_sys_next::{AVFormatContext, AVRational};
use thiserror::Error;

use crate::{config::AudioOptions, resource::MediaResource};

/// An encoded audio payload ready for transport to the generation boundary.
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    /// Encoded container bytes (chunks assembled in arrival order).
    pub payload: Vec<u8>,
    /// MIME type matching the selected [`AudioEncoding`].
    pub mime_type: &'static str,
}

impl EncodedAudio {
    /// Transport-safe rendition of the payload.
    pub fn to_base64(&self) -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(&self.payload)
    }
}

/// Candidate container/codec pairings, mirroring what recording surfaces
/// typically offer, in descending preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// Opus in WebM.
    OpusWebm,
    /// WebM with its default Vorbis codec.
    Webm,
    /// Opus in Ogg.
    OpusOgg,
    /// AAC in MP4.
    Mp4,
}

impl AudioEncoding {
    /// The default descending-preference probe order.
    pub const PREFERENCE: [AudioEncoding; 4] = [
        AudioEncoding::OpusWebm,
        AudioEncoding::Webm,
        AudioEncoding::OpusOgg,
        AudioEncoding::Mp4,
    ];

    /// FFmpeg muxer name for the container.
    fn container_name(self) -> &'static str {
        match self {
            AudioEncoding::OpusWebm | AudioEncoding::Webm => "webm",
            AudioEncoding::OpusOgg => "ogg",
            AudioEncoding::Mp4 => "mp4",
        }
    }

    /// FFmpeg codec ID for the encoder.
    fn codec_id(self) -> Id {
        match self {
            AudioEncoding::OpusWebm | AudioEncoding::OpusOgg => Id::OPUS,
            AudioEncoding::Webm => Id::VORBIS,
            AudioEncoding::Mp4 => Id::AAC,
        }
    }

    /// MIME type reported alongside the payload.
    pub fn mime_type(self) -> &'static str {
        match self {
            AudioEncoding::OpusWebm => "audio/webm;codecs=opus",
            AudioEncoding::Webm => "audio/webm",
            AudioEncoding::OpusOgg => "audio/ogg;codecs=opus",
            AudioEncoding::Mp4 => "audio/mp4",
        }
    }

    /// Conventional file extension for the container.
    pub fn file_extension(self) -> &'static str {
        match self {
            AudioEncoding::OpusWebm | AudioEncoding::Webm => "webm",
            AudioEncoding::OpusOgg => "ogg",
            AudioEncoding::Mp4 => "m4a",
        }
    }

    /// Sample rate to encode at. Opus only accepts a fixed rate family, so
    /// it is pinned to 48 kHz; other codecs keep the source rate.
    fn encoder_sample_rate(self, input_rate: u32) -> i32 {
        match self {
            AudioEncoding::OpusWebm | AudioEncoding::OpusOgg => 48_000,
            AudioEncoding::Webm | AudioEncoding::Mp4 => input_rate as i32,
        }
    }
}

impl Display for AudioEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.mime_type())
    }
}

/// Why a capture attempt resolved to `None`. Logged, never surfaced.
#[derive(Debug, Error)]
pub(crate) enum AbsentReason {
    #[error("resource has no audio stream")]
    NoAudioStream,
    #[error("no candidate encoding is supported by the linked FFmpeg build")]
    NoSupportedEncoding,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("capture produced an empty payload")]
    EmptyPayload,
}

/// Capture the resource's audio track as an encoded payload.
///
/// Selects the first encoding from `options.preferences` that the linked
/// FFmpeg build can encode and transcodes the full audio track into an
/// in-memory container. Every failure mode resolves to `None`; this
/// function neither errors nor panics for any input.
///
/// # Example
///
/// ```no_run
/// use docuflow::{AudioOptions, MediaResource, extract_audio};
///
/// let resource = MediaResource::open("recording.mp4")?;
/// match extract_audio(&resource, &AudioOptions::new()) {
///     Some(audio) => println!("{} bytes of {}", audio.payload.len(), audio.mime_type),
///     None => println!("no audio, proceeding without it"),
/// }
/// # Ok::<(), docuflow::PipelineError>(())
/// ```
pub fn extract_audio(resource: &MediaResource, options: &AudioOptions) -> Option<EncodedAudio> {
    match capture(resource, options) {
        Ok(audio) => {
            log::debug!(
                "captured {} bytes of {} from {}",
                audio.payload.len(),
                audio.mime_type,
                resource.path().display(),
            );
            Some(audio)
        }
        Err(reason) => {
            log::debug!(
                "audio capture resolved absent: {reason} ({})",
                resource.path().display(),
            );
            None
        }
    }
}

/// Try the preference list in order until one encoding captures the full
/// track. A codec may have an encoder registered yet still fail to open or
/// encode (FFmpeg's native Opus and Vorbis encoders are experimental and
/// refuse to open), so a capture failure moves on to the next candidate
/// instead of giving up.
fn capture(resource: &MediaResource, options: &AudioOptions) -> Result<EncodedAudio, AbsentReason> {
    let mut last_failure = AbsentReason::NoSupportedEncoding;

    for encoding in options
        .preferences
        .iter()
        .copied()
        .filter(|candidate| ffmpeg_next::encoder::find(candidate.codec_id()).is_some())
    {
        match capture_as(resource, options, encoding) {
            Ok(audio) => return Ok(audio),
            // A resource without an audio stream will not grow one for the
            // next candidate.
            Err(reason @ AbsentReason::NoAudioStream) => return Err(reason),
            Err(reason) => {
                log::debug!("capture as {encoding} failed: {reason}");
                last_failure = reason;
            }
        }
    }

    Err(last_failure)
}

fn capture_as(
    resource: &MediaResource,
    options: &AudioOptions,
    encoding: AudioEncoding,
) -> Result<EncodedAudio, AbsentReason> {
    let fail = |error: ffmpeg_next::Error| AbsentReason::CaptureFailed(error.to_string());

    let mut input = resource
        .demux()
        .map_err(|error| AbsentReason::CaptureFailed(error.to_string()))?;

    let (stream_index, parameters) = {
        let stream = input
            .streams()
            .best(Type::Audio)
            .ok_or(AbsentReason::NoAudioStream)?;
        (stream.index(), stream.parameters())
    };

    let decoder_context = CodecContext::from_parameters(parameters).map_err(fail)?;
    let mut decoder: AudioDecoder = decoder_context.decoder().audio().map_err(fail)?;

    let output_codec = ffmpeg_next::encoder::find(encoding.codec_id())
        .ok_or(AbsentReason::NoSupportedEncoding)?;
    let output_sample_format = output_codec
        .audio()
        .ok()
        .and_then(|audio_codec| audio_codec.formats())
        .and_then(|mut formats| formats.next())
        .unwrap_or(Sample::I16(SampleType::Packed));
    let output_sample_rate = encoding.encoder_sample_rate(decoder.rate());
    let output_channel_layout = decoder.channel_layout();

    let (mut encoder, encoder_time_base) = create_encoder(
        encoding,
        output_sample_format,
        output_sample_rate,
        output_channel_layout,
    )
    .map_err(AbsentReason::CaptureFailed)?;

    let mut muxer =
        MemoryMuxer::new(encoding.container_name()).map_err(AbsentReason::CaptureFailed)?;
    muxer
        .add_stream(&encoder, encoder_time_base)
        .map_err(AbsentReason::CaptureFailed)?;
    muxer.write_header().map_err(AbsentReason::CaptureFailed)?;

    let mut resampler = ResamplingContext::get(
        decoder.format(),
        decoder.channel_layout(),
        decoder.rate(),
        output_sample_format,
        output_channel_layout,
        output_sample_rate as u32,
    )
    .map_err(fail)?;

    // Bounds worst-case wait when the demuxer stalls or the container lies
    // about its length.
    let duration = resource.info().duration.max(0.0);
    let deadline = Instant::now() + Duration::from_secs_f64(duration) + options.safety_margin;

    // Fixed-frame codecs (Opus 960, AAC 1024, Vorbis) reject any other
    // sample count per frame, while the resampler yields whatever the
    // decoder produced, so samples are staged in a queue and re-chunked.
    let frame_size = (encoder.frame_size() as usize).max(1024);
    let mut queue = SampleQueue::new(
        output_sample_format,
        output_channel_layout,
        output_sample_rate as u32,
    );

    let mut decoded = AudioFrame::empty();
    let mut resampled = AudioFrame::empty();
    let mut encoded = Packet::empty();
    let mut samples_written: i64 = 0;

    let mut deadline_hit = false;
    for (stream, packet) in input.packets() {
        if Instant::now() >= deadline {
            deadline_hit = true;
            break;
        }
        if stream.index() != stream_index {
            continue;
        }

        decoder.send_packet(&packet).map_err(fail)?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            resampler.run(&decoded, &mut resampled).map_err(fail)?;
            queue.push(&resampled);
            encode_queued(
                &mut queue,
                &mut encoder,
                &mut encoded,
                &mut samples_written,
                encoder_time_base,
                &mut muxer,
                frame_size,
                false,
            )
            .map_err(AbsentReason::CaptureFailed)?;
        }
    }

    if deadline_hit {
        log::warn!(
            "audio capture hit the safety deadline ({duration:.1}s + {:?}); finalizing partial payload",
            options.safety_margin,
        );
    }

    // Drain decoder, resampler, and encoder so the final chunk is never
    // lost.
    let _ = decoder.send_eof();
    while decoder.receive_frame(&mut decoded).is_ok() {
        resampler.run(&decoded, &mut resampled).map_err(fail)?;
        queue.push(&resampled);
        encode_queued(
            &mut queue,
            &mut encoder,
            &mut encoded,
            &mut samples_written,
            encoder_time_base,
            &mut muxer,
            frame_size,
            false,
        )
        .map_err(AbsentReason::CaptureFailed)?;
    }

    // Rate conversion buffers samples inside the resampler.
    loop {
        let delay = resampler.flush(&mut resampled).map_err(fail)?;
        if resampled.samples() == 0 {
            break;
        }
        queue.push(&resampled);
        if delay.is_none() {
            break;
        }
    }

    encode_queued(
        &mut queue,
        &mut encoder,
        &mut encoded,
        &mut samples_written,
        encoder_time_base,
        &mut muxer,
        frame_size,
        true,
    )
    .map_err(AbsentReason::CaptureFailed)?;

    let _ = encoder.send_eof();
    while encoder.receive_packet(&mut encoded).is_ok() {
        muxer.write_encoded(&mut encoded, encoder_time_base);
    }

    let payload = muxer.finish();
    if payload.is_empty() {
        return Err(AbsentReason::EmptyPayload);
    }

    Ok(EncodedAudio {
        payload,
        mime_type: encoding.mime_type(),
    })
}

/// Create and open an audio encoder for the selected encoding.
fn create_encoder(
    encoding: AudioEncoding,
    sample_format: Sample,
    sample_rate: i32,
    channel_layout: ffmpeg_next::ChannelLayout,
) -> Result<(AudioEncoder, Rational), String> {
    let codec = ffmpeg_next::encoder::find(encoding.codec_id())
        .ok_or_else(|| format!("no encoder for {encoding}"))?;

    let mut context = CodecContext::new()
        .encoder()
        .audio()
        .map_err(|error| error.to_string())?;

    context.set_rate(sample_rate);
    context.set_channel_layout(channel_layout);
    context.set_format(sample_format);
    context.set_time_base(Rational(1, sample_rate));
    // All four candidates are lossy codecs.
    context.set_bit_rate(128_000);

    let encoder = context.open_as(codec).map_err(|error| error.to_string())?;
    Ok((encoder, Rational(1, sample_rate)))
}

/// Send full encoder-sized frames from the queue, writing each resulting
/// packet to the muxer in arrival order.
///
/// With `finalize` set, a trailing partial frame is zero-padded to the full
/// size and sent too, so no captured samples are lost at end of stream.
#[allow(clippy::too_many_arguments)]
fn encode_queued(
    queue: &mut SampleQueue,
    encoder: &mut AudioEncoder,
    encoded: &mut Packet,
    samples_written: &mut i64,
    encoder_time_base: Rational,
    muxer: &mut MemoryMuxer,
    frame_size: usize,
    finalize: bool,
) -> Result<(), String> {
    while queue.len() >= frame_size || (finalize && queue.len() > 0) {
        let mut chunk = queue.pop(frame_size);
        chunk.set_pts(Some(*samples_written));
        *samples_written += frame_size as i64;

        encoder
            .send_frame(&chunk)
            .map_err(|error| error.to_string())?;

        while encoder.receive_packet(encoded).is_ok() {
            muxer.write_encoded(encoded, encoder_time_base);
        }
    }

    Ok(())
}

/// Staging buffer between the resampler and the encoder.
///
/// Decoded audio arrives in whatever frame sizes the source codec used;
/// fixed-frame encoders demand exactly their own size. The queue holds raw
/// sample bytes per data plane and re-chunks them on the way out.
struct SampleQueue {
    planes: Vec<Vec<u8>>,
    /// Bytes one sample occupies within a single plane.
    stride: usize,
    format: Sample,
    channel_layout: ChannelLayout,
    sample_rate: u32,
}

impl SampleQueue {
    fn new(format: Sample, channel_layout: ChannelLayout, sample_rate: u32) -> Self {
        let channels = channel_layout.channels().max(1) as usize;
        let (plane_count, stride) = if format.is_planar() {
            (channels, format.bytes())
        } else {
            (1, format.bytes() * channels)
        };
        Self {
            planes: vec![Vec::new(); plane_count],
            stride,
            format,
            channel_layout,
            sample_rate,
        }
    }

    /// Queued sample count.
    fn len(&self) -> usize {
        self.planes[0].len() / self.stride
    }

    fn push(&mut self, frame: &AudioFrame) {
        let samples = frame.samples();
        if samples == 0 {
            return;
        }
        let bytes = samples * self.stride;
        for (index, plane) in self.planes.iter_mut().enumerate() {
            plane.extend_from_slice(&frame.data(index)[..bytes]);
        }
    }

    /// Pop one frame of exactly `samples` samples from the front of the
    /// queue. When fewer remain the tail is padded with zero bytes, which
    /// is silence in every candidate sample format; only the final frame of
    /// a capture is ever padded.
    fn pop(&mut self, samples: usize) -> AudioFrame {
        let mut frame = AudioFrame::new(self.format, samples, self.channel_layout);
        frame.set_rate(self.sample_rate);

        let wanted = samples * self.stride;
        for (index, plane) in self.planes.iter_mut().enumerate() {
            let available = plane.len().min(wanted);
            let data = frame.data_mut(index);
            data[..available].copy_from_slice(&plane[..available]);
            data[available..wanted].fill(0);
            plane.drain(..available);
        }

        frame
    }
}

/// In-memory muxer backed by FFmpeg's dynamic buffer I/O
/// (`avio_open_dyn_buf` / `avio_close_dyn_buf`), so encoded audio is
/// assembled without touching the filesystem.
///
/// The wrapper owns the raw `AVFormatContext`; `finish` extracts the buffer
/// and `Drop` covers every early-exit path, so the context and buffer are
/// released exactly once no matter where capture stops. The context's `pb`
/// pointer is nulled before `avformat_free_context` to keep FFmpeg from
/// closing the already-freed dynamic buffer.
struct MemoryMuxer {
    context: *mut AVFormatContext,
    stream_time_base: Rational,
    header_written: bool,
    finished: bool,
}

impl MemoryMuxer {
    fn new(container_name: &str) -> Result<Self, String> {
        let name = CString::new(container_name)
            .map_err(|error| format!("invalid container name: {error}"))?;

        unsafe {
            let mut context: *mut AVFormatContext = std::ptr::null_mut();
            let allocated = ffmpeg_sys_next::avformat_alloc_output_context2(
                &mut context,
                std::ptr::null_mut(),
                name.as_ptr(),
                std::ptr::null(),
            );
            if allocated < 0 || context.is_null() {
                return Err(format!("failed to allocate {container_name} muxer"));
            }

            if ffmpeg_sys_next::avio_open_dyn_buf(&mut (*context).pb) < 0 {
                ffmpeg_sys_next::avformat_free_context(context);
                return Err("failed to open dynamic output buffer".to_string());
            }

            Ok(Self {
                context,
                stream_time_base: Rational(1, 1),
                header_written: false,
                finished: false,
            })
        }
    }

    /// Add the single output audio stream, copying the encoder's parameters.
    fn add_stream(&mut self, encoder: &AudioEncoder, time_base: Rational) -> Result<(), String> {
        unsafe {
            let stream = ffmpeg_sys_next::avformat_new_stream(self.context, std::ptr::null());
            if stream.is_null() {
                return Err("failed to add output audio stream".to_string());
            }
            ffmpeg_sys_next::avcodec_parameters_from_context((*stream).codecpar, encoder.as_ptr());
            (*stream).time_base = AVRational {
                num: time_base.numerator(),
                den: time_base.denominator(),
            };
        }
        self.stream_time_base = time_base;
        Ok(())
    }

    /// Write the container header. The muxer may adjust the stream time
    /// base here (WebM pins it to milliseconds), so the effective value is
    /// read back for packet rescaling.
    fn write_header(&mut self) -> Result<(), String> {
        unsafe {
            if ffmpeg_sys_next::avformat_write_header(self.context, std::ptr::null_mut()) < 0 {
                return Err("failed to write container header".to_string());
            }
            let stream = *(*self.context).streams;
            if !stream.is_null() {
                let time_base = (*stream).time_base;
                if time_base.den != 0 {
                    self.stream_time_base = Rational(time_base.num, time_base.den);
                }
            }
        }
        self.header_written = true;
        Ok(())
    }

    /// Append one encoded packet, rescaled from the encoder's time base to
    /// the muxed stream's.
    fn write_encoded(&mut self, packet: &mut Packet, source_time_base: Rational) {
        packet.set_stream(0);
        packet.rescale_ts(source_time_base, self.stream_time_base);
        unsafe {
            ffmpeg_sys_next::av_interleaved_write_frame(self.context, packet.as_mut_ptr());
        }
    }

    /// Write the trailer and extract the assembled bytes.
    fn finish(mut self) -> Vec<u8> {
        unsafe {
            if self.header_written {
                ffmpeg_sys_next::av_write_trailer(self.context);
            }

            let mut buffer: *mut u8 = std::ptr::null_mut();
            let size = ffmpeg_sys_next::avio_close_dyn_buf((*self.context).pb, &mut buffer);
            let bytes = if size > 0 && !buffer.is_null() {
                std::slice::from_raw_parts(buffer, size as usize).to_vec()
            } else {
                Vec::new()
            };
            if !buffer.is_null() {
                ffmpeg_sys_next::av_free(buffer as *mut _);
            }

            (*self.context).pb = std::ptr::null_mut();
            ffmpeg_sys_next::avformat_free_context(self.context);
            self.finished = true;
            bytes
        }
    }
}

impl Drop for MemoryMuxer {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        unsafe {
            let mut buffer: *mut u8 = std::ptr::null_mut();
            ffmpeg_sys_next::avio_close_dyn_buf((*self.context).pb, &mut buffer);
            if !buffer.is_null() {
                ffmpeg_sys_next::av_free(buffer as *mut _);
            }
            (*self.context).pb = std::ptr::null_mut();
            ffmpeg_sys_next::avformat_free_context(self.context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed_i16_frame(samples: &[i16]) -> AudioFrame {
        let mut frame = AudioFrame::new(
            Sample::I16(SampleType::Packed),
            samples.len(),
            ChannelLayout::MONO,
        );
        frame.set_rate(48_000);
        for (index, sample) in samples.iter().enumerate() {
            let bytes = sample.to_ne_bytes();
            frame.data_mut(0)[index * 2..index * 2 + 2].copy_from_slice(&bytes);
        }
        frame
    }

    fn samples_of(frame: &AudioFrame) -> Vec<i16> {
        frame.data(0)[..frame.samples() * 2]
            .chunks_exact(2)
            .map(|pair| i16::from_ne_bytes([pair[0], pair[1]]))
            .collect()
    }

    #[test]
    fn queue_rechunks_across_push_boundaries() {
        let mut queue = SampleQueue::new(
            Sample::I16(SampleType::Packed),
            ChannelLayout::MONO,
            48_000,
        );

        queue.push(&packed_i16_frame(&[1, 2, 3]));
        queue.push(&packed_i16_frame(&[4, 5]));
        assert_eq!(queue.len(), 5);

        let chunk = queue.pop(4);
        assert_eq!(chunk.samples(), 4);
        assert_eq!(samples_of(&chunk), vec![1, 2, 3, 4]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn queue_pads_final_partial_chunk_with_silence() {
        let mut queue = SampleQueue::new(
            Sample::I16(SampleType::Packed),
            ChannelLayout::MONO,
            48_000,
        );

        queue.push(&packed_i16_frame(&[7, 8, 9]));
        let chunk = queue.pop(6);
        assert_eq!(chunk.samples(), 6);
        assert_eq!(samples_of(&chunk), vec![7, 8, 9, 0, 0, 0]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn queue_ignores_empty_frames() {
        let mut queue = SampleQueue::new(
            Sample::I16(SampleType::Packed),
            ChannelLayout::MONO,
            48_000,
        );

        queue.push(&AudioFrame::empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn queue_keeps_planar_planes_separate() {
        let mut queue = SampleQueue::new(
            Sample::F32(SampleType::Planar),
            ChannelLayout::STEREO,
            44_100,
        );

        let mut frame = AudioFrame::new(
            Sample::F32(SampleType::Planar),
            2,
            ChannelLayout::STEREO,
        );
        frame.set_rate(44_100);
        frame.data_mut(0)[..8].copy_from_slice(&[1.0_f32, 2.0]
            .iter()
            .flat_map(|value| value.to_ne_bytes())
            .collect::<Vec<u8>>());
        frame.data_mut(1)[..8].copy_from_slice(&[3.0_f32, 4.0]
            .iter()
            .flat_map(|value| value.to_ne_bytes())
            .collect::<Vec<u8>>());

        queue.push(&frame);
        assert_eq!(queue.len(), 2);

        let chunk = queue.pop(2);
        assert_eq!(chunk.samples(), 2);
        assert_eq!(&chunk.data(0)[..4], &1.0_f32.to_ne_bytes());
        assert_eq!(&chunk.data(1)[..4], &3.0_f32.to_ne_bytes());
    }
}
