//! Timestamp and pixel-buffer conversion helpers shared by the pipelines.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};
use ffmpeg_sys_next::AV_TIME_BASE;

/// Convert a position in seconds to FFmpeg's global time base
/// (`AV_TIME_BASE` ticks), as expected by stream-agnostic seeking.
pub(crate) fn seconds_to_global_timestamp(seconds: f64) -> i64 {
    (seconds * AV_TIME_BASE as f64) as i64
}

/// Rescale a PTS value from a stream's time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Copy pixel data from a scaled RGB24 frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3); this
/// strips it so the result can feed a JPEG encoder directly.
pub(crate) fn packed_rgb_plane(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }
        buffer
    }
}
