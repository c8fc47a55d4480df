//! Frame sampling integration tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.
//! The fixture is a 10 s 1280x720 recording with an audio track.

use std::{
    path::Path,
    sync::Mutex,
};

use docuflow::{
    CancellationToken, MediaResource, NoOpProgress, PipelineError, ProgressSink, SamplerOptions,
    plan_offsets, sample, scaled_dimensions,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

struct Recording(Mutex<Vec<u8>>);

impl ProgressSink for Recording {
    fn on_progress(&self, percent: u8) {
        self.0.lock().expect("lock").push(percent);
    }
}

// ── plan_offsets ─────────────────────────────────────────────────

#[test]
fn plan_includes_zero_and_duration_multiple() {
    assert_eq!(plan_offsets(10.0, 2.5), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
}

#[test]
fn plan_stops_before_duration_when_not_a_multiple() {
    assert_eq!(plan_offsets(9.9, 2.5), vec![0.0, 2.5, 5.0, 7.5]);
}

#[test]
fn plan_for_short_resource_is_just_zero() {
    // Interval longer than the resource still captures the t=0 frame.
    assert_eq!(plan_offsets(1.0, 2.5), vec![0.0]);
}

#[test]
fn plan_count_is_floor_ratio_plus_one() {
    for (duration, interval) in [(10.0_f64, 2.5), (60.0, 2.5), (7.0, 3.0), (0.5, 2.5)] {
        let expected = (duration / interval).floor() as usize + 1;
        assert_eq!(plan_offsets(duration, interval).len(), expected);
    }
}

#[test]
fn plan_is_empty_for_degenerate_inputs() {
    assert!(plan_offsets(0.0, 2.5).is_empty());
    assert!(plan_offsets(-5.0, 2.5).is_empty());
    assert!(plan_offsets(f64::NAN, 2.5).is_empty());
    assert!(plan_offsets(10.0, 0.0).is_empty());
}

// ── scaled_dimensions ────────────────────────────────────────────

#[test]
fn dimensions_downscale_to_height_cap() {
    assert_eq!(scaled_dimensions(1920, 1080, 720), (1280, 720));
    assert_eq!(scaled_dimensions(3840, 2160, 720), (1280, 720));
}

#[test]
fn dimensions_never_upscale() {
    assert_eq!(scaled_dimensions(640, 360, 720), (640, 360));
    assert_eq!(scaled_dimensions(1280, 720, 720), (1280, 720));
}

#[test]
fn dimensions_preserve_aspect_ratio_for_portrait() {
    let (width, height) = scaled_dimensions(1080, 1920, 720);
    assert_eq!(height, 720);
    assert_eq!(width, 405);
}

#[test]
fn dimensions_floor_at_one_pixel() {
    let (width, height) = scaled_dimensions(1, 4000, 720);
    assert_eq!(width, 1);
    assert!(height >= 1);
}

// ── sample ───────────────────────────────────────────────────────

#[test]
fn sample_yields_one_frame_per_planned_offset() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let duration = resource.info().duration;
    let options = SamplerOptions::new();

    let frames = sample(&resource, &options, &NoOpProgress).expect("sample");
    assert_eq!(frames.len(), plan_offsets(duration, options.interval).len());
}

#[test]
fn sample_frames_are_ordered_and_indexed() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let frames = sample(&resource, &SamplerOptions::new(), &NoOpProgress).expect("sample");

    for (position, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index, position);
        assert!(!frame.image.is_empty());
        // JPEG SOI marker.
        assert_eq!(&frame.image[..2], &[0xFF, 0xD8]);
    }
    for pair in frames.windows(2) {
        assert!(pair[0].time < pair[1].time);
    }
}

#[test]
fn sample_respects_height_cap() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let options = SamplerOptions::new().with_max_height(360);
    let frames = sample(&resource, &options, &NoOpProgress).expect("sample");

    let decoded = image::load_from_memory(&frames[0].image).expect("decode jpeg");
    assert!(decoded.height() <= 360);
}

#[test]
fn sample_progress_is_monotonic_and_ends_at_100() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let recording = Recording(Mutex::new(Vec::new()));
    sample(&resource, &SamplerOptions::new(), &recording).expect("sample");

    let reports = recording.0.into_inner().expect("lock");
    assert!(!reports.is_empty());
    for pair in reports.windows(2) {
        assert!(pair[0] <= pair[1], "progress regressed: {reports:?}");
    }
    assert_eq!(*reports.last().expect("last"), 100);
}

#[test]
fn sample_twice_is_identical() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let options = SamplerOptions::new().with_interval(5.0);

    let first = sample(&resource, &options, &NoOpProgress).expect("first run");
    let second = sample(&resource, &options, &NoOpProgress).expect("second run");

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.time, b.time);
        assert_eq!(a.image, b.image);
    }
}

#[test]
fn sample_rejects_invalid_interval_before_decoding() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let options = SamplerOptions::new().with_interval(-1.0);
    let error = sample(&resource, &options, &NoOpProgress).unwrap_err();
    assert!(matches!(error, PipelineError::InvalidOptions(_)));
}

#[test]
fn cancelled_before_start_returns_cancelled() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let token = CancellationToken::new();
    token.cancel();

    let resource = MediaResource::open(path).expect("open");
    let options = SamplerOptions::new().with_cancellation(token);
    let error = sample(&resource, &options, &NoOpProgress).unwrap_err();
    assert!(matches!(error, PipelineError::Cancelled));
}

#[test]
fn open_missing_file_is_resource_error() {
    let error = MediaResource::open("tests/fixtures/does_not_exist.mp4").unwrap_err();
    assert!(matches!(error, PipelineError::Resource { .. }));
}

#[test]
fn open_garbage_file_is_resource_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.mp4");
    std::fs::write(&path, b"this is not a media file").expect("write");

    let error = MediaResource::open(&path).unwrap_err();
    assert!(matches!(error, PipelineError::Resource { .. }));
}
