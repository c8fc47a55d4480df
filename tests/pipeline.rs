//! Full pipeline integration tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::{
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use docuflow::{
    EncodedAudio, GeneratedManual, ManualGenerator, MediaResource, NoOpProgress, OutlineGenerator,
    Pipeline, PipelineError, PipelineOptions, ProgressSink, SampledFrame, SamplerOptions,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn audio_only_path() -> &'static str {
    "tests/fixtures/audio_only.m4a"
}

struct Recording(Mutex<Vec<u8>>);

impl ProgressSink for Recording {
    fn on_progress(&self, percent: u8) {
        self.0.lock().expect("lock").push(percent);
    }
}

/// Generator that records how often it was invoked.
struct CountingGenerator(AtomicUsize);

impl ManualGenerator for CountingGenerator {
    fn generate(
        &self,
        frames: &[SampledFrame],
        audio: Option<&EncodedAudio>,
    ) -> Result<GeneratedManual, PipelineError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        OutlineGenerator.generate(frames, audio)
    }
}

/// Generator that always fails, for surfacing-error tests.
struct FailingGenerator;

impl ManualGenerator for FailingGenerator {
    fn generate(
        &self,
        _frames: &[SampledFrame],
        _audio: Option<&EncodedAudio>,
    ) -> Result<GeneratedManual, PipelineError> {
        Err(PipelineError::Generation("backend unavailable".to_string()))
    }
}

#[test]
fn run_produces_a_complete_bundle() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let bundle = Pipeline::default()
        .run(&resource, &OutlineGenerator, &NoOpProgress)
        .expect("run");

    assert!(!bundle.frames.is_empty());
    assert_eq!(bundle.manual.steps.len(), bundle.frames.len());
    // Every outline step must reference a frame that exists.
    for step in &bundle.manual.steps {
        assert!(step.frame_index < bundle.frames.len());
    }
}

#[test]
fn run_progress_is_monotonic_and_ends_at_100() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let recording = Recording(Mutex::new(Vec::new()));
    Pipeline::default()
        .run(&resource, &OutlineGenerator, &recording)
        .expect("run");

    let reports = recording.0.into_inner().expect("lock");
    assert!(!reports.is_empty());
    for pair in reports.windows(2) {
        assert!(pair[0] <= pair[1], "progress regressed: {reports:?}");
    }
    assert_eq!(*reports.last().expect("last"), 100);
}

#[test]
fn sampling_progress_stays_within_its_weight() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let options = PipelineOptions::new().with_sampling_weight(60);
    let recording = Recording(Mutex::new(Vec::new()));
    Pipeline::new(options)
        .run(&resource, &OutlineGenerator, &recording)
        .expect("run");

    let reports = recording.0.into_inner().expect("lock");
    // Everything except the terminal 100 comes from the sampling stage.
    for report in &reports[..reports.len() - 1] {
        assert!(*report <= 60, "sampling overshot its weight: {reports:?}");
    }
}

#[test]
fn no_frames_error_carries_the_upload_surface_message() {
    // The display string is shown verbatim to uploaders, so it is part of
    // the contract rather than a diagnostic.
    assert_eq!(
        PipelineError::NoFramesExtracted.to_string(),
        "動画からフレームを抽出できませんでした",
    );
}

#[test]
fn run_without_video_aborts_before_generation() {
    let path = audio_only_path();
    if !Path::new(path).exists() {
        return;
    }

    // An audio-only container opens fine but yields no frames; the run must
    // fail with the frames-mandatory error without ever invoking the
    // generator.
    let resource = MediaResource::open(path).expect("open");
    let generator = CountingGenerator(AtomicUsize::new(0));
    let error = Pipeline::default()
        .run(&resource, &generator, &NoOpProgress)
        .unwrap_err();

    assert!(matches!(error, PipelineError::NoFramesExtracted));
    assert_eq!(generator.0.load(Ordering::SeqCst), 0);
}

#[test]
fn generator_failure_surfaces_unchanged() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let error = Pipeline::default()
        .run(&resource, &FailingGenerator, &NoOpProgress)
        .unwrap_err();

    match error {
        PipelineError::Generation(message) => assert_eq!(message, "backend unavailable"),
        other => panic!("expected Generation, got {other:?}"),
    }
}

#[test]
fn invalid_sampler_options_fail_the_run() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let options =
        PipelineOptions::new().with_sampler(SamplerOptions::new().with_jpeg_quality(2.0));
    let error = Pipeline::new(options)
        .run(&resource, &OutlineGenerator, &NoOpProgress)
        .unwrap_err();
    assert!(matches!(error, PipelineError::InvalidOptions(_)));
}

#[test]
fn run_with_coarse_interval_samples_fewer_frames() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");

    let fine = Pipeline::default()
        .run(&resource, &OutlineGenerator, &NoOpProgress)
        .expect("fine run");
    let coarse = Pipeline::new(
        PipelineOptions::new().with_sampler(SamplerOptions::new().with_interval(5.0)),
    )
    .run(&resource, &OutlineGenerator, &NoOpProgress)
    .expect("coarse run");

    assert!(coarse.frames.len() < fine.frames.len());
}
