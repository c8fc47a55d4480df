//! Audio capture integration tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.
//! `sample_video.mp4` carries an audio track; `silent_video.mp4` has none.

use std::{path::Path, time::Duration};

use docuflow::{AudioEncoding, AudioOptions, MediaResource, extract_audio};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn silent_video_path() -> &'static str {
    "tests/fixtures/silent_video.mp4"
}

#[test]
fn capture_from_resource_with_audio() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    // The preference list falls back through candidates, and every FFmpeg
    // build ships a native AAC encoder, so an audio-bearing input must
    // resolve to a payload rather than None.
    let resource = MediaResource::open(path).expect("open");
    let audio = extract_audio(&resource, &AudioOptions::new())
        .expect("audio-bearing input yields a payload");

    assert!(!audio.payload.is_empty());
    assert!(
        AudioEncoding::PREFERENCE
            .iter()
            .any(|encoding| encoding.mime_type() == audio.mime_type),
        "unexpected mime type {}",
        audio.mime_type
    );
}

#[test]
fn capture_from_silent_resource_is_none() {
    let path = silent_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    assert!(extract_audio(&resource, &AudioOptions::new()).is_none());
}

#[test]
fn capture_with_empty_preferences_is_none() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let options = AudioOptions::new().with_preferences(Vec::new());
    assert!(extract_audio(&resource, &options).is_none());
}

#[test]
fn capture_never_panics_on_tight_deadline() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    // A zero safety margin is the tightest deadline callers can request;
    // the call must still resolve to Some or None, never panic or error.
    let resource = MediaResource::open(path).expect("open");
    let options = AudioOptions::new().with_safety_margin(Duration::ZERO);
    let _ = extract_audio(&resource, &options);
}

#[test]
fn capture_twice_is_consistent() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let resource = MediaResource::open(path).expect("open");
    let first = extract_audio(&resource, &AudioOptions::new());
    let second = extract_audio(&resource, &AudioOptions::new());

    assert_eq!(first.is_some(), second.is_some());
    if let (Some(first), Some(second)) = (first, second) {
        assert_eq!(first.mime_type, second.mime_type);
    }
}
