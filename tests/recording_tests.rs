//! Recording workflow integration tests
//!
//! Run on a paused tokio clock so the timer paths complete instantly.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use phrase_recorder::application::ports::CaptureError;
use phrase_recorder::application::{
    AttemptCallbacks, AttemptInput, ConverterSettings, PhraseRecorder, PracticeAttemptUseCase,
    RawRecording, RecorderSession, RecorderSettings, RecordingCallbacks, StopCause, TimerSettings,
};
use phrase_recorder::domain::audio::AudioMimeType;
use phrase_recorder::domain::conversion::{ConversionProgress, StrategyKind};
use phrase_recorder::domain::error::ErrorKind;
use phrase_recorder::domain::recording::{DurationPolicy, DurationVerdict, RecordingState};
use phrase_recorder::infrastructure::DirectoryUploadSink;

use support::{FakeLoader, FakePlatform, FakeProbe, FakeSource, FakeTranscoder};

fn recorder(source: FakeSource) -> Arc<PhraseRecorder> {
    let session = RecorderSession::new(Arc::new(source), RecorderSettings::default());
    Arc::new(PhraseRecorder::new(
        DurationPolicy::builtin(),
        session,
        TimerSettings::default(),
    ))
}

#[tokio::test(start_paused = true)]
async fn item_one_stops_itself_at_six_seconds() {
    let source = FakeSource::new(6.0);
    let counters = Arc::clone(&source.counters);
    let recorder = recorder(source);

    let ticks = Arc::new(Mutex::new(Vec::new()));
    let stopped = Arc::new(AtomicUsize::new(0));
    let callbacks = {
        let ticks = Arc::clone(&ticks);
        let stopped = Arc::clone(&stopped);
        RecordingCallbacks {
            on_progress_tick: Some(Box::new(move |elapsed: f64| ticks.lock().push(elapsed))),
            on_stopped: Some(Box::new(move |_: &RawRecording| {
                stopped.fetch_add(1, Ordering::SeqCst);
            })),
            on_error: None,
        }
    };

    let take = recorder.start_recording(1, None, callbacks).await.unwrap();

    assert_eq!(take.timing.target_duration, 6.0);
    assert_eq!(take.timing.tolerance_ms, 500);
    assert_eq!(take.timing.min_duration, 5.5);
    assert_eq!(take.timing.max_duration, 6.5);
    assert_eq!(take.stop_cause, StopCause::TargetReached);
    assert_eq!(take.observed_seconds, 6.0);
    assert_eq!(take.corrected_seconds, 6.0);
    assert_eq!(take.verdict(), DurationVerdict::Acceptable);
    assert_eq!(take.message(), "Perfect! 0:06 (Target: 0:06)");
    assert_eq!(take.recording.blob.mime_type(), AudioMimeType::Flac);

    let ticks = ticks.lock();
    assert!(!ticks.is_empty());
    assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
    assert_eq!(counters.acquired(), 1);
    assert_eq!(counters.released(), 1);
    assert_eq!(recorder.session().state(), RecordingState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn short_capture_snaps_to_target() {
    let recorder = recorder(FakeSource::new(2.0));

    let take = recorder
        .start_recording(2, None, RecordingCallbacks::default())
        .await
        .unwrap();

    assert_eq!(take.observed_seconds, 2.0);
    assert_eq!(take.corrected_seconds, 8.0);
    assert_eq!(take.verdict(), DurationVerdict::TooShort);
    assert!(take.message().starts_with("Too short!"));
}

#[tokio::test(start_paused = true)]
async fn unknown_item_uses_fallback_target() {
    let recorder = recorder(FakeSource::new(3.0));

    let take = recorder
        .start_recording(99, Some(3.0), RecordingCallbacks::default())
        .await
        .unwrap();

    assert_eq!(take.timing.target_duration, 3.0);
    assert_eq!(take.timing.tolerance_ms, 500);
    assert_eq!(take.corrected_seconds, 3.0);
}

#[tokio::test(start_paused = true)]
async fn permission_denied_leaves_session_idle() {
    let source = FakeSource::failing(CaptureError::PermissionDenied("denied".to_string()));
    let counters = Arc::clone(&source.counters);
    let recorder = recorder(source);

    let reported = Arc::new(Mutex::new(Vec::new()));
    let callbacks = {
        let reported = Arc::clone(&reported);
        RecordingCallbacks {
            on_error: Some(Box::new(move |kind: ErrorKind, _message: &str| {
                reported.lock().push(kind);
            })),
            ..Default::default()
        }
    };

    let err = recorder
        .start_recording(1, None, callbacks)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(err.kind().message_key(), "capture.permission_denied");
    assert_eq!(*reported.lock(), vec![ErrorKind::PermissionDenied]);
    assert_eq!(recorder.session().state(), RecordingState::Idle);
    assert_eq!(counters.acquired(), 0);
    assert_eq!(counters.released(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_releases_device_without_a_take() {
    let source = FakeSource::new(8.0);
    let counters = Arc::clone(&source.counters);
    let recorder = recorder(source);

    let stopped = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let callbacks = {
        let stopped = Arc::clone(&stopped);
        let errors = Arc::clone(&errors);
        RecordingCallbacks {
            on_progress_tick: None,
            on_stopped: Some(Box::new(move |_: &RawRecording| {
                stopped.fetch_add(1, Ordering::SeqCst);
            })),
            on_error: Some(Box::new(move |_: ErrorKind, _: &str| {
                errors.fetch_add(1, Ordering::SeqCst);
            })),
        }
    };

    let running = Arc::clone(&recorder);
    let handle =
        tokio::spawn(async move { running.start_recording(4, None, callbacks).await });

    tokio::time::sleep(Duration::from_secs(2)).await;
    recorder.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_cancellation());
    assert_eq!(stopped.load(Ordering::SeqCst), 0);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(counters.released(), 1);
    assert!(recorder.session().last_recording().is_none());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_permission_prompt_releases_device_once() {
    let source = FakeSource::new(6.0).with_acquire_delay(Duration::from_secs(5));
    let counters = Arc::clone(&source.counters);
    let recorder = recorder(source);

    let running = Arc::clone(&recorder);
    let handle = tokio::spawn(async move {
        running
            .start_recording(1, None, RecordingCallbacks::default())
            .await
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(recorder.session().state(), RecordingState::Acquiring);
    assert_eq!(counters.acquired(), 0);
    recorder.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err, CaptureError::Cancelled);
    assert_eq!(counters.acquired(), 1);
    assert_eq!(counters.released(), 1);
    assert_eq!(recorder.session().state(), RecordingState::Stopped);
    assert!(recorder.session().last_recording().is_none());
}

#[tokio::test(start_paused = true)]
async fn oversized_fallback_records_default_length() {
    let recorder = recorder(FakeSource::new(6.0));
    let take = recorder
        .start_recording(99, Some(1e30), RecordingCallbacks::default())
        .await
        .unwrap();
    assert_eq!(take.timing.target_duration, 6.0);
    assert_eq!(take.stop_cause, StopCause::TargetReached);
}

#[tokio::test(start_paused = true)]
async fn recorder_can_record_again_after_a_take() {
    let source = FakeSource::new(6.0);
    let counters = Arc::clone(&source.counters);
    let recorder = recorder(source);

    for item in [1, 11] {
        let take = recorder
            .start_recording(item, None, RecordingCallbacks::default())
            .await
            .unwrap();
        assert_eq!(take.item_id, item);
    }

    assert_eq!(counters.acquired(), 2);
    assert_eq!(counters.released(), 2);
}

#[tokio::test(start_paused = true)]
async fn practice_attempt_records_converts_and_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeTranscoder::default());
    let loader = Arc::new(FakeLoader::new(Arc::clone(&engine)));
    let converter = support::converter(
        FakePlatform::capable(),
        Arc::clone(&loader),
        Arc::new(FakeProbe::returning(support::mono_44k(6.0))),
        false,
        ConverterSettings::default(),
    );
    let use_case = PracticeAttemptUseCase::new(
        recorder(FakeSource::new(6.0)),
        converter,
        Some(Arc::new(DirectoryUploadSink::new(dir.path()))),
    );

    let percents = Arc::new(Mutex::new(Vec::new()));
    let uploading = Arc::new(AtomicUsize::new(0));
    let callbacks = {
        let percents = Arc::clone(&percents);
        let uploading = Arc::clone(&uploading);
        AttemptCallbacks {
            on_conversion_progress: Some(Arc::new(move |p: ConversionProgress| {
                percents.lock().push(p.percent)
            })),
            on_uploading: Some(Box::new(move || {
                uploading.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        }
    };

    let output = use_case
        .execute(
            AttemptInput {
                item_id: 1,
                ..Default::default()
            },
            callbacks,
        )
        .await
        .unwrap();

    assert_eq!(output.take.corrected_seconds, 6.0);
    assert_eq!(output.conversion.strategy, StrategyKind::Transcoder);
    assert_eq!(output.conversion.metadata.bitrate_kbps, 128);
    assert_eq!(output.conversion.metadata.sample_rate, 44_100);
    assert_eq!(output.conversion.compressed.mime_type(), AudioMimeType::Mpeg);
    assert!(output.conversion.byte_size < output.take.recording.blob.size_bytes());

    let url = output.upload_url.unwrap();
    assert!(url.starts_with("file://"));
    assert!(url.ends_with(".mp3"));
    assert_eq!(uploading.load(Ordering::SeqCst), 1);

    let percents = percents.lock();
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(loader.loads(), 1);
    assert_eq!(engine.file_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn skip_upload_leaves_url_empty() {
    let dir = tempfile::tempdir().unwrap();
    let loader = Arc::new(FakeLoader::new(Arc::new(FakeTranscoder::default())));
    let converter = support::converter(
        FakePlatform::capable(),
        loader,
        Arc::new(FakeProbe::returning(support::mono_44k(6.0))),
        false,
        ConverterSettings::default(),
    );
    let use_case = PracticeAttemptUseCase::new(
        recorder(FakeSource::new(6.0)),
        converter,
        Some(Arc::new(DirectoryUploadSink::new(dir.path().join("takes")))),
    );

    let output = use_case
        .execute(
            AttemptInput {
                item_id: 1,
                skip_upload: true,
                ..Default::default()
            },
            AttemptCallbacks::default(),
        )
        .await
        .unwrap();

    assert!(output.upload_url.is_none());
    assert!(!dir.path().join("takes").exists());
}
