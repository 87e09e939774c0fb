//! Command runners: wire the adapters into the use cases

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::debug;

use crate::application::ports::{ConfigStore, NativeCodec, UploadSink};
use crate::application::{
    AttemptCallbacks, AttemptInput, AvailabilityGate, ConverterSettings, FormatConverter,
    NativeStrategy, PhraseRecorder, PracticeAttemptUseCase, RecorderSession, RecorderSettings,
    RawRecording, RecordingCallbacks, SharedTranscoder, TimerSettings, TranscoderStrategy,
};
use crate::domain::audio::{AudioBlob, AudioMimeType};
use crate::domain::config::AppConfig;
use crate::domain::conversion::ConversionProgress;
use crate::domain::error::{ConfigError, ErrorKind};
use crate::domain::recording::{format_clock, DurationVerdict};
use crate::infrastructure::{
    CpalAudioSource, DirectoryUploadSink, FfmpegLoader, HostPlatform, HttpUploadSink,
    SymphoniaCodec, SymphoniaProbe, XdgConfigStore,
};

use super::args::{ConvertArgs, RecordArgs};
use super::presenter::{format_progress, reveal, Presenter};
use super::signals::InterruptListener;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;
/// Recording aborted with Ctrl-C
pub const EXIT_CANCELLED: u8 = 130;

/// Environment override for the transcoder executable
pub const ENV_FFMPEG: &str = "PHRASE_RECORDER_FFMPEG";
/// Environment override for the upload endpoint
pub const ENV_UPLOAD_URL: &str = "PHRASE_RECORDER_UPLOAD_URL";

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> Result<AppConfig, ConfigError> {
    let store = XdgConfigStore::new();
    let file_config = store.load().await?;

    let env_config = AppConfig {
        ffmpeg_path: env::var(ENV_FFMPEG).ok().filter(|s| !s.is_empty()),
        upload_url: env::var(ENV_UPLOAD_URL).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    Ok(AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config))
}

/// Gate and converter sharing one lazily loaded transcoder
pub fn build_converter(config: &AppConfig) -> Arc<FormatConverter> {
    let engine = Arc::new(SharedTranscoder::new(Arc::new(FfmpegLoader::new(
        config.ffmpeg_path_or_default(),
    ))));
    let codec: Arc<dyn NativeCodec> = Arc::new(SymphoniaCodec::new());

    let gate = Arc::new(AvailabilityGate::new(
        Arc::new(HostPlatform::new()),
        Arc::clone(&engine),
        Some(Arc::clone(&codec)),
        config.native_fallback_or_default(),
    ));

    Arc::new(FormatConverter::new(
        gate,
        TranscoderStrategy::new(engine),
        Some(NativeStrategy::new(codec)),
        Arc::new(SymphoniaProbe::new()),
        ConverterSettings::from(config),
    ))
}

/// Upload sink from config: HTTP endpoint first, then a local directory
pub fn build_upload_sink(config: &AppConfig) -> Result<Option<Arc<dyn UploadSink>>, String> {
    if let Some(url) = config.upload_url() {
        let sink = HttpUploadSink::new(url).map_err(|e| e.to_string())?;
        return Ok(Some(Arc::new(sink)));
    }
    Ok(config
        .output_dir
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(|dir| Arc::new(DirectoryUploadSink::new(dir)) as Arc<dyn UploadSink>))
}

/// Record one practice item, compress it and deliver the result
pub async fn run_record(args: RecordArgs, config: AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    let policy = match config.duration_policy() {
        Ok(policy) => policy,
        Err(e) => {
            presenter.error(&format!("Invalid item table: {}", e));
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };
    let options = config.conversion_options();
    if let Err(e) = options.validate() {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_USAGE_ERROR);
    }
    let uploader = match build_upload_sink(&config) {
        Ok(sink) => sink,
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let timing = policy.compute_timing(args.item, args.fallback);
    let session = RecorderSession::new(
        Arc::new(CpalAudioSource::new()),
        RecorderSettings {
            timeslice: config.timeslice_or_default(),
            ..Default::default()
        },
    );
    let recorder = Arc::new(PhraseRecorder::new(
        policy,
        session,
        TimerSettings::from(&config),
    ));

    // Ctrl-C aborts the recording without producing a take
    let cancel_handle = Arc::clone(&recorder);
    let interrupt = match InterruptListener::spawn(move || cancel_handle.cancel()) {
        Ok(listener) => listener,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let use_case = PracticeAttemptUseCase::new(recorder, build_converter(&config), uploader);

    presenter.info(&format!(
        "Item {}: speak for {} (±{} ms)",
        args.item,
        format_clock(timing.target_duration),
        timing.tolerance_ms
    ));

    let spinner = presenter.recording_spinner(timing.target_duration);
    let conversion_bar = presenter.conversion_bar();
    let callbacks = {
        let tick_spinner = spinner.clone();
        let stop_spinner = spinner.clone();
        let error_spinner = spinner.clone();
        let target = timing.target_duration;
        let reveal_bar = conversion_bar.clone();
        let progress_bar = conversion_bar.clone();
        AttemptCallbacks {
            recording: RecordingCallbacks {
                on_progress_tick: Some(Box::new(move |elapsed: f64| {
                    tick_spinner.set_message(format!(
                        "Recording... {}",
                        format_progress(elapsed, target)
                    ));
                })),
                on_stopped: Some(Box::new(move |recording: &RawRecording| {
                    stop_spinner.finish_and_clear();
                    debug!(
                        chunks = recording.chunk_count,
                        bytes = recording.blob.size_bytes(),
                        "raw recording finalized"
                    );
                })),
                on_error: Some(Box::new(move |_kind: ErrorKind, _message: &str| {
                    error_spinner.finish_and_clear();
                })),
            },
            on_converting: Some(Box::new(move || reveal(&reveal_bar))),
            on_conversion_progress: Some(Arc::new(move |progress: ConversionProgress| {
                progress_bar.set_position(progress.percent as u64);
            })),
            on_uploading: None,
        }
    };

    let input = AttemptInput {
        item_id: args.item,
        fallback_seconds: args.fallback,
        options,
        skip_upload: args.no_upload,
    };

    let outcome = use_case.execute(input, callbacks).await;
    let interrupted = interrupt.fired();
    drop(interrupt);
    spinner.finish_and_clear();
    conversion_bar.finish_and_clear();

    let output = match outcome {
        Ok(output) => output,
        Err(e) if interrupted || e.is_cancellation() => {
            presenter.warn("Recording cancelled");
            return ExitCode::from(EXIT_CANCELLED);
        }
        Err(e) => {
            match e.kind() {
                Some(kind) => presenter.error_kind(kind, &e.to_string()),
                None => presenter.error(&e.to_string()),
            }
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let take = &output.take;
    match take.verdict() {
        DurationVerdict::Acceptable => presenter.success(&take.message()),
        _ => presenter.warn(&take.message()),
    }
    presenter.conversion_summary(&output.conversion, take.recording.blob.size_bytes());

    if let Some(url) = output.upload_url {
        presenter.output(&url);
    }

    let blob = &output.conversion.compressed;
    let destination = match (&args.output, needs_local_copy(&config, args.no_upload)) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(format!(
            "item-{}.{}",
            args.item,
            blob.mime_type().extension()
        ))),
        (None, false) => None,
    };
    if let Some(path) = destination {
        if let Err(e) = tokio::fs::write(&path, blob.data()).await {
            presenter.error(&format!("Failed to write {}: {}", path.display(), e));
            return ExitCode::from(EXIT_ERROR);
        }
        presenter.output(&path.display().to_string());
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Whether a finished take would otherwise be dropped
fn needs_local_copy(config: &AppConfig, no_upload: bool) -> bool {
    let has_dir = config.output_dir.as_deref().is_some_and(|d| !d.is_empty());
    no_upload || (config.upload_url().is_none() && !has_dir)
}

/// Compress an existing audio file
pub async fn run_convert(args: ConvertArgs, config: AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    let Some(mime_type) = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .and_then(AudioMimeType::from_extension)
    else {
        presenter.error(&format!(
            "Unrecognized audio file type: {}",
            args.input.display()
        ));
        return ExitCode::from(EXIT_USAGE_ERROR);
    };

    let data = match tokio::fs::read(&args.input).await {
        Ok(data) => data,
        Err(e) => {
            presenter.error(&format!("Failed to read {}: {}", args.input.display(), e));
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let input = AudioBlob::new(data, mime_type);
    let options = config.conversion_options();

    let converter = build_converter(&config);
    let bar = presenter.conversion_bar();
    reveal(&bar);
    let progress_bar = bar.clone();
    let outcome = converter
        .convert(
            &input,
            &options,
            Some(Arc::new(move |progress: ConversionProgress| {
                progress_bar.set_position(progress.percent as u64);
            })),
        )
        .await;
    bar.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            presenter.error_kind(e.kind(), &e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };
    presenter.conversion_summary(&result, input.size_bytes());

    let path = args.output.unwrap_or_else(|| {
        output_path_for(&args.input, result.compressed.mime_type().extension())
    });
    if let Err(e) = tokio::fs::write(&path, result.compressed.data()).await {
        presenter.error(&format!("Failed to write {}: {}", path.display(), e));
        return ExitCode::from(EXIT_ERROR);
    }
    presenter.output(&path.display().to_string());

    ExitCode::from(EXIT_SUCCESS)
}

/// Input path with a new extension, never the input itself
fn output_path_for(input: &Path, extension: &str) -> PathBuf {
    let candidate = input.with_extension(extension);
    if candidate != input {
        return candidate;
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}-converted.{}", stem, extension))
}

/// Print the duration table
pub fn run_items(config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();
    let policy = match config.duration_policy() {
        Ok(policy) => policy,
        Err(e) => {
            presenter.error(&format!("Invalid item table: {}", e));
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    for spec in policy.specs() {
        presenter.output(&format!(
            "{:>4}  {}  ±{} ms",
            spec.item_id,
            format_clock(spec.target_seconds),
            spec.tolerance_ms
        ));
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Probe the host and report which conversion path would run
pub async fn run_check(config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();
    let converter = build_converter(config);

    presenter.start_spinner("Probing conversion support...");
    let verdict = converter.gate().verdict().await;
    let strategy = converter.gate().strategy().await;
    match strategy {
        Some(strategy) => presenter.spinner_success(&format!("Conversion via {}", strategy)),
        None => presenter.spinner_fail("No conversion path available"),
    }

    presenter.capabilities(&verdict);
    presenter.key_value("ffmpeg", config.ffmpeg_path_or_default());
    presenter.key_value(
        "native fallback",
        &config.native_fallback_or_default().to_string(),
    );

    if strategy.is_some() {
        return ExitCode::from(EXIT_SUCCESS);
    }
    if config.allow_pass_through_or_default() {
        presenter.warn("Recordings will be kept uncompressed (pass-through)");
        return ExitCode::from(EXIT_SUCCESS);
    }
    if !verdict.recorder_api_supported {
        presenter.error_kind(ErrorKind::CaptureUnsupported, "no audio host available");
    } else {
        presenter.error_kind(ErrorKind::ConversionUnsupported, "no usable strategy");
    }
    ExitCode::from(EXIT_ERROR)
}
