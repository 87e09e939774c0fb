//! Format converter and availability gate integration tests

mod support;

use std::sync::Arc;

use parking_lot::Mutex;

use phrase_recorder::application::{ConversionError, ConverterSettings};
use phrase_recorder::domain::audio::{AudioBlob, AudioMimeType, PcmBuffer, PcmFormat};
use phrase_recorder::domain::conversion::{
    ConversionOptions, ConversionProgress, Quality, StrategyKind,
};
use phrase_recorder::domain::error::ErrorKind;
use phrase_recorder::infrastructure::codec::encode_wav;
use phrase_recorder::infrastructure::SymphoniaProbe;

use support::{FakeLoader, FakePlatform, FakeProbe, FakeTranscoder};

fn raw_blob() -> AudioBlob {
    AudioBlob::new(vec![7; 4_096], AudioMimeType::Flac)
}

fn pass_through_settings() -> ConverterSettings {
    ConverterSettings {
        allow_pass_through: true,
        ..Default::default()
    }
}

fn tone_wav(format: PcmFormat, frames: usize) -> AudioBlob {
    let samples = (0..frames * format.channels as usize)
        .map(|i| ((i % 160) as i16 - 80) * 100)
        .collect();
    let pcm = PcmBuffer::new(samples, format);
    AudioBlob::new(encode_wav(&pcm).unwrap(), AudioMimeType::Wav)
}

#[tokio::test]
async fn concurrent_conversions_share_one_engine_load() {
    let engine = Arc::new(FakeTranscoder::default());
    let loader = Arc::new(FakeLoader::new(Arc::clone(&engine)));
    let converter = support::converter(
        FakePlatform::capable(),
        Arc::clone(&loader),
        Arc::new(FakeProbe::returning(support::mono_44k(6.0))),
        false,
        ConverterSettings::default(),
    );
    let options = ConversionOptions::default();
    let raw = raw_blob();

    let (a, b, c) = tokio::join!(
        converter.convert(&raw, &options, None),
        converter.convert(&raw, &options, None),
        converter.convert(&raw, &options, None),
    );

    for result in [a, b, c] {
        let result = result.unwrap();
        assert_eq!(result.strategy, StrategyKind::Transcoder);
        assert_eq!(result.compressed.mime_type(), AudioMimeType::Mpeg);
    }
    assert_eq!(loader.loads(), 1);
    assert_eq!(engine.runs(), 3);
    assert_eq!(engine.file_count(), 0);
}

#[tokio::test]
async fn transcoder_result_carries_requested_settings() {
    let engine = Arc::new(FakeTranscoder::default());
    let converter = support::converter(
        FakePlatform::capable(),
        Arc::new(FakeLoader::new(Arc::clone(&engine))),
        Arc::new(FakeProbe::returning(support::mono_44k(6.0))),
        false,
        ConverterSettings::default(),
    );
    let options = ConversionOptions {
        channels: Some(1),
        ..ConversionOptions::with_quality(Quality::High)
    };

    let percents = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&percents);
    let result = converter
        .convert(
            &raw_blob(),
            &options,
            Some(Arc::new(move |p: ConversionProgress| sink.lock().push(p.percent))),
        )
        .await
        .unwrap();

    assert_eq!(result.metadata.bitrate_kbps, 192);
    assert_eq!(result.metadata.channels, 1);
    assert_eq!(result.duration_seconds, 6.0);
    assert_eq!(result.byte_size, result.compressed.size_bytes());

    let args = engine.last_args.lock().clone();
    let bitrate = args.iter().position(|a| a == "-b:a").unwrap();
    assert_eq!(args[bitrate + 1], "192k");
    let channels = args.iter().position(|a| a == "-ac").unwrap();
    assert_eq!(args[channels + 1], "1");

    let percents = percents.lock();
    assert!(percents.contains(&50));
    assert_eq!(percents.last(), Some(&100));
}

#[tokio::test]
async fn passes_through_when_shared_memory_is_missing() {
    let loader = Arc::new(FakeLoader::new(Arc::new(FakeTranscoder::default())));
    let converter = support::converter(
        FakePlatform {
            shared_memory: false,
            ..FakePlatform::capable()
        },
        Arc::clone(&loader),
        Arc::new(FakeProbe::unreadable()),
        false,
        pass_through_settings(),
    );
    let raw = raw_blob();

    let result = converter
        .convert(&raw, &ConversionOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(result.strategy, StrategyKind::PassThrough);
    assert_eq!(result.compressed, raw);
    assert_eq!(result.byte_size, raw.size_bytes());
    assert_eq!(result.metadata.bitrate_kbps, 0);
    assert_eq!(result.metadata.sample_rate, 44_100);
    assert_eq!(result.metadata.channels, 2);
    assert_eq!(result.duration_seconds, 0.0);
    assert_eq!(loader.loads(), 0);
}

#[tokio::test]
async fn unsupported_without_pass_through() {
    let converter = support::converter(
        FakePlatform {
            secure: false,
            ..FakePlatform::capable()
        },
        Arc::new(FakeLoader::new(Arc::new(FakeTranscoder::default()))),
        Arc::new(FakeProbe::unreadable()),
        false,
        ConverterSettings::default(),
    );

    let err = converter
        .convert(&raw_blob(), &ConversionOptions::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ConversionError::Unsupported));
    assert_eq!(err.kind(), ErrorKind::ConversionUnsupported);
    assert_eq!(err.kind().message_key(), "conversion.unsupported");
}

#[tokio::test]
async fn invalid_options_fail_before_any_work() {
    let loader = Arc::new(FakeLoader::new(Arc::new(FakeTranscoder::default())));
    let probe = Arc::new(FakeProbe::returning(support::mono_44k(6.0)));
    let converter = support::converter(
        FakePlatform::capable(),
        Arc::clone(&loader),
        Arc::clone(&probe),
        false,
        ConverterSettings::default(),
    );
    let options = ConversionOptions {
        bitrate: Some(4),
        ..Default::default()
    };

    let err = converter
        .convert(&raw_blob(), &options, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ConversionError::InvalidOptions(_)));
    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    assert_eq!(loader.loads(), 0);
    assert_eq!(probe.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_run_cleans_up_workspace() {
    let engine = Arc::new(FakeTranscoder::failing());
    let converter = support::converter(
        FakePlatform::capable(),
        Arc::new(FakeLoader::new(Arc::clone(&engine))),
        Arc::new(FakeProbe::returning(support::mono_44k(6.0))),
        false,
        ConverterSettings::default(),
    );

    let err = converter
        .convert(&raw_blob(), &ConversionOptions::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ConversionError::Engine(_)));
    assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    assert_eq!(engine.runs(), 1);
    assert_eq!(engine.file_count(), 0);
}

#[tokio::test]
async fn native_pipeline_takes_over_when_engine_fails_to_load() {
    let loader = Arc::new(FakeLoader::failing());
    let converter = support::converter(
        FakePlatform::capable(),
        Arc::clone(&loader),
        Arc::new(FakeProbe::unreadable()),
        true,
        ConverterSettings::default(),
    );
    let input = tone_wav(PcmFormat::new(16_000, 1), 16_000);

    let result = converter
        .convert(&input, &ConversionOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(result.strategy, StrategyKind::Native);
    assert_eq!(result.compressed.mime_type(), AudioMimeType::Flac);
    assert!(!result.compressed.is_empty());
    assert!(loader.loads() >= 1);
}

#[tokio::test]
async fn native_output_is_probed_for_metadata() {
    let engine_loader = Arc::new(FakeLoader::failing());
    let engine = Arc::new(phrase_recorder::application::SharedTranscoder::new(
        engine_loader,
    ));
    let codec: Arc<dyn phrase_recorder::application::ports::NativeCodec> =
        Arc::new(phrase_recorder::infrastructure::SymphoniaCodec::new());
    let gate = Arc::new(phrase_recorder::application::AvailabilityGate::new(
        Arc::new(FakePlatform::capable()),
        Arc::clone(&engine),
        Some(Arc::clone(&codec)),
        true,
    ));
    let converter = phrase_recorder::application::FormatConverter::new(
        gate,
        phrase_recorder::application::TranscoderStrategy::new(engine),
        Some(phrase_recorder::application::NativeStrategy::new(codec)),
        Arc::new(SymphoniaProbe::new()),
        ConverterSettings::default(),
    );
    let input = tone_wav(PcmFormat::new(16_000, 1), 16_000);

    let result = converter
        .convert(&input, &ConversionOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(result.metadata.sample_rate, 16_000);
    assert_eq!(result.metadata.channels, 1);
    assert!((result.duration_seconds - 1.0).abs() < 0.01);
}

#[tokio::test]
async fn gate_caches_its_verdict() {
    let loader = Arc::new(FakeLoader::new(Arc::new(FakeTranscoder::default())));
    let converter = support::converter(
        FakePlatform::capable(),
        Arc::clone(&loader),
        Arc::new(FakeProbe::unreadable()),
        false,
        ConverterSettings::default(),
    );
    let gate = converter.gate();

    let (first, second) = tokio::join!(gate.check_support(), gate.check_support());
    assert!(first && second);
    assert!(gate.check_support().await);
    assert_eq!(loader.loads(), 1);

    let verdict = gate.recheck().await;
    assert!(verdict.transcoder_loaded);
    assert_eq!(gate.strategy().await, Some(StrategyKind::Transcoder));
    assert_eq!(loader.loads(), 1);
}

#[tokio::test]
async fn gate_recheck_retries_a_failed_load() {
    let loader = Arc::new(FakeLoader::failing());
    let converter = support::converter(
        FakePlatform::capable(),
        Arc::clone(&loader),
        Arc::new(FakeProbe::unreadable()),
        false,
        ConverterSettings::default(),
    );
    let gate = converter.gate();

    assert!(!gate.check_support().await);
    assert!(!gate.check_support().await);
    assert_eq!(loader.loads(), 1);

    let verdict = gate.recheck().await;
    assert!(!verdict.transcoder_loaded);
    assert_eq!(loader.loads(), 2);
}

#[tokio::test]
async fn gate_requires_a_recorder() {
    let converter = support::converter(
        FakePlatform {
            recorder: false,
            ..FakePlatform::capable()
        },
        Arc::new(FakeLoader::new(Arc::new(FakeTranscoder::default()))),
        Arc::new(FakeProbe::unreadable()),
        true,
        ConverterSettings::default(),
    );

    assert!(!converter.gate().check_support().await);
    assert_eq!(converter.gate().strategy().await, None);
}

#[tokio::test]
async fn gate_skips_engine_load_outside_secure_context() {
    let loader = Arc::new(FakeLoader::new(Arc::new(FakeTranscoder::default())));
    let converter = support::converter(
        FakePlatform {
            secure: false,
            ..FakePlatform::capable()
        },
        Arc::clone(&loader),
        Arc::new(FakeProbe::unreadable()),
        true,
        ConverterSettings::default(),
    );

    let verdict = converter.gate().verdict().await;
    assert!(!verdict.transcoder_loaded);
    assert!(verdict.native_pipeline_supported);
    assert_eq!(converter.gate().strategy().await, Some(StrategyKind::Native));
    assert_eq!(loader.loads(), 0);
}
