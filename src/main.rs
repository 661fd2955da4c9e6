//! Command-line demo: translates lines typed on stdin through the pipeline.
//!
//! Every stdin line becomes one frame whose pixel buffer holds the line's
//! UTF-8 bytes; a stand-in text recognizer reads them back.  Lines are
//! throttled, cached and translated exactly like camera frames.
//!
//! `:lang <code>` switches the target language.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread).
//! 4. Build the HTTP translator from config; exit if no API key is set.
//! 5. Build the pipeline coordinator and a printer task for its results.
//! 6. Feed stdin lines in as frames until EOF, then shut down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use scan_translate::{
    config::AppConfig,
    pipeline::{Lane, PipelineCoordinator, PipelineResult},
    recognize::{Frame, FrameImage, RecognitionAdapter, RecognitionError, TextRecognizer},
    translate::{HttpTranslator, TranslationService},
};

// ---------------------------------------------------------------------------
// Stand-in recognizer
// ---------------------------------------------------------------------------

/// Reads the frame's pixel buffer back as UTF-8 text.
struct EchoRecognizer;

impl TextRecognizer for EchoRecognizer {
    fn recognize(&self, image: &FrameImage) -> Result<Vec<String>, RecognitionError> {
        let text = std::str::from_utf8(&image.pixels)
            .map_err(|e| RecognitionError::Inference(format!("not utf-8: {e}")))?;
        Ok(vec![text.to_string()])
    }
}

fn line_frame(line: &str, started: Instant) -> Frame {
    let bytes = line.as_bytes();
    let image = FrameImage::new(bytes.len() as u32, 1, bytes.to_vec());
    Frame::new(image, started.elapsed())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("scan-translate starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 4. Translator
    let translator = Arc::new(
        HttpTranslator::from_config(&config.translation)
            .context("cannot build translation client")?,
    );
    let service = Arc::new(TranslationService::new(translator, config.cache.policy()));

    // 5. Coordinator + printer
    let recognizer = RecognitionAdapter::new().with_text_recognizer(Arc::new(EchoRecognizer));
    let coordinator = PipelineCoordinator::builder(&config, recognizer, Arc::clone(&service)).build();

    let mut results = coordinator.subscribe(Lane::Text);
    let printer = tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let latest = results.borrow_and_update().clone();
            if let Some(PipelineResult::Text {
                original_text,
                translation,
            }) = latest
            {
                println!("{original_text} → {translation}");
            }
        }
    });

    // 6. Feed stdin
    let started = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if let Some(code) = line.strip_prefix(":lang ") {
            coordinator.target_language().set(code.trim());
            continue;
        }
        if !coordinator.submit(line_frame(&line, started)).text {
            log::debug!("frame dropped: lane busy or interval not elapsed");
        }
    }

    // Let the last admitted line finish before tearing down.
    let drained = tokio::time::timeout(config.pipeline.translation_timeout(), async {
        while coordinator.lane_state(Lane::Text).is_busy() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if drained.is_err() {
        log::warn!("last translation still pending at shutdown");
    }

    let stats = service.cache_stats();
    log::info!(
        "cache: {} entries, {} hits, {} misses, {} coalesced, {} evictions",
        service.cache_len(),
        stats.hits,
        stats.misses,
        stats.coalesced,
        stats.evictions
    );

    coordinator.shutdown();
    drop(coordinator);
    printer.abort();
    Ok(())
}
