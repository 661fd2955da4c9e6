//! Pipeline coordinator: drives frames through recognition and translation.
//!
//! [`PipelineCoordinator`] owns one sampler, one [`LaneStatus`] and one
//! [`ResultPublisher`] per lane.  Frames come in through
//! [`submit`](PipelineCoordinator::submit) (or the [`run`](PipelineCoordinator::run)
//! loop over an mpsc channel) and every admitted frame becomes one spawned
//! unit of work.
//!
//! # Unit of work
//!
//! ```text
//! Frame ──sampler──▶ admitted?  no  → dropped
//!                        │ yes
//!                        ▼
//!                  [Recognizing]  spawn_blocking(model)
//!                        ├─ nothing found          → Idle
//!                        ▼
//!                  [Translating]  TranslationService::translate (bounded)
//!                        ├─ Ok  → publish result   → Idle
//!                        └─ Err → ErrorSink        → Idle (result untouched)
//! ```
//!
//! The text and object lanes run concurrently and never block each other.
//! A lane holds at most one unit of work at a time: while it is busy every
//! frame offered to it is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

use crate::config::AppConfig;
use crate::recognize::{Detection, Frame, RecognitionAdapter};
use crate::translate::{TranslateError, TranslationRequest, TranslationResult, TranslationService};

use super::language::TargetLanguage;
use super::publisher::ResultPublisher;
use super::result::PipelineResult;
use super::sampler::FrameSampler;
use super::sink::{ErrorSink, LogSink};
use super::state::{Lane, LaneState, LaneStatus};

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// Which lanes accepted a submitted frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Admission {
    pub text: bool,
    pub object: bool,
}

impl Admission {
    pub fn any(&self) -> bool {
        self.text || self.object
    }

    fn mark(&mut self, lane: Lane) {
        match lane {
            Lane::Text => self.text = true,
            Lane::Object => self.object = true,
        }
    }
}

// ---------------------------------------------------------------------------
// Top detection
// ---------------------------------------------------------------------------

/// Pick the detection whose label gets translated.
///
/// Highest confidence wins; on a tie the detection that came first wins.
/// Detections below `min_confidence`, with a NaN confidence or with a blank
/// label are skipped.
///
/// ```
/// use scan_translate::pipeline::select_top_detection;
/// use scan_translate::recognize::{Detection, Region};
///
/// let detections = vec![
///     Detection::new("dog", 0.81, Region::default()),
///     Detection::new("cat", 0.92, Region::default()),
/// ];
/// let top = select_top_detection(&detections, 0.0).unwrap();
/// assert_eq!(top.label, "cat");
/// ```
pub fn select_top_detection(detections: &[Detection], min_confidence: f32) -> Option<&Detection> {
    detections
        .iter()
        .filter(|d| d.confidence >= min_confidence && !d.label.trim().is_empty())
        .fold(None, |best: Option<&Detection>, candidate| match best {
            Some(best) if best.confidence >= candidate.confidence => Some(best),
            _ => Some(candidate),
        })
}

// ---------------------------------------------------------------------------
// Lane bookkeeping
// ---------------------------------------------------------------------------

struct LaneSlot {
    lane: Lane,
    enabled: bool,
    sampler: Mutex<FrameSampler>,
    status: LaneStatus,
    publisher: ResultPublisher,
    task: Mutex<Option<AbortHandle>>,
}

impl LaneSlot {
    fn new(lane: Lane, enabled: bool, interval: Duration) -> Self {
        Self {
            lane,
            enabled,
            sampler: Mutex::new(FrameSampler::new(interval)),
            status: LaneStatus::new(),
            publisher: ResultPublisher::new(),
            task: Mutex::new(None),
        }
    }

    /// Run the sampler and, if it admits the frame, mark the lane busy.
    ///
    /// The sampler lock serialises admissions, so the busy check and the
    /// `Idle → Recognizing` transition cannot interleave with another submit.
    fn try_admit(&self, frame: &Frame) -> bool {
        let mut sampler = self.sampler.lock().unwrap_or_else(PoisonError::into_inner);
        if !sampler.admit(frame, self.status.is_in_flight()) {
            return false;
        }
        self.status.try_begin()
    }

    fn track(&self, task: AbortHandle) {
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    /// Cancel the running unit, if any.  Dropping its future releases the
    /// single-flight marker it may hold in the shared service.
    fn abort(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }

    fn reset(&self) {
        self.abort();
        self.sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        self.status.set(LaneState::Idle);
    }
}

/// Returns the lane to `Idle` when a unit of work ends, however it ends.
struct IdleOnDrop<'a>(&'a LaneStatus);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(LaneState::Idle);
    }
}

struct Inner {
    recognizer: RecognitionAdapter,
    service: Arc<TranslationService>,
    target: TargetLanguage,
    sink: Arc<dyn ErrorSink>,
    source_language: String,
    detect_source_language: bool,
    label_language: String,
    min_confidence: f32,
    translation_timeout: Duration,
    text: LaneSlot,
    object: LaneSlot,
    closed: AtomicBool,
    runtime: Handle,
}

// ---------------------------------------------------------------------------
// PipelineBuilder
// ---------------------------------------------------------------------------

/// Assembles a [`PipelineCoordinator`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use scan_translate::config::AppConfig;
/// use scan_translate::pipeline::PipelineCoordinator;
/// use scan_translate::recognize::RecognitionAdapter;
/// use scan_translate::translate::{HttpTranslator, TranslationService};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::load()?;
/// let translator = Arc::new(HttpTranslator::from_config(&config.translation)?);
/// let service = Arc::new(TranslationService::new(translator, config.cache.policy()));
///
/// let coordinator = PipelineCoordinator::builder(&config, RecognitionAdapter::new(), service)
///     .build();
/// # Ok(())
/// # }
/// ```
pub struct PipelineBuilder {
    config: AppConfig,
    recognizer: RecognitionAdapter,
    service: Arc<TranslationService>,
    target: Option<TargetLanguage>,
    sink: Arc<dyn ErrorSink>,
    runtime: Option<Handle>,
}

impl PipelineBuilder {
    pub fn new(
        config: &AppConfig,
        recognizer: RecognitionAdapter,
        service: Arc<TranslationService>,
    ) -> Self {
        Self {
            config: config.clone(),
            recognizer,
            service,
            target: None,
            sink: Arc::new(LogSink),
            runtime: None,
        }
    }

    /// Share a target-language handle with the caller.  Defaults to a fresh
    /// handle seeded from `translation.target_language`.
    pub fn with_target_language(mut self, target: TargetLanguage) -> Self {
        self.target = Some(target);
        self
    }

    /// Where translation failures go.  Defaults to [`LogSink`].
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runtime that units of work are spawned on.  Set this when frames are
    /// submitted from threads the runtime does not own.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the coordinator.
    ///
    /// A lane is enabled when the config turns it on and the adapter has the
    /// matching model.
    ///
    /// # Panics
    ///
    /// Panics if no runtime was given and this is called outside a tokio
    /// runtime.
    pub fn build(self) -> PipelineCoordinator {
        let config = self.config;
        let runtime = self.runtime.unwrap_or_else(Handle::current);
        let target = self
            .target
            .unwrap_or_else(|| TargetLanguage::new(config.translation.target_language.clone()));

        let interval = config.sampler.interval();
        let text_enabled = config.pipeline.text_lane && self.recognizer.has_text_recognizer();
        let object_enabled = config.pipeline.object_lane && self.recognizer.has_object_detector();

        log::info!(
            "pipeline: starting (text lane: {text_enabled}, object lane: {object_enabled}, \
             interval: {interval:?}, target: {})",
            target.get()
        );

        let inner = Inner {
            recognizer: self.recognizer,
            service: self.service,
            target,
            sink: self.sink,
            source_language: config.translation.source_language.clone(),
            detect_source_language: config.translation.detect_source_language,
            label_language: config.pipeline.label_language.clone(),
            min_confidence: config.pipeline.min_confidence,
            translation_timeout: config.pipeline.translation_timeout(),
            text: LaneSlot::new(Lane::Text, text_enabled, interval),
            object: LaneSlot::new(Lane::Object, object_enabled, interval),
            closed: AtomicBool::new(false),
            runtime,
        };

        PipelineCoordinator {
            inner: Arc::new(inner),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineCoordinator
// ---------------------------------------------------------------------------

/// Runs the text and object lanes.
///
/// Dropping the coordinator (or calling [`shutdown`](Self::shutdown)) stops
/// admissions and cancels units of work already running.
pub struct PipelineCoordinator {
    inner: Arc<Inner>,
}

impl PipelineCoordinator {
    pub fn builder(
        config: &AppConfig,
        recognizer: RecognitionAdapter,
        service: Arc<TranslationService>,
    ) -> PipelineBuilder {
        PipelineBuilder::new(config, recognizer, service)
    }

    // -----------------------------------------------------------------------
    // Frame intake
    // -----------------------------------------------------------------------

    /// Offer one frame to every enabled lane.
    ///
    /// Never blocks: admitted frames are handed to a spawned task and this
    /// returns straight away.  Frames rejected by a lane are dropped.
    pub fn submit(&self, frame: Frame) -> Admission {
        let mut admission = Admission::default();
        if self.inner.closed.load(Ordering::SeqCst) {
            return admission;
        }

        for slot in [&self.inner.text, &self.inner.object] {
            if !slot.enabled || !slot.try_admit(&frame) {
                continue;
            }
            log::trace!(
                "pipeline: {} lane admitted frame at {:?}",
                slot.lane,
                frame.timestamp
            );
            admission.mark(slot.lane);
            let task = self
                .inner
                .runtime
                .spawn(run_unit(Arc::clone(&self.inner), slot.lane, frame.clone()));
            slot.track(task.abort_handle());

            // Lost a race with shutdown: it may have aborted before we tracked.
            if self.inner.closed.load(Ordering::SeqCst) {
                slot.abort();
            }
        }

        admission
    }

    /// Submit every frame received on `frames` until the channel closes, then
    /// shut down.
    pub async fn run(self, mut frames: mpsc::Receiver<Frame>) {
        while let Some(frame) = frames.recv().await {
            self.submit(frame);
        }

        log::info!("pipeline: frame channel closed, coordinator shutting down");
        self.shutdown();
    }

    /// Stop admitting frames, cancel running units of work and reset every
    /// lane to `Idle`.
    ///
    /// Idempotent.  Cancelled units release their in-flight translations, so
    /// another coordinator sharing the service is never left waiting on them.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.text.reset();
        self.inner.object.reset();
        log::info!("pipeline: shut down");
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Latest result published by `lane`.
    pub fn current(&self, lane: Lane) -> Option<PipelineResult> {
        self.inner.slot(lane).publisher.current()
    }

    /// Receiver woken on every result `lane` publishes.
    pub fn subscribe(&self, lane: Lane) -> watch::Receiver<Option<PipelineResult>> {
        self.inner.slot(lane).publisher.subscribe()
    }

    pub fn lane_state(&self, lane: Lane) -> LaneState {
        self.inner.slot(lane).status.get()
    }

    pub fn is_lane_enabled(&self, lane: Lane) -> bool {
        self.inner.slot(lane).enabled
    }

    pub fn target_language(&self) -> &TargetLanguage {
        &self.inner.target
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Drop for PipelineCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Units of work
// ---------------------------------------------------------------------------

async fn run_unit(inner: Arc<Inner>, lane: Lane, frame: Frame) {
    let slot = inner.slot(lane);
    let _idle = IdleOnDrop(&slot.status);

    match lane {
        Lane::Text => inner.text_unit(frame).await,
        Lane::Object => inner.object_unit(frame).await,
    }
}

impl Inner {
    fn slot(&self, lane: Lane) -> &LaneSlot {
        match lane {
            Lane::Text => &self.text,
            Lane::Object => &self.object,
        }
    }

    async fn text_unit(&self, frame: Frame) {
        let Some(recognized) = self.recognizer.recognize_text(frame).await else {
            log::trace!("pipeline: text lane recognized nothing");
            return;
        };
        if !self.begin_translating(&self.text) {
            return;
        }
        log::debug!("pipeline: text lane recognized {:?}", recognized.text);

        let source = match self.source_language_for(&recognized.text).await {
            Ok(source) => source,
            Err(e) => return self.fail(Lane::Text, &e),
        };
        let request = TranslationRequest::new(recognized.text.clone(), source, self.target.get());

        match self.translate(&request).await {
            Ok(result) => self.publish(
                &self.text,
                PipelineResult::Text {
                    original_text: recognized.text,
                    translation: result.translated_text,
                },
            ),
            Err(e) => self.fail(Lane::Text, &e),
        }
    }

    async fn object_unit(&self, frame: Frame) {
        let detections = self.recognizer.detect_objects(frame).await;
        let Some(top) = select_top_detection(&detections, self.min_confidence).cloned() else {
            log::trace!(
                "pipeline: object lane found nothing above {}",
                self.min_confidence
            );
            return;
        };
        if !self.begin_translating(&self.object) {
            return;
        }
        log::debug!(
            "pipeline: object lane picked {:?} ({:.2})",
            top.label,
            top.confidence
        );

        let request = TranslationRequest::new(
            top.label.clone(),
            self.label_language.clone(),
            self.target.get(),
        );

        match self.translate(&request).await {
            Ok(result) => self.publish(
                &self.object,
                PipelineResult::Object {
                    label: top.label,
                    translation: result.translated_text,
                    confidence: top.confidence,
                },
            ),
            Err(e) => self.fail(Lane::Object, &e),
        }
    }

    /// `Recognizing → Translating`, unless the lane was reset underneath us.
    fn begin_translating(&self, slot: &LaneSlot) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        slot.status
            .advance(LaneState::Recognizing, LaneState::Translating)
    }

    async fn source_language_for(&self, text: &str) -> Result<String, TranslateError> {
        if !self.detect_source_language {
            return Ok(self.source_language.clone());
        }
        tokio::time::timeout(self.translation_timeout, self.service.detect_language(text))
            .await
            .unwrap_or(Err(TranslateError::Timeout))
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, TranslateError> {
        tokio::time::timeout(self.translation_timeout, self.service.translate(request))
            .await
            .unwrap_or(Err(TranslateError::Timeout))
    }

    fn publish(&self, slot: &LaneSlot, result: PipelineResult) {
        if self.closed.load(Ordering::SeqCst) {
            log::debug!("pipeline: discarding {} lane result after shutdown", slot.lane);
            return;
        }
        slot.publisher.publish(result);
    }

    fn fail(&self, lane: Lane, error: &TranslateError) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.sink.report(lane, error);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
