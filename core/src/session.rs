//! Session controller — acquisition, aggregation and atomic publish.
//!
//! LIFECYCLE of one acquisition:
//!   1. begin()   — gate uploads, take the next request id.
//!   2. fetch()   — the only blocking step: remote call, or demo batch.
//!                  Remote failures fall back to demo data here.
//!   3. publish() — aggregate once, then swap the published snapshot
//!                  only if this request is still the latest issued.
//!
//! RULES:
//!   - Last-writer-wins by request id, not by completion order.
//!   - Remote and demo data are never merged.
//!   - A batch that fails classification is never published and never
//!     papered over with demo data.

use crate::{
    aggregator::aggregate,
    analysis::{AnalysisResult, PeriodBucket, Provenance},
    backend::{AcquisitionError, HttpScoringBackend, OfflineBackend, ScoringBackend},
    config::DeskConfig,
    error::DeskResult,
    event::DeskEvent,
    export::export_suspicious,
    sample::SampleGenerator,
    store::AnalysisStore,
    table::{project, TableView, ViewState},
    transaction::ScoredTransaction,
    types::{AnalysisId, RequestId},
    upload::{check_file_type, read_scored_csv},
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// What the analyst asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionRequest {
    /// Send a transaction file to the scoring service.
    Upload { file_name: String, content: String },
    /// Ask the scoring service for its sample batch.
    Sample,
    /// Generate demo data locally without calling the service.
    Demo,
    /// Aggregate an already-scored CSV from disk.
    ScoredFile { file_name: String, content: String },
}

impl AcquisitionRequest {
    fn source(&self) -> &'static str {
        match self {
            Self::Upload { .. }     => "upload",
            Self::Sample            => "sample",
            Self::Demo              => "demo",
            Self::ScoredFile { .. } => "scored_file",
        }
    }
}

/// User-facing label for a published result.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    LiveAnalysis,
    /// Demo data, with the remote failure that caused it (None when demo
    /// data was requested directly).
    DemoData { cause: Option<AcquisitionError> },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::LiveAnalysis => "Live analysis".to_string(),
            Self::DemoData { cause: None } => "Demo data (approximate)".to_string(),
            Self::DemoData { cause: Some(e) } => {
                format!("Demo data (approximate): scoring service unavailable ({e})")
            }
        }
    }
}

/// A batch in hand, not yet aggregated.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub request_id:       RequestId,
    pub batch:            Vec<ScoredTransaction>,
    pub provenance:       Provenance,
    pub reported_periods: Option<Vec<PeriodBucket>>,
    pub notice:           Notice,
}

/// The published snapshot plus its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedAnalysis {
    pub analysis_id:  AnalysisId,
    pub request_id:   RequestId,
    pub published_at: DateTime<Utc>,
    pub result:       AnalysisResult,
}

#[derive(Debug, Clone)]
pub enum PublishOutcome {
    Published {
        analysis: Arc<PublishedAnalysis>,
        notice:   Notice,
    },
    /// A newer request was issued; this result was discarded.
    Superseded {
        request_id: RequestId,
        latest:     RequestId,
    },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

pub struct Session {
    backend:        Box<dyn ScoringBackend>,
    generator:      Mutex<SampleGenerator>,
    latest_request: AtomicU64,
    published:      RwLock<Option<Arc<PublishedAnalysis>>>,
    store:          Option<Mutex<AnalysisStore>>,
    events:         Mutex<Vec<DeskEvent>>,
}

impl Session {
    pub fn new(backend: Box<dyn ScoringBackend>, seed: u64, sample_size: usize) -> Self {
        Self {
            backend,
            generator: Mutex::new(SampleGenerator::new(seed, sample_size)),
            latest_request: AtomicU64::new(0),
            published: RwLock::new(None),
            store: None,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Build a fully wired session from configuration.
    pub fn from_config(config: &DeskConfig) -> DeskResult<Self> {
        let backend: Box<dyn ScoringBackend> = match &config.scoring_url {
            Some(url) => Box::new(HttpScoringBackend::new(
                url,
                Duration::from_millis(config.request_timeout_ms),
            )),
            None => Box::new(OfflineBackend),
        };
        let mut session = Session::new(backend, config.seed, config.sample_size);

        if let Some(path) = &config.db_path {
            let store = AnalysisStore::open(path)?;
            store.migrate()?;
            session = session.with_store(store);
        }
        Ok(session)
    }

    /// Attach persistence. Every publish and event is recorded from now on.
    pub fn with_store(mut self, store: AnalysisStore) -> Self {
        self.store = Some(Mutex::new(store));
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current published snapshot, if any.
    pub fn current(&self) -> Option<Arc<PublishedAnalysis>> {
        self.published.read().clone()
    }

    pub fn latest_request_id(&self) -> RequestId {
        self.latest_request.load(Ordering::SeqCst)
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&self) -> Vec<DeskEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    // ── Acquisition ────────────────────────────────────────────

    /// Start an acquisition. Uploads of the wrong type are rejected here
    /// and do not consume a request id, so they never supersede anything.
    pub fn begin(&self, request: &AcquisitionRequest) -> DeskResult<RequestId> {
        if let AcquisitionRequest::Upload { file_name, .. }
        | AcquisitionRequest::ScoredFile { file_name, .. } = request
        {
            if let Err(e) = check_file_type(file_name) {
                log::warn!("upload rejected: {e}");
                self.record(DeskEvent::UploadRejected {
                    file_name: file_name.clone(),
                })?;
                return Err(e);
            }
        }

        let request_id = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(DeskEvent::AcquisitionStarted {
            request_id,
            source: request.source().to_string(),
        })?;
        Ok(request_id)
    }

    /// Obtain the batch for `request_id`. Blocks on the remote call.
    pub fn fetch(&self, request_id: RequestId, request: AcquisitionRequest) -> DeskResult<Acquired> {
        let remote = match request {
            AcquisitionRequest::Upload { file_name, content } => {
                self.backend.analyze(&file_name, &content)
            }
            AcquisitionRequest::Sample => self.backend.sample(),
            AcquisitionRequest::Demo => {
                return Ok(self.demo_batch(request_id, None));
            }
            AcquisitionRequest::ScoredFile { content, .. } => {
                return Ok(Acquired {
                    request_id,
                    batch: read_scored_csv(&content)?,
                    provenance: Provenance::Live,
                    reported_periods: None,
                    notice: Notice::LiveAnalysis,
                });
            }
        };

        match remote {
            Ok(analysis) => Ok(Acquired {
                request_id,
                batch: analysis.transactions,
                provenance: Provenance::Live,
                reported_periods: analysis.fraud_comparison,
                notice: Notice::LiveAnalysis,
            }),
            Err(e) => {
                log::warn!(
                    "request {request_id}: {} backend failed ({e}); using demo data",
                    self.backend.name()
                );
                self.record(DeskEvent::AcquisitionFellBack {
                    request_id,
                    reason: e.to_string(),
                })?;
                Ok(self.demo_batch(request_id, Some(e)))
            }
        }
    }

    fn demo_batch(&self, request_id: RequestId, cause: Option<AcquisitionError>) -> Acquired {
        Acquired {
            request_id,
            batch: self.generator.lock().generate(),
            provenance: Provenance::Demo,
            reported_periods: None,
            notice: Notice::DemoData { cause },
        }
    }

    /// Aggregate and publish, unless a newer request has been issued.
    pub fn publish(&self, acquired: Acquired) -> DeskResult<PublishOutcome> {
        let request_id = acquired.request_id;
        if let Some(outcome) = self.superseded(request_id)? {
            return Ok(outcome);
        }

        let mut result = match aggregate(acquired.batch, acquired.provenance) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("request {request_id}: batch rejected: {e}");
                self.record(DeskEvent::BatchRejected {
                    request_id,
                    reason: e.to_string(),
                })?;
                return Err(e);
            }
        };
        if let Some(reported) = acquired.reported_periods {
            result.adopt_reported_periods(reported);
        }

        let analysis = Arc::new(PublishedAnalysis {
            analysis_id: Uuid::new_v4().to_string(),
            request_id,
            published_at: Utc::now(),
            result,
        });

        {
            let mut slot = self.published.write();
            // Re-check under the lock: a newer begin() may have landed
            // while we were aggregating.
            if let Some(outcome) = self.superseded(request_id)? {
                return Ok(outcome);
            }
            if let Some(store) = &self.store {
                store.lock().insert_analysis(&analysis)?;
            }
            *slot = Some(Arc::clone(&analysis));
        }

        let stats = &analysis.result.statistics;
        log::info!(
            "request {request_id}: published {} ({}): {} transactions, {} suspicious",
            analysis.analysis_id,
            analysis.result.provenance,
            stats.total_transactions,
            stats.suspicious_count
        );
        self.record(DeskEvent::AnalysisPublished {
            request_id,
            analysis_id: analysis.analysis_id.clone(),
            provenance: analysis.result.provenance,
            total: stats.total_transactions,
            suspicious_count: stats.suspicious_count,
        })?;

        Ok(PublishOutcome::Published {
            analysis,
            notice: acquired.notice,
        })
    }

    /// begin + fetch + publish.
    pub fn acquire(&self, request: AcquisitionRequest) -> DeskResult<PublishOutcome> {
        let request_id = self.begin(&request)?;
        let acquired = self.fetch(request_id, request)?;
        self.publish(acquired)
    }

    fn superseded(&self, request_id: RequestId) -> DeskResult<Option<PublishOutcome>> {
        let latest = self.latest_request_id();
        if request_id == latest {
            return Ok(None);
        }
        log::warn!("request {request_id}: superseded by request {latest}, discarding result");
        self.record(DeskEvent::AcquisitionSuperseded { request_id, latest })?;
        Ok(Some(PublishOutcome::Superseded { request_id, latest }))
    }

    /// Load the last persisted analysis as the published snapshot.
    /// Returns false when there is no store or nothing stored.
    pub fn resume_from_store(&self) -> DeskResult<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let Some(latest) = store.lock().latest_analysis()? else {
            return Ok(false);
        };
        log::info!("resumed analysis {} from store", latest.analysis_id);
        *self.published.write() = Some(Arc::new(latest));
        Ok(true)
    }

    // ── Views ──────────────────────────────────────────────────

    /// Project the current snapshot through `state`. The state is first
    /// rebased onto that same snapshot so its page index is in range.
    pub fn project(&self, state: &mut ViewState) -> Option<TableView> {
        let analysis = self.current()?;
        state.rebase(&analysis.result);
        Some(project(&analysis.result, state))
    }

    /// CSV of every suspicious transaction in the current snapshot.
    pub fn export_current(&self) -> DeskResult<Option<String>> {
        let Some(analysis) = self.current() else {
            return Ok(None);
        };
        let csv = export_suspicious(&analysis.result.transactions)?;
        self.record(DeskEvent::ExportProduced {
            analysis_id: analysis.analysis_id.clone(),
            rows: analysis.result.statistics.suspicious_count,
        })?;
        Ok(Some(csv))
    }

    fn record(&self, event: DeskEvent) -> DeskResult<()> {
        if let Some(store) = &self.store {
            store.lock().append_event(&event)?;
        }
        self.events.lock().push(event);
        Ok(())
    }
}
