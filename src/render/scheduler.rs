//! Bounded concurrent rendering.
//!
//! One job per tab, all sharing one [`RenderBackend`]. Admission is gated
//! by a semaphore; each job owns its permit and releases it by dropping it
//! when the job's future finishes.
//!
//! Navigations overlap. Every step that depends on which page is in front
//! runs under the run's foreground lock, one job at a time.
//!
//! # Job Steps
//!
//! | Step | Foreground lock | Failure |
//! |------|-----------------|---------|
//! | Open page at baseline viewport, ratio 2 | held | recorded |
//! | Navigate to `file://` document (no deadline) | | recorded, or `Cancelled` |
//! | Focus page | held | recorded |
//! | Locate region | held | `Layout` |
//! | Resize viewport to cover region | held | recorded |
//! | Capture region to output path | held | `Capture` |
//! | Close page | held | logged only, always attempted |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{Id as TaskId, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::ImageFormat;
use crate::error::{Error, Result};
use crate::transport::MAX_PENDING_REQUESTS;

use super::backend::{RenderBackend, RenderPage};
use super::region;
use super::viewport::Viewport;

// ============================================================================
// Constants
// ============================================================================

/// Concurrency when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Highest accepted concurrency. Each job holds one pending navigation on
/// the browser connection, which also keeps a slot for READY.
pub const MAX_CONCURRENCY: usize = MAX_PENDING_REQUESTS - 1;

/// Device pixel ratio every page renders at.
pub const DEVICE_PIXEL_RATIO: f64 = 2.0;

// ============================================================================
// SheetTab
// ============================================================================

/// One spreadsheet tab to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTab {
    /// Tab identifier, unique within the archive.
    pub id: String,
    /// Exported page document.
    pub source: PathBuf,
    /// Image file to write.
    pub output: PathBuf,
}

impl SheetTab {
    /// Creates a tab.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            output: output.into(),
        }
    }

    /// Returns the `file://` URL of the source document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the source path is not absolute.
    pub fn url(&self) -> Result<String> {
        Url::from_file_path(&self.source)
            .map(String::from)
            .map_err(|()| {
                Error::Io(IoError::new(
                    ErrorKind::InvalidInput,
                    format!("Not an absolute path: {}", self.source.display()),
                ))
            })
    }
}

// ============================================================================
// RenderSettings
// ============================================================================

/// Per-run rendering settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Maximum jobs in flight.
    pub concurrency: usize,
    /// Output encoding.
    pub format: ImageFormat,
    /// Device pixel ratio pages open with.
    pub device_pixel_ratio: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            format: ImageFormat::default(),
            device_pixel_ratio: DEVICE_PIXEL_RATIO,
        }
    }
}

impl RenderSettings {
    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a concurrency outside
    /// `1..=MAX_CONCURRENCY` or a non-positive device pixel ratio.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(Error::config(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            )));
        }
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(Error::config(format!(
                "Invalid device pixel ratio {}",
                self.device_pixel_ratio
            )));
        }
        Ok(())
    }
}

// ============================================================================
// RenderReport
// ============================================================================

/// A tab whose job failed.
#[derive(Debug)]
pub struct RenderFailure {
    /// Tab identifier.
    pub id: String,
    /// What went wrong.
    pub error: Error,
}

/// Outcome of one scheduler run.
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Tabs whose image was written, in completion order.
    pub rendered: Vec<String>,
    /// Tabs whose job failed.
    pub failed: Vec<RenderFailure>,
    /// Tabs never admitted because the run was cancelled.
    pub skipped: Vec<String>,
}

impl RenderReport {
    /// Total tabs accounted for.
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.rendered.len() + self.failed.len() + self.skipped.len()
    }

    /// Returns `true` if every tab rendered.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    fn record(&mut self, id: String, result: Result<()>) {
        match result {
            Ok(()) => {
                info!(tab = %id, "Rendered");
                self.rendered.push(id);
            }
            Err(error) => {
                warn!(tab = %id, error = %error, "Render failed");
                self.failed.push(RenderFailure { id, error });
            }
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Runs render jobs against a shared backend.
pub struct Scheduler<B: RenderBackend> {
    backend: Arc<B>,
    settings: RenderSettings,
    /// Held while a job needs its page in front.
    foreground: Arc<Mutex<()>>,
}

impl<B: RenderBackend> Scheduler<B> {
    /// Creates a scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `settings` are invalid.
    pub fn new(backend: Arc<B>, settings: RenderSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            backend,
            settings,
            foreground: Arc::new(Mutex::new(())),
        })
    }

    /// Returns the settings.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Renders every tab, at most `concurrency` at a time.
    ///
    /// Returns after every admitted job has resolved. Per-tab failures are
    /// logged and collected in the report; they never stop siblings. Once
    /// `cancel` fires, remaining tabs are skipped and in-flight navigations
    /// end with [`Error::Cancelled`].
    pub async fn run(&self, tabs: Vec<SheetTab>, cancel: &CancellationToken) -> RenderReport {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut jobs = JoinSet::new();
        let mut ids: FxHashMap<TaskId, String> = FxHashMap::default();
        let mut report = RenderReport::default();

        info!(
            tabs = tabs.len(),
            concurrency = self.settings.concurrency,
            "Starting render run"
        );

        let mut pending = tabs.into_iter();
        for tab in pending.by_ref() {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                report.skipped.push(tab.id);
                break;
            };

            // Reap without waiting so the id map stays small.
            while let Some(joined) = jobs.try_join_next_with_id() {
                Self::reap(&mut report, &mut ids, joined);
            }

            debug!(tab = %tab.id, "Admitting render job");
            let backend = Arc::clone(&self.backend);
            let foreground = Arc::clone(&self.foreground);
            let settings = self.settings;
            let cancel = cancel.clone();
            let id = tab.id.clone();

            let handle = jobs.spawn(async move {
                let _permit = permit;
                render_tab(backend.as_ref(), &foreground, &tab, &settings, &cancel).await
            });
            ids.insert(handle.id(), id);
        }

        report.skipped.extend(pending.map(|tab| tab.id));
        if !report.skipped.is_empty() {
            info!(skipped = report.skipped.len(), "Run cancelled, remaining tabs skipped");
        }

        while let Some(joined) = jobs.join_next_with_id().await {
            Self::reap(&mut report, &mut ids, joined);
        }

        info!(
            rendered = report.rendered.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Render run finished"
        );
        report
    }

    fn reap(
        report: &mut RenderReport,
        ids: &mut FxHashMap<TaskId, String>,
        joined: std::result::Result<(TaskId, Result<()>), JoinError>,
    ) {
        match joined {
            Ok((task_id, result)) => {
                let id = ids.remove(&task_id).unwrap_or_default();
                report.record(id, result);
            }
            Err(e) => {
                let id = ids.remove(&e.id()).unwrap_or_default();
                let error = if e.is_panic() {
                    Error::capture("Render job panicked")
                } else {
                    Error::Cancelled
                };
                report.record(id, Err(error));
            }
        }
    }
}

// ============================================================================
// Job
// ============================================================================

/// Renders one tab in its own page. The page is always closed.
async fn render_tab<B: RenderBackend>(
    backend: &B,
    foreground: &Mutex<()>,
    tab: &SheetTab,
    settings: &RenderSettings,
    cancel: &CancellationToken,
) -> Result<()> {
    let page = {
        let _front = foreground.lock().await;
        backend
            .new_page(Viewport::BASELINE, settings.device_pixel_ratio)
            .await?
    };

    let result = capture_tab(&page, foreground, tab, settings.format, cancel).await;

    let _front = foreground.lock().await;
    if let Err(e) = page.close().await {
        debug!(tab = %tab.id, error = %e, "Failed to close page");
    }
    result
}

async fn capture_tab<P: RenderPage>(
    page: &P,
    foreground: &Mutex<()>,
    tab: &SheetTab,
    format: ImageFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    page.goto(&tab.url()?, cancel).await?;

    let _front = foreground.lock().await;
    page.focus().await?;

    let region = region::locate(page).await?;
    let viewport = Viewport::covering(&region);
    debug!(tab = %tab.id, %viewport, "Resizing viewport");
    page.set_viewport(viewport).await?;

    page.capture(&region, format, &tab.output).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rustc_hash::FxHashSet;
    use tempfile::TempDir;

    use crate::browser::BoundingBox;
    use crate::render::region::{BODY_SELECTOR, HEADER_SELECTOR, Region};

    // ------------------------------------------------------------------------
    // Fake backend
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct Stats {
        opened: AtomicUsize,
        closed: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        /// Tab id of the page last brought to the front.
        front: Mutex<Option<String>>,
        /// Resizes and captures that ran while another page was in front.
        misdirected: AtomicUsize,
    }

    impl Stats {
        /// Records a window-scoped step by `id`, then lets other jobs run.
        async fn window_step(&self, id: &str) {
            if self.front.lock().as_deref() != Some(id) {
                self.misdirected.fetch_add(1, Ordering::SeqCst);
            }
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
        }
    }

    struct FakeBackend {
        stats: Arc<Stats>,
        /// Navigations block until a permit is added.
        gate: Arc<Semaphore>,
        missing_header: FxHashSet<String>,
        panics_on: FxHashSet<String>,
    }

    impl FakeBackend {
        fn open() -> Self {
            let gate = Arc::new(Semaphore::new(0));
            gate.add_permits(1);
            Self::with_gate(gate)
        }

        fn with_gate(gate: Arc<Semaphore>) -> Self {
            Self {
                stats: Arc::new(Stats::default()),
                gate,
                missing_header: FxHashSet::default(),
                panics_on: FxHashSet::default(),
            }
        }
    }

    struct FakePage {
        stats: Arc<Stats>,
        gate: Arc<Semaphore>,
        missing_header: FxHashSet<String>,
        panics_on: FxHashSet<String>,
        current: Mutex<Option<String>>,
    }

    impl FakePage {
        fn current(&self) -> String {
            self.current.lock().clone().unwrap_or_default()
        }
    }

    #[async_trait]
    impl RenderBackend for FakeBackend {
        type Page = FakePage;

        async fn new_page(&self, viewport: Viewport, ratio: f64) -> Result<FakePage> {
            assert_eq!(viewport, Viewport::BASELINE);
            assert_eq!(ratio, DEVICE_PIXEL_RATIO);

            self.stats.opened.fetch_add(1, Ordering::SeqCst);
            let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.stats.peak.fetch_max(now, Ordering::SeqCst);

            Ok(FakePage {
                stats: Arc::clone(&self.stats),
                gate: Arc::clone(&self.gate),
                missing_header: self.missing_header.clone(),
                panics_on: self.panics_on.clone(),
                current: Mutex::new(None),
            })
        }

        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    impl Drop for FakePage {
        fn drop(&mut self) {
            self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl RenderPage for FakePage {
        async fn goto(&self, url: &str, cancel: &CancellationToken) -> Result<()> {
            let id = Path::new(url)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            *self.current.lock() = Some(id);

            tokio::select! {
                () = cancel.cancelled() => Err(Error::Cancelled),
                permit = self.gate.acquire() => {
                    drop(permit);
                    Ok(())
                }
            }
        }

        async fn focus(&self) -> Result<()> {
            *self.stats.front.lock() = Some(self.current());
            tokio::task::yield_now().await;
            Ok(())
        }

        async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>> {
            let id = self.current();
            let bb = match selector {
                HEADER_SELECTOR if self.missing_header.contains(&id) => None,
                HEADER_SELECTOR => Some(BoundingBox {
                    x: 0.0,
                    y: 0.0,
                    width: 46.0,
                    height: 400.0,
                }),
                BODY_SELECTOR => Some(BoundingBox {
                    x: 0.0,
                    y: 0.0,
                    width: 2400.0,
                    height: 400.0,
                }),
                _ => None,
            };
            Ok(bb)
        }

        async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
            assert_eq!(viewport.width, 2453);
            self.stats.window_step(&self.current()).await;
            Ok(())
        }

        async fn capture(&self, region: &Region, format: ImageFormat, path: &Path) -> Result<()> {
            self.stats.window_step(&self.current()).await;
            if self.panics_on.contains(&self.current()) {
                panic!("capture exploded");
            }
            assert_eq!(region.x, 47.0);
            tokio::fs::write(path, format.extension()).await?;
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn tabs(dir: &TempDir, ids: &[&str]) -> Vec<SheetTab> {
        ids.iter()
            .map(|id| {
                SheetTab::new(
                    *id,
                    dir.path().join(format!("{id}.html")),
                    dir.path().join(format!("{id}.jpg")),
                )
            })
            .collect()
    }

    fn settings(concurrency: usize) -> RenderSettings {
        RenderSettings {
            concurrency,
            ..RenderSettings::default()
        }
    }

    async fn wait_for_in_flight(stats: &Stats, n: usize) {
        while stats.in_flight.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    // ------------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_zero_concurrency_rejected() {
        let backend = Arc::new(FakeBackend::open());
        let err = Scheduler::new(backend, settings(0)).err().expect("must fail");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_concurrency_bounded_by_connection_slots() {
        let backend = Arc::new(FakeBackend::open());
        assert!(Scheduler::new(Arc::clone(&backend), settings(MAX_CONCURRENCY)).is_ok());

        for concurrency in [MAX_CONCURRENCY + 1, 150] {
            let err = Scheduler::new(Arc::clone(&backend), settings(concurrency))
                .err()
                .expect("must fail");
            assert!(matches!(err, Error::Config { .. }), "{concurrency}");
        }
    }

    #[test]
    fn test_sheet_tab_url() {
        let tab = SheetTab::new("A", "/tmp/gs2imgx-1/A.html", "/out/A.jpg");
        assert_eq!(tab.url().expect("url"), "file:///tmp/gs2imgx-1/A.html");

        let relative = SheetTab::new("A", "A.html", "A.jpg");
        assert!(relative.url().is_err());
    }

    #[tokio::test]
    async fn test_all_tabs_rendered() {
        let dir = TempDir::new().expect("tempdir");
        let backend = Arc::new(FakeBackend::open());
        let stats = Arc::clone(&backend.stats);
        let scheduler = Scheduler::new(backend, settings(2)).expect("scheduler");

        let report = scheduler
            .run(tabs(&dir, &["A", "B", "C"]), &CancellationToken::new())
            .await;

        assert!(report.is_complete());
        assert_eq!(report.rendered.len(), 3);
        for id in ["A", "B", "C"] {
            assert!(dir.path().join(format!("{id}.jpg")).exists());
        }
        assert_eq!(stats.opened.load(Ordering::SeqCst), 3);
        assert_eq!(stats.closed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_never_exceeds_concurrency() {
        let dir = TempDir::new().expect("tempdir");
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(FakeBackend::with_gate(Arc::clone(&gate)));
        let stats = Arc::clone(&backend.stats);
        let scheduler = Scheduler::new(backend, settings(3)).expect("scheduler");

        let ids: Vec<String> = (0..12).map(|i| format!("T{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let work = tabs(&dir, &id_refs);

        let run = tokio::spawn(async move { scheduler.run(work, &CancellationToken::new()).await });

        wait_for_in_flight(&stats, 3).await;
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert_eq!(stats.in_flight.load(Ordering::SeqCst), 3);

        gate.add_permits(1);
        let report = run.await.expect("join");

        assert_eq!(report.rendered.len(), 12);
        assert_eq!(stats.peak.load(Ordering::SeqCst), 3);
        assert_eq!(stats.closed.load(Ordering::SeqCst), 12);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_resize_and_capture_keep_their_page_in_front() {
        let dir = TempDir::new().expect("tempdir");
        let backend = Arc::new(FakeBackend::open());
        let stats = Arc::clone(&backend.stats);
        let scheduler = Scheduler::new(backend, settings(4)).expect("scheduler");

        let ids: Vec<String> = (0..16).map(|i| format!("T{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let report = scheduler
            .run(tabs(&dir, &id_refs), &CancellationToken::new())
            .await;

        assert_eq!(report.rendered.len(), 16);
        assert_eq!(stats.misdirected.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_header_does_not_block_siblings() {
        let dir = TempDir::new().expect("tempdir");
        let mut backend = FakeBackend::open();
        backend.missing_header.insert("B".to_string());
        let backend = Arc::new(backend);
        let stats = Arc::clone(&backend.stats);
        let scheduler = Scheduler::new(backend, settings(1)).expect("scheduler");

        let report = scheduler
            .run(tabs(&dir, &["A", "B", "C"]), &CancellationToken::new())
            .await;

        assert_eq!(report.rendered, vec!["A", "C"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "B");
        assert!(matches!(report.failed[0].error, Error::Layout { .. }));
        assert!(!dir.path().join("B.jpg").exists());
        assert_eq!(stats.closed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panicking_job_is_contained() {
        let dir = TempDir::new().expect("tempdir");
        let mut backend = FakeBackend::open();
        backend.panics_on.insert("B".to_string());
        let scheduler = Scheduler::new(Arc::new(backend), settings(2)).expect("scheduler");

        let report = scheduler
            .run(tabs(&dir, &["A", "B", "C"]), &CancellationToken::new())
            .await;

        assert_eq!(report.rendered.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "B");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let dir = TempDir::new().expect("tempdir");
        let backend = Arc::new(FakeBackend::open());
        let stats = Arc::clone(&backend.stats);
        let scheduler = Scheduler::new(backend, settings(2)).expect("scheduler");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = scheduler.run(tabs(&dir, &["A", "B", "C"]), &cancel).await;

        assert_eq!(report.skipped, vec!["A", "B", "C"]);
        assert_eq!(report.total(), 3);
        assert_eq!(stats.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_mid_run_closes_in_flight_pages() {
        let dir = TempDir::new().expect("tempdir");
        let gate = Arc::new(Semaphore::new(0));
        let backend = Arc::new(FakeBackend::with_gate(gate));
        let stats = Arc::clone(&backend.stats);
        let scheduler = Scheduler::new(backend, settings(2)).expect("scheduler");

        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let work = tabs(&dir, &["A", "B", "C", "D", "E"]);
        let run = tokio::spawn(async move { scheduler.run(work, &run_cancel).await });

        wait_for_in_flight(&stats, 2).await;
        cancel.cancel();
        let report = run.await.expect("join");

        assert_eq!(report.total(), 5);
        assert!(report.rendered.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().all(|f| f.error.is_cancelled()));
        assert_eq!(report.skipped, vec!["C", "D", "E"]);
        assert_eq!(stats.closed.load(Ordering::SeqCst), 2);
    }
}
