//! Scheduler overhead benchmark.
//!
//! Runs the render scheduler against an in-memory backend so only admission,
//! spawning and reaping are measured:
//! - Tab counts: 16, 256
//! - Concurrency: 1, 4, 32
//!
//! Run with: cargo bench --bench scheduler
//! Results saved to: target/criterion/

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use sheets2img::{
    BoundingBox, ImageFormat, Region, RenderBackend, RenderPage, RenderSettings, Result,
    Scheduler, SheetTab, Viewport,
};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const TAB_COUNTS: &[usize] = &[16, 256];
const CONCURRENCY: &[usize] = &[1, 4, 32];

// ============================================================================
// In-memory Backend
// ============================================================================

struct NullBackend;

struct NullPage;

#[async_trait]
impl RenderBackend for NullBackend {
    type Page = NullPage;

    async fn new_page(&self, _viewport: Viewport, _ratio: f64) -> Result<NullPage> {
        Ok(NullPage)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl RenderPage for NullPage {
    async fn goto(&self, _url: &str, _cancel: &CancellationToken) -> Result<()> {
        // Stand-in for the navigation round trip.
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn bounding_box(&self, selector: &str) -> Result<Option<BoundingBox>> {
        let width = if selector == "tbody" { 2400.0 } else { 46.0 };
        Ok(Some(BoundingBox {
            x: 0.0,
            y: 0.0,
            width,
            height: 800.0,
        }))
    }

    async fn set_viewport(&self, _viewport: Viewport) -> Result<()> {
        Ok(())
    }

    async fn capture(&self, _region: &Region, _format: ImageFormat, _path: &Path) -> Result<()> {
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn tabs(count: usize) -> Vec<SheetTab> {
    (0..count)
        .map(|i| {
            SheetTab::new(
                format!("Sheet{i}"),
                format!("/tmp/gs2imgx-bench/Sheet{i}.html"),
                format!("/tmp/out/Sheet{i}.jpg"),
            )
        })
        .collect()
}

// ============================================================================
// Benchmark: Run
// ============================================================================

fn bench_run(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut group = c.benchmark_group("scheduler_run");

    for &count in TAB_COUNTS {
        for &concurrency in CONCURRENCY {
            let settings = RenderSettings {
                concurrency,
                ..RenderSettings::default()
            };
            let scheduler =
                Scheduler::new(Arc::new(NullBackend), settings).expect("valid settings");
            let id = format!("{count}tabs_c{concurrency}");

            group.bench_with_input(BenchmarkId::new("run", &id), &count, |b, &count| {
                b.to_async(&rt).iter(|| async {
                    let report = scheduler.run(tabs(count), &CancellationToken::new()).await;
                    assert_eq!(report.rendered.len(), count);
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_run);
criterion_main!(benches);
