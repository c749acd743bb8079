//! Poller behaviour against synthetic grids in a temporary tree.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use extraction::SourceKind;
use extractor::config::ExtractorConfig;
use extractor::poller::{run_cycles_at, JobOutcome, Poller, PollerState};
use netcdf_parser::{GridOpener, GridSource, MemoryOpener, NetCdfResult};
use test_utils::{read_lines, read_zip_lines, utc, SyntheticGrid, TestWorkspace};
use tokio::sync::watch;

fn config(ws: &TestWorkspace) -> ExtractorConfig {
    ExtractorConfig {
        nc_dir: ws.nc_dir().to_path_buf(),
        csv_dir: ws.csv_dir().to_path_buf(),
        ..ExtractorConfig::default()
    }
}

fn poller(kind: SourceKind, config: ExtractorConfig, opener: MemoryOpener) -> Poller {
    let opener: Arc<dyn GridOpener> = Arc::new(opener);
    Poller::new(kind, Arc::new(config), opener)
}

/// Requests shutdown the first time an input is opened.
struct ShutdownOnOpen {
    inner: MemoryOpener,
    shutdown: watch::Sender<bool>,
}

impl GridOpener for ShutdownOnOpen {
    fn open(&self, path: &Path) -> NetCdfResult<Box<dyn GridSource>> {
        let _ = self.shutdown.send(true);
        self.inner.open(path)
    }
}

/// Holds every open for a moment and records how many overlapped.
#[derive(Default)]
struct SlowOpener {
    inner: MemoryOpener,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GridOpener for SlowOpener {
    fn open(&self, path: &Path) -> NetCdfResult<Box<dyn GridSource>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(200));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.open(path)
    }
}

#[tokio::test]
async fn test_current_cycle_is_idempotent() {
    let ws = TestWorkspace::new();
    let input = ws.touch_input("smoc/2024/03/SMOC_20240301_R20240302.nc");
    ws.touch_input("smoc/2024/03/SMOC_20240229_R20240301.nc");

    let mut opener = MemoryOpener::new();
    opener.register(&input, SyntheticGrid::new(SourceKind::Current, 2, 6, 6).build());

    let poller = poller(SourceKind::Current, config(&ws), opener);
    let (_tx, rx) = watch::channel(false);
    let now = utc(2024, 3, 1, 13);

    // 2024-03-01 extracts; 2024-02-29 has no month directory
    let first = poller.run_cycle_at(now, &rx).await;
    assert_eq!((first.completed, first.skipped, first.failed), (1, 0, 1));
    assert_eq!(poller.state(), PollerState::Idle);

    let zip = ws.csv_dir().join("2024/2024-03-01/smoc_20240301.csv.zip");
    assert_eq!(ws.output_files(), vec![zip.clone()]);
    let lines = read_zip_lines(&zip);
    assert_eq!(lines.len(), 1 + 2 * 2 * 2);
    assert!(lines[5].contains(",2024-03-01 01:00:00,"));

    let second = poller.run_cycle_at(now, &rx).await;
    assert_eq!((second.completed, second.skipped, second.failed), (0, 1, 1));
    assert_eq!(ws.output_files(), vec![zip]);
}

#[tokio::test]
async fn test_atmosphere_cycle_resolves_runs() {
    let ws = TestWorkspace::new();
    let noon = ws.touch_input("ec_0p25/2024/2024-03-01/oper-12/ec_0p25_oper_2024030112_0h.nc");
    let nine = ws.touch_input("ec_0p25/2024/2024-03-01/oper-00/ec_0p25_oper_2024030100_9h.nc");

    let mut opener = MemoryOpener::new();
    opener.register(&noon, SyntheticGrid::new(SourceKind::Atmosphere, 1, 2, 2).build());
    opener.register(&nine, SyntheticGrid::new(SourceKind::Atmosphere, 1, 2, 2).build());

    let mut config = config(&ws);
    config.ec.lookback = 3;
    let poller = poller(SourceKind::Atmosphere, config, opener);
    let (_tx, rx) = watch::channel(false);

    // Slots 12:00, 09:00, 06:00; the 06:00 input is absent
    let summary = poller.run_cycle_at(utc(2024, 3, 1, 13), &rx).await;
    assert_eq!((summary.completed, summary.skipped, summary.failed), (2, 0, 1));

    let day = ws.csv_dir().join("2024/2024-03-01");
    assert_eq!(
        ws.output_files(),
        vec![day.join("ec_2024030109.csv"), day.join("ec_2024030112.csv")]
    );
    let lines = read_lines(day.join("ec_2024030112.csv"));
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("90.00,0.00,2024-03-01 12:00:00,"));
}

#[tokio::test]
async fn test_failed_job_does_not_stop_cycle() {
    let ws = TestWorkspace::new();
    let today = ws.touch_input("mfwam/2024/03/mfwam_20240301.nc");
    let yesterday = ws.touch_input("mfwam/2024/02/mfwam_20240229.nc");

    let mut broken = SyntheticGrid::new(SourceKind::Wave, 1, 3, 3).build();
    broken.remove("VMDR_WW");

    let mut opener = MemoryOpener::new();
    opener.register(&today, broken);
    opener.register(&yesterday, SyntheticGrid::new(SourceKind::Wave, 1, 3, 3).build());

    let poller = poller(SourceKind::Wave, config(&ws), opener);
    let (_tx, rx) = watch::channel(false);

    let summary = poller.run_cycle_at(utc(2024, 3, 1, 2), &rx).await;
    assert_eq!((summary.completed, summary.failed), (1, 1));
    assert_eq!(
        ws.output_files(),
        vec![ws.csv_dir().join("2024/2024-02-29/mfwam_20240229.csv.zip")]
    );
}

#[tokio::test]
async fn test_run_at_normalizes_daily_timestamp() {
    let ws = TestWorkspace::new();
    let input = ws.touch_input("mfwam/2024/03/MFWAM_20240301.nc");

    let mut opener = MemoryOpener::new();
    opener.register(&input, SyntheticGrid::new(SourceKind::Wave, 4, 3, 3).build());

    let mut config = config(&ws);
    config.mfwam.compress = false;
    let poller = poller(SourceKind::Wave, config, opener);

    match poller.run_at(utc(2024, 3, 1, 15)).await {
        JobOutcome::Completed(report) => {
            assert_eq!(report.rows, 4);
            assert_eq!(
                report.artifact,
                ws.csv_dir().join("2024/2024-03-01/mfwam_20240301.csv")
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_shutdown_observed_between_jobs() {
    let ws = TestWorkspace::new();
    let poller = poller(SourceKind::Atmosphere, config(&ws), MemoryOpener::new());

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let summary = poller.run_cycle_at(utc(2024, 3, 1, 13), &rx).await;
    assert!(summary.interrupted);
    assert_eq!(summary.total(), 0);
}

#[tokio::test]
async fn test_shutdown_during_job_lets_it_finish() {
    let ws = TestWorkspace::new();
    let day = "ec_0p25/2024/2024-03-01";
    let inputs = [
        ws.touch_input(format!("{day}/oper-12/ec_0p25_oper_2024030112_0h.nc")),
        ws.touch_input(format!("{day}/oper-00/ec_0p25_oper_2024030100_9h.nc")),
        ws.touch_input(format!("{day}/oper-00/ec_0p25_oper_2024030100_6h.nc")),
    ];

    let mut inner = MemoryOpener::new();
    for input in &inputs {
        inner.register(input, SyntheticGrid::new(SourceKind::Atmosphere, 1, 2, 2).build());
    }

    let (tx, rx) = watch::channel(false);
    let opener: Arc<dyn GridOpener> = Arc::new(ShutdownOnOpen { inner, shutdown: tx });

    let mut config = config(&ws);
    config.ec.lookback = 3;
    let poller = Poller::new(SourceKind::Atmosphere, Arc::new(config), opener);

    let summary = poller.run_cycle_at(utc(2024, 3, 1, 13), &rx).await;
    assert_eq!(summary.completed, 1);
    assert!(summary.interrupted);
    assert_eq!(summary.total(), 1);
    assert_eq!(
        ws.output_files(),
        vec![ws.csv_dir().join("2024/2024-03-01/ec_2024030112.csv")]
    );
}

#[tokio::test]
async fn test_single_cycle_runs_sources_concurrently() {
    let ws = TestWorkspace::new();
    let wave = ws.touch_input("mfwam/2024/03/mfwam_20240301.nc");
    let current = ws.touch_input("smoc/2024/03/SMOC_20240301_R20240302.nc");

    let mut inner = MemoryOpener::new();
    inner.register(&wave, SyntheticGrid::new(SourceKind::Wave, 1, 3, 3).build());
    inner.register(&current, SyntheticGrid::new(SourceKind::Current, 1, 3, 3).build());
    let slow = Arc::new(SlowOpener {
        inner,
        ..SlowOpener::default()
    });

    let mut config = config(&ws);
    config.mfwam.lookback = 1;
    config.smoc.lookback = 1;
    let config = Arc::new(config);

    let opener: Arc<dyn GridOpener> = slow.clone();
    let pollers = vec![
        Arc::new(Poller::new(SourceKind::Wave, Arc::clone(&config), Arc::clone(&opener))),
        Arc::new(Poller::new(SourceKind::Current, Arc::clone(&config), opener)),
    ];

    let (_tx, rx) = watch::channel(false);
    let summaries = run_cycles_at(&pollers, utc(2024, 3, 1, 13), &rx).await.unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].0, SourceKind::Wave);
    assert_eq!(summaries[1].0, SourceKind::Current);
    assert!(summaries.iter().all(|(_, s)| s.completed == 1));
    assert_eq!(slow.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_run_exits_on_shutdown_while_idle() {
    let ws = TestWorkspace::new();
    let mut config = config(&ws);
    config.smoc.lookback = 1;
    let poller = Arc::new(poller(SourceKind::Current, config, MemoryOpener::new()));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.run(rx).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("poller did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(poller.state(), PollerState::Idle);
}
