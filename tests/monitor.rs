use chrono::Local;
use govee_monitor::{CycleOutcome, Error, Monitor, MonitorConfig, Reading, ReadingSource, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const DEVICE: &str = "A4:C1:38:00:00:01";

/// Scripted source: each scan takes `scan_time` and returns the next scripted result.
struct FakeSource {
    script: VecDeque<Result<Option<Reading>>>,
    scan_time: Duration,
    hang: bool,
    started: Vec<Instant>,
}

impl FakeSource {
    fn new(script: Vec<Result<Option<Reading>>>) -> Self {
        FakeSource {
            script: script.into(),
            scan_time: Duration::ZERO,
            hang: false,
            started: Vec::new(),
        }
    }

    fn scan_time(mut self, scan_time: Duration) -> Self {
        self.scan_time = scan_time;
        self
    }

    fn start_offsets(&self) -> Vec<Duration> {
        let first = self.started[0];
        self.started.iter().map(|start| *start - first).collect()
    }
}

impl ReadingSource for FakeSource {
    async fn scan(&mut self, timeout: Duration) -> Result<Option<Reading>> {
        self.started.push(Instant::now());
        if self.hang {
            std::future::pending::<()>().await;
        }
        sleep(self.scan_time.min(timeout)).await;
        self.script.pop_front().unwrap_or(Ok(None))
    }
}

fn reading(probes: &[(u8, f32)]) -> Reading {
    probes
        .iter()
        .fold(Reading::new(DEVICE, Local::now()), |reading, (probe, celsius)| {
            reading.with_probe(*probe, *celsius)
        })
}

fn config(output: &Path) -> MonitorConfig {
    MonitorConfig {
        output: output.to_path_buf(),
        ..MonitorConfig::default()
    }
}

fn assert_offsets(actual: &[Duration], expected_secs: &[u64]) {
    assert_eq!(actual.len(), expected_secs.len(), "{:?}", actual);
    for (actual, expected) in actual.iter().zip(expected_secs) {
        let expected = Duration::from_secs(*expected);
        let diff = if *actual > expected {
            *actual - expected
        } else {
            expected - *actual
        };
        assert!(diff < Duration::from_millis(50), "{:?} vs {:?}", actual, expected);
    }
}

fn terminal_text<S>(monitor: &Monitor<S, Vec<u8>>) -> String
where
    S: ReadingSource,
{
    String::from_utf8(monitor.terminal().clone()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn first_row_matches_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temps.csv");
    let source = FakeSource::new(vec![Ok(Some(reading(&[(1, 72.5), (2, 68.2)])))]);

    let mut monitor = Monitor::new(source, Vec::new(), config(&path)).unwrap();
    monitor.run(sleep(Duration::from_secs(30))).await.unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("t_plus,device,probe_1,probe_2\n0:00,{},72.5,68.2\n", DEVICE)
    );
    let terminal = terminal_text(&monitor);
    assert!(terminal.contains(&format!("T+0:00 Device: {}", DEVICE)));
    assert!(terminal.contains("  Probe 1: 72.5°C\n  Probe 2: 68.2°C\n"));
}

#[tokio::test(start_paused = true)]
async fn cycles_keep_cadence_despite_scan_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temps.csv");
    let script = (0..5)
        .map(|_| Ok(Some(reading(&[(1, 50.0)]))))
        .collect();
    let source = FakeSource::new(script).scan_time(Duration::from_secs(5));

    let mut monitor = Monitor::new(source, Vec::new(), config(&path)).unwrap();
    monitor.run(sleep(Duration::from_secs(250))).await.unwrap();

    assert_eq!(monitor.cycles(), 5);
    assert_offsets(&monitor.source().start_offsets(), &[0, 60, 120, 180, 240]);

    let contents = fs::read_to_string(&path).unwrap();
    let t_plus: Vec<&str> = contents
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(t_plus, vec!["0:05", "1:05", "2:05", "3:05", "4:05"]);
}

#[tokio::test(start_paused = true)]
async fn missing_device_writes_no_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temps.csv");
    let source = FakeSource::new(vec![
        Ok(None),
        Err(Error::NoAdapter),
        Ok(Some(reading(&[(1, 60.0), (2, 61.0)]))),
    ]);

    let mut monitor = Monitor::new(source, Vec::new(), config(&path)).unwrap();
    assert_eq!(monitor.cycle().await.unwrap(), CycleOutcome::NotFound);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");

    monitor.run(sleep(Duration::from_secs(100))).await.unwrap();

    assert_offsets(&monitor.source().start_offsets(), &[0, 0, 60]);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("t_plus,device,probe_1,probe_2\n1:00,{},60.0,61.0\n", DEVICE)
    );
    let terminal = terminal_text(&monitor);
    assert_eq!(
        terminal
            .matches("No Govee H5055 temperature readings available.")
            .count(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn rerun_appends_to_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temps.csv");
    let previous = "t_plus,device,probe_1,probe_2\n0:00,old,20.0,21.0\n1:00,old,22.0,23.0\n";
    fs::write(&path, previous).unwrap();

    let source = FakeSource::new(vec![Ok(Some(reading(&[(1, 72.5), (2, 68.2)])))]);
    let mut monitor = Monitor::new(source, Vec::new(), config(&path)).unwrap();
    monitor.run(sleep(Duration::from_secs(10))).await.unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with(previous));
    assert_eq!(&contents[previous.len()..], format!("0:00,{},72.5,68.2\n", DEVICE));
}

#[tokio::test(start_paused = true)]
async fn new_probe_column_leaves_earlier_rows_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temps.csv");
    let source = FakeSource::new(vec![
        Ok(Some(reading(&[(1, 72.5), (2, 68.2)]))),
        Ok(Some(reading(&[(1, 73.5), (2, 69.2), (3, 40.0)]))),
        Ok(Some(reading(&[(1, 74.5), (3, 41.0)]))),
    ]);

    let mut monitor = Monitor::new(source, Vec::new(), config(&path)).unwrap();
    monitor.run(sleep(Duration::from_secs(150))).await.unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "t_plus,device,probe_1,probe_2".to_string(),
            format!("0:00,{},72.5,68.2", DEVICE),
            format!("1:00,{},73.5,69.2,40.0", DEVICE),
            format!("2:00,{},74.5,,41.0", DEVICE),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_sleep_leaves_whole_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temps.csv");
    let source = FakeSource::new(vec![
        Ok(Some(reading(&[(1, 72.5)]))),
        Ok(Some(reading(&[(1, 73.5)]))),
    ])
    .scan_time(Duration::from_secs(3));

    let mut monitor = Monitor::new(source, Vec::new(), config(&path)).unwrap();
    let started = Instant::now();
    monitor.run(sleep(Duration::from_secs(90))).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(91));
    assert_eq!(monitor.cycles(), 2);
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.ends_with('\n'));
    assert_eq!(contents.lines().count(), 3);
}

#[tokio::test(start_paused = true)]
async fn hanging_scan_is_abandoned() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temps.csv");
    let mut source = FakeSource::new(vec![]);
    source.hang = true;

    let mut monitor = Monitor::new(source, Vec::new(), config(&path)).unwrap();
    monitor.run(sleep(Duration::from_secs(90))).await.unwrap();

    assert_offsets(&monitor.source().start_offsets(), &[0, 60]);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[tokio::test]
async fn unopenable_output_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("temps.csv");
    let result = Monitor::new(FakeSource::new(vec![]), Vec::new(), config(&path));
    assert!(matches!(result, Err(Error::OpenOutput { .. })));
}

#[cfg(target_os = "linux")]
#[tokio::test(start_paused = true)]
async fn write_failure_is_fatal() {
    let source = FakeSource::new(vec![Ok(Some(reading(&[(1, 72.5)])))]);
    let mut monitor = Monitor::new(source, Vec::new(), config(Path::new("/dev/full"))).unwrap();
    let err = monitor
        .run(sleep(Duration::from_secs(600)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WriteOutput { .. }));
    assert!(err.is_fatal());
    assert_eq!(monitor.cycles(), 1);
}

#[tokio::test(start_paused = true)]
async fn found_device_is_announced_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("temps.csv");
    let source = FakeSource::new(vec![
        Ok(None),
        Ok(Some(reading(&[(1, 72.5)]))),
        Ok(Some(reading(&[(1, 73.5)]))),
    ]);

    let mut monitor = Monitor::new(source, Vec::new(), config(&path)).unwrap();
    monitor.run(sleep(Duration::from_secs(150))).await.unwrap();

    let terminal = terminal_text(&monitor);
    let announcement = format!("Found H5055 device: {}\n", DEVICE);
    assert_eq!(terminal.matches(&announcement).count(), 1);
    let announced_at = terminal.find(&announcement).unwrap();
    assert!(announced_at > terminal.find("No Govee H5055").unwrap());
    assert!(announced_at < terminal.find("T+1:00").unwrap());
}
