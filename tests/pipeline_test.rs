//! Integration tests driving the full sampling pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};
use wifi_motion_tracker::{
    pipeline::{run_replay, Consumer, FanoutOptions, Pipeline},
    sinks::{format_timestamp, EventLog, LiveHistory},
    source::ReplaySource,
    DetectorConfig, RunStats, SignalSource, SourceError,
};

fn step_config(sample_interval_secs: f64) -> DetectorConfig {
    DetectorConfig {
        window_size: 5,
        long_window: 20,
        threshold: 8.0,
        ema_alpha: 1.0,
        dev_factor: 3.0,
        down_ratio: 0.6,
        min_duration_secs: 0.0,
        sample_interval_secs,
    }
}

const STEP: [u8; 15] = [50, 50, 50, 50, 50, 90, 90, 90, 90, 90, 50, 50, 50, 50, 50];

#[test]
fn test_step_scenario_through_threads() {
    let stats = Arc::new(RunStats::new());
    let (live, view) = LiveHistory::new(100);

    let pipeline = Pipeline::spawn(
        &step_config(0.001),
        ReplaySource::from_values(STEP),
        vec![Box::new(live)],
        FanoutOptions::default(),
        stats.clone(),
    )
    .expect("valid configuration");
    pipeline.wait();

    let snap = view.snapshot();
    assert_eq!(snap.samples.len(), 15);

    let motion: Vec<bool> = snap.samples.iter().map(|s| s.motion).collect();
    assert!(motion[..5].iter().all(|m| !m));
    assert!(motion[5]);
    assert!(!motion[9]);
    assert!(!motion[14]);

    // one event for the rise to 90, one for the fall back to 50
    assert_eq!(snap.events.len(), 2);
    let first = &snap.events[0];
    assert_eq!(first.start, snap.samples[5].timestamp);
    assert_eq!(first.end, snap.samples[9].timestamp);
    assert_eq!(first.mean_signal, 90.0);
    assert!((first.max_std - 19.595917942265423).abs() < 1e-6);

    assert_eq!(stats.snapshot().samples, 15);
    assert_eq!(stats.snapshot().events, 2);
}

#[test]
fn test_acquisition_failure_produces_one_error_record() {
    let stats = Arc::new(RunStats::new());
    let (live, view) = LiveHistory::new(100);

    let mut script: Vec<Result<u8, SourceError>> = vec![Ok(60); 6];
    script.push(Err(SourceError::InterfaceNotFound("wlan9".into())));
    script.extend(vec![Ok(60); 3]);

    let pipeline = Pipeline::spawn(
        &step_config(0.001),
        ReplaySource::from_script(script),
        vec![Box::new(live)],
        FanoutOptions::default(),
        stats.clone(),
    )
    .unwrap();
    pipeline.wait();

    let snap = view.snapshot();
    assert_eq!(snap.error_count, 1);
    assert_eq!(snap.samples.len(), 9);
    assert!(snap.last_error.unwrap().error.contains("wlan9"));
    assert!(snap.events.is_empty());
    assert_eq!(stats.snapshot().source_errors, 1);
}

struct Steady;

impl SignalSource for Steady {
    fn read(&mut self) -> Result<u8, SourceError> {
        Ok(70)
    }

    fn describe(&self) -> String {
        "steady".to_string()
    }
}

#[test]
fn test_stop_interrupts_long_interval() {
    let stats = Arc::new(RunStats::new());
    let (live, view) = LiveHistory::new(10);

    let pipeline = Pipeline::spawn(
        &step_config(60.0),
        Steady,
        vec![Box::new(live)],
        FanoutOptions::default(),
        stats,
    )
    .unwrap();

    // let the first tick land, then stop mid-sleep
    let deadline = Instant::now() + Duration::from_secs(5);
    while view.snapshot().samples.is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }

    let started = Instant::now();
    pipeline.stop();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(view.snapshot().samples.len(), 1);
}

#[test]
fn test_invalid_configuration_does_not_start() {
    let config = DetectorConfig {
        ema_alpha: 2.0,
        ..DetectorConfig::default()
    };
    let result = Pipeline::spawn(
        &config,
        Steady,
        Vec::new(),
        FanoutOptions::default(),
        Arc::new(RunStats::new()),
    );
    assert!(result.is_err());
}

#[test]
fn test_replay_writes_event_log() {
    let path = std::env::temp_dir().join(format!("wifi-motion-events-{}.csv", unique_suffix()));
    let event_log = EventLog::open(&path).unwrap();
    let consumers: Vec<Box<dyn Consumer>> = vec![Box::new(event_log)];

    let stats = Arc::new(RunStats::new());
    run_replay(
        &step_config(1.0),
        ReplaySource::from_values(STEP),
        consumers,
        1,
        stats.clone(),
    )
    .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "start,end,duration_s,max_std,mean_signal");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with(",90.000"));
    // five samples one second apart, measured on the recorded clock
    assert!(lines[1].contains(",4.000,"));
    assert_eq!(stats.snapshot().dropped_records, 0);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_replay_durations_follow_sample_interval() {
    let (live, view) = LiveHistory::new(100);
    let interval = Duration::from_millis(500);
    run_replay(
        &step_config(0.5),
        ReplaySource::from_values(STEP).with_interval(interval),
        vec![Box::new(live)],
        16,
        Arc::new(RunStats::new()),
    )
    .unwrap();

    let snap = view.snapshot();
    let first = &snap.events[0];
    assert_eq!(first.end - first.start, chrono::Duration::milliseconds(2000));
    assert!((first.duration_secs - 4.0 * interval.as_secs_f64()).abs() < 1e-9);
    assert_eq!(
        snap.samples[14].timestamp - snap.samples[0].timestamp,
        chrono::Duration::milliseconds(14 * 500)
    );
}

#[test]
fn test_replayed_log_keeps_recorded_times() {
    let input = std::env::temp_dir().join(format!("wifi-motion-samples-{}.csv", unique_suffix()));
    let mut log = String::from("timestamp,signal,avg,std,motion\n");
    for (i, value) in STEP.iter().enumerate() {
        log.push_str(&format!("2024-03-01T12:00:{i:02}.000000,{value},0,0,0\n"));
    }
    std::fs::write(&input, log).unwrap();

    let (live, view) = LiveHistory::new(100);
    run_replay(
        &step_config(1.0),
        ReplaySource::from_sample_log(&input).unwrap(),
        vec![Box::new(live)],
        16,
        Arc::new(RunStats::new()),
    )
    .unwrap();

    let snap = view.snapshot();
    assert_eq!(snap.events.len(), 2);
    let first = &snap.events[0];
    assert_eq!(format_timestamp(&first.start), "2024-03-01T12:00:05.000000");
    assert_eq!(format_timestamp(&first.end), "2024-03-01T12:00:09.000000");
    assert!((first.duration_secs - 4.0).abs() < 1e-9);

    let _ = std::fs::remove_file(&input);
}

#[test]
fn test_short_burst_is_debounced() {
    let (live, view) = LiveHistory::new(100);
    let config = DetectorConfig {
        min_duration_secs: 10.0,
        ..step_config(0.5)
    };

    // the spike keeps the detector active for the five samples it spends in the window
    let mut values = vec![50u8; 5];
    values.push(80);
    values.extend([50u8; 10]);
    run_replay(
        &config,
        ReplaySource::from_values(values),
        vec![Box::new(live)],
        16,
        Arc::new(RunStats::new()),
    )
    .unwrap();

    let snap = view.snapshot();
    assert_eq!(snap.samples.iter().filter(|s| s.active).count(), 5);
    assert!(snap.samples.iter().all(|s| !s.motion));
    assert!(snap.events.is_empty());
}

fn unique_suffix() -> String {
    format!(
        "{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    )
}
