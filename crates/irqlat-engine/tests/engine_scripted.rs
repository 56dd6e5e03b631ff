//! State machine tests against the scripted generator.

use irqlat_engine::prelude::*;
use irqlat_engine::{EngineState, ErrorCategory, LAT_MAX_US};
use irqlat_hw::{
    ControlWord, DEVICE_MAGIC, FailurePoint, GENERATOR_IRQ_BIT, JournalEntry, Register,
    ScriptedEvent, ScriptedPlatform,
};
use std::time::Duration;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const FCLK: u32 = 100_000_000;

fn config(limit: u64) -> Result<EngineConfig, irqlat_engine::ConfigError> {
    EngineConfig::builder()
        .irq_count_limit(limit)
        .wait_timeout(Duration::from_millis(1))
        .build()
}

fn run(platform: &ScriptedPlatform, config: EngineConfig) -> EngineResult<Measurement> {
    let mut engine = LatencyEngine::new(platform.clone(), config, StopToken::new())?;
    engine.run(LatencyHistogram::new())
}

fn sample(latency_us: u32) -> ScriptedEvent {
    // 100 ticks per microsecond.
    ScriptedEvent::Sample {
        start: 1_000,
        now: 1_000 + latency_us * 100,
    }
}

fn start_word() -> u32 {
    ControlWord::start(FCLK / 1000).map_or(0, ControlWord::encode)
}

#[test]
fn test_budget_counts_every_wakeup() -> TestResult {
    let platform = ScriptedPlatform::new().with_events([
        sample(5),
        ScriptedEvent::Timeout,
        ScriptedEvent::Fired(0),
        ScriptedEvent::Fired(1 << 4),
        sample(7),
        sample(99),
    ]);
    let measurement = run(&platform, config(5)?)?;
    let stats = measurement.statistics;

    assert_eq!(stats.irq_count, 5);
    assert_eq!(stats.irq_sampled, 2);
    assert_eq!(stats.irq_missed, 0);
    assert_eq!(measurement.histogram.count(5), 1);
    assert_eq!(measurement.histogram.count(7), 1);
    assert_eq!(measurement.histogram.count(99), 0);
    assert_eq!(platform.remaining_events(), 1);
    assert_eq!(platform.waits(), 5);
    Ok(())
}

#[test]
fn test_histogram_total_plus_missed_equals_matched() -> TestResult {
    let over = ScriptedEvent::Sample {
        start: 0,
        now: FCLK * 2,
    };
    let last_bucket = ScriptedEvent::Sample {
        start: 0,
        now: u32::try_from(LAT_MAX_US - 1)? * 100,
    };
    let exactly_max = ScriptedEvent::Sample {
        start: 0,
        now: u32::try_from(LAT_MAX_US)? * 100,
    };
    let platform = ScriptedPlatform::new().with_events([
        sample(3),
        over,
        ScriptedEvent::Timeout,
        last_bucket,
        exactly_max,
        sample(3),
    ]);
    let measurement = run(&platform, config(6)?)?;
    let stats = measurement.statistics;

    assert_eq!(stats.irq_sampled, 5);
    assert_eq!(stats.irq_missed, 2);
    assert_eq!(measurement.histogram.count(LAT_MAX_US - 1), 1);
    assert_eq!(measurement.histogram.total() + stats.irq_missed, stats.irq_sampled);
    Ok(())
}

#[test]
fn test_wraparound_sample() -> TestResult {
    // 16 ticks across the wrap at 1 MHz is 16 us.
    let platform = ScriptedPlatform::new()
        .with_fclk(1_000_000)
        .with_events([ScriptedEvent::Sample {
            start: u32::MAX - 10,
            now: 5,
        }]);
    let measurement = run(&platform, config(1)?)?;
    assert_eq!(measurement.histogram.count(16), 1);
    assert_eq!(measurement.divider, 1000);
    Ok(())
}

#[test]
fn test_clean_run_journal() -> TestResult {
    let platform = ScriptedPlatform::new().with_events([sample(1)]);
    run(&platform, config(1)?)?;

    assert_eq!(
        platform.journal(),
        vec![
            JournalEntry::ForwardingEnabled,
            JournalEntry::InterruptsOpened,
            JournalEntry::MaskChanged {
                bits: GENERATOR_IRQ_BIT,
                enabled: true
            },
            JournalEntry::RegistersOpened,
            JournalEntry::RegisterWritten {
                reg: Register::Control,
                value: start_word()
            },
            JournalEntry::RegisterWritten {
                reg: Register::Control,
                value: 0
            },
            JournalEntry::RegistersClosed,
            JournalEntry::MaskChanged {
                bits: GENERATOR_IRQ_BIT,
                enabled: false
            },
            JournalEntry::InterruptsClosed,
        ]
    );
    assert_eq!(platform.control(), ControlWord::STOP);
    Ok(())
}

#[test]
fn test_identity_mismatch_never_starts_generator() -> TestResult {
    let platform = ScriptedPlatform::new().with_magic(0x1234_5678);
    let err = match run(&platform, config(1)?) {
        Err(e) => e,
        Ok(_) => return Err("run with wrong magic succeeded".into()),
    };

    assert!(matches!(
        err,
        EngineError::IdentityMismatch {
            found: 0x1234_5678,
            expected: DEVICE_MAGIC
        }
    ));
    assert_eq!(err.category(), ErrorCategory::DeviceIdentity);
    assert_eq!(
        platform.journal(),
        vec![
            JournalEntry::ForwardingEnabled,
            JournalEntry::InterruptsOpened,
            JournalEntry::MaskChanged {
                bits: GENERATOR_IRQ_BIT,
                enabled: true
            },
            JournalEntry::RegistersOpened,
            JournalEntry::RegistersClosed,
            JournalEntry::MaskChanged {
                bits: GENERATOR_IRQ_BIT,
                enabled: false
            },
            JournalEntry::InterruptsClosed,
        ]
    );
    Ok(())
}

#[test]
fn test_unsatisfiable_frequency() -> TestResult {
    let config = EngineConfig::builder().irq_frequency_hz(2_000).build()?;
    let platform = ScriptedPlatform::new().with_fclk(1_000);
    let err = run(&platform, config).err().ok_or("expected failure")?;
    assert_eq!(err.category(), ErrorCategory::Frequency);

    // Divider wider than 24 bits.
    let config = EngineConfig::builder().irq_frequency_hz(1).build()?;
    let platform = ScriptedPlatform::new().with_fclk(FCLK);
    let err = run(&platform, config).err().ok_or("expected failure")?;
    assert!(matches!(
        err,
        EngineError::UnsatisfiableFrequency {
            fclk_hz: FCLK,
            requested_hz: 1
        }
    ));

    // Zero clock.
    let platform = ScriptedPlatform::new().with_fclk(0);
    let err = run(&platform, EngineConfig::default()).err().ok_or("expected failure")?;
    assert_eq!(err.category(), ErrorCategory::Frequency);
    assert!(
        !platform
            .journal()
            .iter()
            .any(|e| matches!(e, JournalEntry::RegisterWritten { .. }))
    );
    Ok(())
}

#[test]
fn test_wait_fault_stops_started_generator() -> TestResult {
    let platform = ScriptedPlatform::new().with_events([sample(2), ScriptedEvent::Fault]);
    let err = run(&platform, config(0)?).err().ok_or("expected failure")?;

    assert!(matches!(err, EngineError::Wait(_)));
    assert_eq!(err.category(), ErrorCategory::DeviceFault);
    let journal = platform.journal();
    let tail = journal.get(journal.len().saturating_sub(4)..).unwrap_or_default();
    assert_eq!(
        tail,
        [
            JournalEntry::RegisterWritten {
                reg: Register::Control,
                value: 0
            },
            JournalEntry::RegistersClosed,
            JournalEntry::MaskChanged {
                bits: GENERATOR_IRQ_BIT,
                enabled: false
            },
            JournalEntry::InterruptsClosed,
        ]
    );
    Ok(())
}

#[test]
fn test_open_failures_release_only_acquired() -> TestResult {
    let platform = ScriptedPlatform::new().failing_at(FailurePoint::Forwarding);
    assert!(run(&platform, config(1)?).is_err());
    assert!(platform.journal().is_empty());

    let platform = ScriptedPlatform::new().failing_at(FailurePoint::OpenInterrupts);
    assert!(run(&platform, config(1)?).is_err());
    assert_eq!(platform.journal(), vec![JournalEntry::ForwardingEnabled]);

    let platform = ScriptedPlatform::new().failing_at(FailurePoint::SetMask);
    assert!(run(&platform, config(1)?).is_err());
    assert_eq!(
        platform.journal(),
        vec![
            JournalEntry::ForwardingEnabled,
            JournalEntry::InterruptsOpened,
            JournalEntry::InterruptsClosed,
        ]
    );

    let platform = ScriptedPlatform::new().failing_at(FailurePoint::OpenRegisters);
    let err = run(&platform, config(1)?).err().ok_or("expected failure")?;
    assert_eq!(err.category(), ErrorCategory::DeviceFault);
    assert_eq!(
        platform.journal(),
        vec![
            JournalEntry::ForwardingEnabled,
            JournalEntry::InterruptsOpened,
            JournalEntry::MaskChanged {
                bits: GENERATOR_IRQ_BIT,
                enabled: true
            },
            JournalEntry::MaskChanged {
                bits: GENERATOR_IRQ_BIT,
                enabled: false
            },
            JournalEntry::InterruptsClosed,
        ]
    );
    Ok(())
}

#[test]
fn test_stop_token_drains_unbounded_run() -> TestResult {
    let platform = ScriptedPlatform::new().with_wait_delay(Duration::from_millis(1));
    let stop = StopToken::new();
    let mut engine = LatencyEngine::new(platform.clone(), config(0)?, stop.clone())?;

    let worker = std::thread::spawn(move || {
        let result = engine.run(LatencyHistogram::new());
        (result, engine.state())
    });
    std::thread::sleep(Duration::from_millis(30));
    assert!(!worker.is_finished(), "unbounded run drained without a stop signal");

    stop.request_stop();
    let Ok((result, state)) = worker.join() else {
        return Err("engine thread panicked".into());
    };
    let measurement = result?;
    assert_eq!(state, EngineState::Done);
    assert!(measurement.statistics.irq_count >= 1);
    assert_eq!(measurement.statistics.irq_count, platform.waits());
    assert_eq!(platform.control(), ControlWord::STOP);
    Ok(())
}

#[test]
fn test_stop_raised_before_run_takes_one_wakeup() -> TestResult {
    let platform = ScriptedPlatform::new();
    let stop = StopToken::new();
    stop.request_stop();
    let mut engine = LatencyEngine::new(platform.clone(), config(0)?, stop)?;
    let measurement = engine.run(LatencyHistogram::new())?;
    assert_eq!(measurement.statistics.irq_count, 1);
    Ok(())
}

#[test]
fn test_cross_check_reads_count_register() -> TestResult {
    let platform =
        ScriptedPlatform::new().with_events([sample(1), sample(2), ScriptedEvent::Timeout]);
    let checked = EngineConfig::builder()
        .irq_count_limit(3)
        .cross_check(true)
        .build()?;
    let measurement = run(&platform, checked)?;
    assert_eq!(measurement.statistics.irq_generated, Some(2));

    let platform = ScriptedPlatform::new().with_events([sample(1)]);
    let measurement = run(&platform, config(1)?)?;
    assert_eq!(measurement.statistics.irq_generated, None);
    Ok(())
}

#[test]
fn test_invalid_config_rejected_before_device_access() {
    let platform = ScriptedPlatform::new();
    let config = EngineConfig {
        irq_frequency_hz: 0,
        ..EngineConfig::default()
    };
    let result = LatencyEngine::new(platform.clone(), config, StopToken::new());
    assert!(matches!(result, Err(EngineError::Config(_))));
    assert!(platform.journal().is_empty());
}

#[test]
fn test_finished_engine_does_not_run_again() -> TestResult {
    let platform = ScriptedPlatform::new().with_events([sample(4), sample(6)]);
    let mut engine = LatencyEngine::new(platform.clone(), config(1)?, StopToken::new())?;
    let first = engine.run(LatencyHistogram::new())?;
    assert_eq!(first.histogram.count(4), 1);
    assert_eq!(engine.state(), EngineState::Done);
    let journal = platform.journal();

    let second = engine.run(LatencyHistogram::new());
    assert!(matches!(second, Err(EngineError::AlreadyFinished)));
    assert_eq!(engine.state(), EngineState::Done);
    assert_eq!(platform.journal(), journal);
    assert_eq!(platform.remaining_events(), 1);
    Ok(())
}

#[test]
fn test_failed_engine_does_not_run_again() -> TestResult {
    let platform = ScriptedPlatform::new().with_magic(0);
    let mut engine = LatencyEngine::new(platform.clone(), config(1)?, StopToken::new())?;
    assert!(engine.run(LatencyHistogram::new()).is_err());
    let journal = platform.journal();

    let err = engine
        .run(LatencyHistogram::new())
        .err()
        .ok_or("second run succeeded")?;
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(platform.journal(), journal);
    Ok(())
}
