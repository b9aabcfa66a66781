use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use clap::Parser;
use log::{error, info, warn};
use vna_capture::{
    create_transport, parse_freq_hz, CaptureConfig, DeviceKind, MeasurementSession, SystemClock,
};

#[derive(Parser, Debug)]
#[command(
    name = "vna-capture",
    version = env!("CARGO_PKG_VERSION"),
    about = "Measure S-parameters with an S-A-A-2 / NanoVNA V2 over serial",
    long_about = None,
)]
struct Cli {
    /// Устройство: serial, sim
    #[arg(short, long)]
    device: Option<String>,
    /// Последовательный порт (/dev/ttyACM0, COM3)
    #[arg(short, long)]
    port: Option<String>,
    /// Скорость порта, бод
    #[arg(short, long)]
    baud: Option<u32>,
    /// Начало развёртки (1MHz, 1000000)
    #[arg(long)]
    start: Option<String>,
    /// Конец развёртки (100MHz, 1.5GHz)
    #[arg(long)]
    stop: Option<String>,
    /// Кол-во точек развёртки
    #[arg(short = 'n', long)]
    points: Option<u16>,
    /// Максимум чтений FIFO
    #[arg(long)]
    attempts: Option<u32>,
    /// Байт в одном чтении FIFO
    #[arg(long)]
    block_size: Option<u16>,
    /// Пауза после очистки FIFO (мс)
    #[arg(long)]
    fifo_settle_ms: Option<u64>,
    /// JSON-файл конфигурации (флаги имеют приоритет)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Вывести измерение в stdout как JSON
    #[arg(long)]
    json: bool,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    error!("{msg}");
    std::process::exit(1);
}

fn build_config(cli: &Cli) -> CaptureConfig {
    let mut config = match &cli.config {
        Some(path) => CaptureConfig::from_json_file(path)
            .unwrap_or_else(|e| fail(format!("--config {}: {e}", path.display()))),
        None => CaptureConfig::default(),
    };

    if let Some(d) = &cli.device {
        config.device = d
            .parse::<DeviceKind>()
            .unwrap_or_else(|e| fail(e));
    }
    if let Some(p) = &cli.port {
        config.port = p.clone();
    }
    if let Some(b) = cli.baud {
        config.baud_rate = b;
    }
    if let Some(s) = &cli.start {
        config.start_hz = parse_freq_hz(s).unwrap_or_else(|e| fail(format!("--start: {e}")));
    }
    if let Some(s) = &cli.stop {
        config.stop_hz = parse_freq_hz(s).unwrap_or_else(|e| fail(format!("--stop: {e}")));
    }
    if let Some(n) = cli.points {
        config.points = n;
    }
    if let Some(a) = cli.attempts {
        config.max_attempts = a;
    }
    if let Some(b) = cli.block_size {
        config.fifo_block_bytes = b;
    }
    if let Some(ms) = cli.fifo_settle_ms {
        config.fifo_settle_ms = ms;
    }

    config
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    // stdout занят JSON, поэтому логи всегда идут в stderr
    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs()
        .target(env_logger::Target::Stderr)
        .init();

    let config = build_config(&cli);

    let (session, metrics) = match MeasurementSession::new(config.clone()) {
        Ok(s) => s,
        Err(e) => fail(e),
    };

    let stop_flag: Arc<AtomicBool> = session.stop_flag();
    let stop_ctrlc = stop_flag.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if stop_ctrlc.swap(true, Ordering::SeqCst) {
            // Второй Ctrl+C: принудительный выход
            warn!("Force exit");
            std::process::exit(130);
        }
        warn!("Ctrl+C received, finishing current FIFO read...");
    }) {
        warn!("Failed to set Ctrl+C handler: {e}");
    }

    let sweep = session.sweep();

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Device        : {}", config.device);
    if config.device == DeviceKind::Serial {
        info!("  Port          : {} @ {} baud", config.port, config.baud_rate);
    }
    info!("  Start         : {:.3} MHz", sweep.start_hz() as f64 / 1e6);
    info!("  Stop          : {:.3} MHz", sweep.stop_hz() as f64 / 1e6);
    info!("  Points        : {}", sweep.points());
    info!("  Step          : {} Hz", sweep.step_hz());
    info!(
        "  FIFO          : {} × {} B",
        config.max_attempts, config.fifo_block_bytes
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let transport = match create_transport(&config) {
        Ok(t) => t,
        Err(e) => fail(format!("Failed to open device: {e}")),
    };

    let session_start = Instant::now();

    let report = match session.run(transport, Box::new(SystemClock)) {
        Ok(r) => r,
        Err(e) => fail(format!("Measurement failed: {e}")),
    };

    // --- Итоговая статистика ---
    info!("\n{}", metrics.summary(&session_start));
    info!("\n{}", report.measurement.summary());

    if report.decode.records_skipped > 0 {
        warn!(
            "⚠ {} records could not be decoded and were skipped",
            report.decode.records_skipped
        );
    }

    if !report.is_complete() {
        warn!(
            "⚠ Incomplete sweep: {} of {} points ({:.1}%). Consider: more --attempts or a longer --fifo-settle-ms",
            report.captured_points(),
            report.requested_points,
            report.completeness_pct()
        );
    }

    if cli.json {
        match serde_json::to_string_pretty(&report.measurement) {
            Ok(s) => println!("{s}"),
            Err(e) => fail(format!("JSON encoding failed: {e}")),
        }
    }

    info!("✓ Measurement complete: {} points", report.captured_points());
}
