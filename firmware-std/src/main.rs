//! macsniff — ESP-IDF std firmware
//!
//! Brings the WiFi driver up in promiscuous mode, then hands the UART
//! console to the operator loop: enter a target address, sniff, stop,
//! repeat. Matches are reported through a bounded queue drained by its own
//! thread; a status heartbeat is emitted every 30 s.

mod radio;

use std::io::{self, BufReader, Read};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::esp_get_free_heap_size;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use macsniff::board;
use macsniff::capture::CaptureContext;
use macsniff::config::CaptureConfig;
use macsniff::control::ControlLoop;
use macsniff::protocol::{encode, DeviceMessage, VERSION};
use macsniff::queue::{QueuedReporter, DEFAULT_QUEUE_DEPTH};
use macsniff::radio::Radio;
use macsniff::report::Reporter;
use macsniff::session::CaptureSession;

use radio::EspRadio;

/// Seconds between status heartbeats
const STATUS_INTERVAL_SECS: u64 = 30;

/// Console polling interval while no input is pending
const CONSOLE_POLL_MS: u64 = 20;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();

    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    let boot = Instant::now();
    log::info!(
        "macsniff v{} starting on {} ({}, psram: {})",
        VERSION,
        board::BOARD_NAME,
        board::CHIP,
        board::HAS_PSRAM
    );

    let config = load_config()?;
    log::info!(
        "Sweep plan: channels {:?}, {} ms dwell, filter mask {:#x}",
        config.channels.as_slice(),
        config.dwell_ms,
        config.filter_mask.bits()
    );

    // ── WiFi driver ──────────────────────────────────────────────────

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    let radio = Arc::new(EspRadio::new(wifi));
    radio.init().context("WiFi driver failed to start")?;

    // ── Reporting ────────────────────────────────────────────────────

    let reporter: Arc<dyn Reporter> = Arc::new(QueuedReporter::spawn(sink(), DEFAULT_QUEUE_DEPTH)?);
    log::info!("Report thread spawned");

    let session = CaptureSession::new(radio, reporter);

    // ── Status thread ────────────────────────────────────────────────

    let ctx = session.context();
    thread::Builder::new()
        .name("status".into())
        .stack_size(4096)
        .spawn(move || status_thread(ctx, boot))?;
    log::info!("Status thread spawned");

    // ── Operator console (main thread) ───────────────────────────────

    let mut input = BufReader::new(ConsoleInput(io::stdin()));
    let mut output = io::stdout();
    let mut control = ControlLoop::new(session, config);
    control.run(&mut input, &mut output)?;

    log::info!("Operator ended sniffing");
    Ok(())
}

/// Defaults, overridden by the JSON document in `MACSNIFF_CONFIG` when the
/// firmware was built with one.
fn load_config() -> anyhow::Result<CaptureConfig> {
    match option_env!("MACSNIFF_CONFIG") {
        Some(json) => CaptureConfig::from_json(json.as_bytes()).context("invalid MACSNIFF_CONFIG"),
        None => Ok(CaptureConfig::default()),
    }
}

#[cfg(feature = "ndjson")]
fn sink() -> impl Reporter + 'static {
    macsniff::protocol::NdjsonReporter::new(io::stdout())
}

#[cfg(not(feature = "ndjson"))]
fn sink() -> impl Reporter + 'static {
    macsniff::report::LogReporter
}

/// Blocking reader over the UART console. ESP-IDF's stdin returns
/// immediately when no byte is pending; poll until one arrives.
struct ConsoleInput(io::Stdin);

impl Read for ConsoleInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.0.read(buf) {
                Ok(0) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                other => return other,
            }
            thread::sleep(Duration::from_millis(CONSOLE_POLL_MS));
        }
    }
}

// ── Status thread ────────────────────────────────────────────────────

fn status_thread(ctx: Arc<CaptureContext>, boot: Instant) {
    loop {
        thread::sleep(Duration::from_secs(STATUS_INTERVAL_SECS));

        let heap_free = unsafe { esp_get_free_heap_size() };

        let msg = DeviceMessage::Status {
            capturing: ctx.state().is_running(),
            count: ctx.counter().get(),
            uptime: boot.elapsed().as_secs() as u32,
            heap_free,
            board: board::BOARD_NAME,
            version: VERSION,
        };

        if let Some(buf) = encode(&msg) {
            if let Ok(s) = std::str::from_utf8(&buf) {
                log::info!("{}", s.trim_end());
            }
        }
    }
}
