use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use solarwatch_core::random;
use solarwatch_core::{AlertStatus, Dashboard, DashboardView, Sample};

use super::ApiArgs;

/// How often the loop checks for Ctrl+C and the deadline.
const CHECK_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: &ApiArgs, duration: Option<f64>, stream_interval: Option<f64>) {
    let mut config = super::config_or_exit(args);
    if let Some(secs) = stream_interval {
        config.stream_interval = super::parse_secs(secs, "--stream-interval").unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });
    }
    let max_duration = duration.map(|secs| {
        super::parse_secs(secs, "--duration").unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        })
    });
    let client = super::client_or_exit(&config);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)) {
        eprintln!("Error setting Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    println!("Watching {}", config.api_base);
    println!(
        "  Flux every {:?}, telemetry every {:?}, alert check every {:?}",
        config.stream_interval, config.snapshot_interval, config.alert_check_interval
    );
    match max_duration {
        Some(d) => println!("  Duration: {}s", d.as_secs_f64()),
        None => println!("  Press Ctrl+C to stop"),
    }
    println!();

    let rt = super::runtime_or_exit();
    let view = rt.block_on(async move {
        let dashboard = Dashboard::start_with(config, client, random::seeded(args.seed), None);
        let mut flux = dashboard.flux_updates();
        let mut alerts = dashboard.alert_updates();
        let mut last_alert = *alerts.borrow();
        let started = Instant::now();
        let mut tick = tokio::time::interval(CHECK_INTERVAL);

        loop {
            tokio::select! {
                Ok(()) = flux.changed() => {
                    let view = dashboard.view();
                    if let (Some(sample), Some(label)) = (view.stream.last(), view.flux_display()) {
                        print_sample(sample, &label);
                    }
                }
                Ok(()) = alerts.changed() => {
                    let status = *alerts.borrow_and_update();
                    if status.state != last_alert.state {
                        print_alert(&status);
                    }
                    last_alert = status;
                }
                _ = tick.tick() => {
                    let expired = max_duration.is_some_and(|d| started.elapsed() >= d);
                    if expired || !running.load(Ordering::SeqCst) {
                        break;
                    }
                }
            }
        }

        dashboard.teardown();
        dashboard.view()
    });

    print_summary(&view);
}

fn print_sample(sample: &Sample, label: &str) {
    println!(
        "{}  {:<7} {:.3e} W/m²",
        sample.timestamp.format("%H:%M:%S"),
        label,
        sample.value
    );
}

fn print_alert(status: &AlertStatus) {
    if status.state.is_active() {
        println!(
            "  ⚠ FLARE ALERT (draw {:.3}, #{})",
            status.last_draw.unwrap_or_default(),
            status.activations
        );
    } else {
        println!("  alert cleared");
    }
}

fn print_summary(view: &DashboardView) {
    println!();
    println!("Stopped.");
    println!("  Samples held:  {}", view.stream.len());
    println!("  Alert checks:  {}", view.alert.checks);
    println!("  Alerts raised: {}", view.alert.activations);
    if let Some(t) = &view.telemetry {
        println!(
            "  Telemetry:     {} events, {} active regions ({})",
            t.live_events.len(),
            t.region_count(),
            t.source.as_deref().unwrap_or("unknown source")
        );
    }
}
