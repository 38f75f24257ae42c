use solarwatch_core::{MetricsView, ModelMetrics, load_metrics};

use super::ApiArgs;

pub fn run(args: &ApiArgs, json: bool, no_fallback: bool) {
    let config = super::config_or_exit(args);
    let client = super::client_or_exit(&config);
    let rt = super::runtime_or_exit();

    let allow_fallback = config.metrics_fallback && !no_fallback;
    let view = rt.block_on(load_metrics(client.as_ref(), allow_fallback));

    if json {
        match serde_json::to_string_pretty(&view) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    } else {
        match &view {
            MetricsView::Ready { metrics } => print_metrics(metrics),
            MetricsView::Degraded { metrics, note } => {
                println!("{note}; showing last-known-good values");
                println!();
                print_metrics(metrics);
            }
            MetricsView::Unavailable { message } => eprintln!("Error: {message}"),
            MetricsView::Loading => {}
        }
    }

    if view.is_unavailable() {
        std::process::exit(1);
    }
}

fn print_metrics(m: &ModelMetrics) {
    println!("Model performance");
    println!("  Model:     {}", m.model_type);
    println!("  Trained:   {}", m.training_date);
    println!("  Features:  {}", m.features_used);
    if let Some(n) = m.significant_event_count {
        println!("  Events:    {n} significant");
    }
    println!();
    println!("  {:<10} {:>6}", "metric", "value");
    for (name, value) in [
        ("accuracy", m.accuracy),
        ("precision", m.precision),
        ("recall", m.recall),
        ("f1", m.f1),
        ("auc-roc", m.auc_roc),
    ] {
        println!("  {name:<10} {:>5.1}%", value * 100.0);
    }
}
