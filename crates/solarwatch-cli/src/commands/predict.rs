use solarwatch_core::random;
use solarwatch_core::{FallbackGenerator, PredictionRecord, predict_once, random_features};

use super::ApiArgs;

pub fn run(args: &ApiArgs, json: bool) {
    let config = super::config_or_exit(args);
    let client = super::client_or_exit(&config);
    let rt = super::runtime_or_exit();

    let mut rng = random::seeded(args.seed);
    let features = random_features(rng.as_mut());
    let fallback = FallbackGenerator::new(rng);
    let record = rt.block_on(predict_once(client.as_ref(), &fallback, &features));

    if json {
        match serde_json::to_string_pretty(&record) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }
    print_record(&record, config.api_base.as_str());
}

fn print_record(record: &PredictionRecord, api: &str) {
    println!("Flare forecast");
    println!("  Probability: {}", record.percent());
    println!("  Class:       {}", record.flare_class.label());
    println!("  Confidence:  {}", record.confidence.label());
    println!("  Model:       {}", record.model_used);
    println!("  Time:        {}", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    if record.fallback {
        println!("  Source:      local draw ({api} unreachable)");
    } else {
        println!("  Source:      {api}");
    }
}
