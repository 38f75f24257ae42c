use solarwatch_core::animation::{default_regions, render};

pub fn run(at: f64) {
    if !at.is_finite() {
        eprintln!("Error: --at must be a finite number of seconds");
        std::process::exit(1);
    }
    let frame = render(at, &default_regions());
    match serde_json::to_string_pretty(&frame) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
