use super::ApiArgs;

pub fn run(args: &ApiArgs, snapshot_interval: Option<f64>, stream_interval: Option<f64>) {
    let mut config = super::config_or_exit(args);
    let overrides = [
        (snapshot_interval, "--snapshot-interval", &mut config.snapshot_interval),
        (stream_interval, "--stream-interval", &mut config.stream_interval),
    ];
    for (secs, flag, slot) in overrides {
        if let Some(secs) = secs {
            *slot = super::parse_secs(secs, flag).unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                std::process::exit(1);
            });
        }
    }

    let result = crate::tui::app::App::new(config, args.seed).and_then(|mut app| app.run());
    if let Err(e) = result {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
