use solarwatch_core::api::paths;

pub fn run(host: &str, port: u16, seed: Option<u64>) {
    let base = format!("http://{host}:{port}");

    println!("☀  Solarwatch reference API v{}", solarwatch_core::VERSION);
    println!("   {base}");
    println!();
    println!("   Endpoints:");
    println!("     GET  /                      API index (try: curl {base})");
    println!("     GET  /health                System status");
    println!(
        "     GET  {:<22} Recent events and active region count",
        paths::TELEMETRY_SNAPSHOT
    );
    println!("     GET  {:<22} Latest X-ray flux reading", paths::FLUX_READING);
    println!("     POST {:<22} Flare probability for {{\"features\": [...]}}", paths::PREDICT);
    println!("     GET  {:<22} Model performance metrics", paths::MODEL_METRICS);
    println!();
    println!("   Point the dashboard at it:");
    println!("     solarwatch monitor --api {base}");
    println!();

    let rt = super::runtime_or_exit();
    if let Err(e) = rt.block_on(solarwatch_server::run_server(host, port, seed)) {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
