use std::time::Duration;

use clap::Parser;
use proxy_probe::{ProbeClient, ProbeReport};

#[derive(Parser)]
#[command(name = "probe-cli")]
#[command(about = "Test a proxy against a proxy-probe endpoint", long_about = None)]
struct Cli {
    /// Diagnostic endpoint URL.
    #[arg(short, long, default_value = "http://localhost:8080/")]
    endpoint: String,

    /// HTTP proxy to go through (host:port or URL). Direct when omitted.
    #[arg(short, long)]
    proxy: Option<String>,

    /// Give up after this many seconds.
    #[arg(short, long, default_value_t = 10)]
    timeout_secs: u64,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);

    let client = match &cli.proxy {
        Some(proxy) => ProbeClient::with_proxy(&cli.endpoint, proxy, timeout)?,
        None => ProbeClient::new(&cli.endpoint, timeout)?,
    };

    let report = client.probe().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &ProbeReport) {
    let response = &report.response;
    println!("anonymity:     {}", response.anonymity_level);
    println!("speed:         {} ({:.1} ms round trip)", report.speed, report.round_trip_ms);
    println!("seen as:       {}", response.connecting_ip);
    println!("client guess:  {}", response.client_ip_from_headers);
    println!("server time:   {:.3} ms", response.server_processing_latency_ms);
}
