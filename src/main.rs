//! DNA Dilution Calculator
//!
//! An MCP server for planning DNA dilutions.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use dna_dilution::config::ServiceConfig;
use dna_dilution::mcp::DilutionService;
use dna_dilution::tools::status::print_startup_banner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr so it does not interfere with MCP stdio
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dna_dilution=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = ServiceConfig::from_env();
    match &config.chart_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            eprintln!("Chart directory: {}", dir.display());
        }
        None => eprintln!("Chart directory: (not set, charts returned inline only)"),
    }
    tracing::info!(
        "Chart size {}x{}, render pacing {} ms",
        config.chart_width,
        config.chart_height,
        config.render_pacing.as_millis()
    );

    let service = DilutionService::new(config);

    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
