use clap::Parser;
use protection_audit::config::{Cli, Config};
use protection_audit::render::write_report;
use protection_audit::{run_audit, GitHubSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("AUDIT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Config::resolve(cli)?;
    let source = GitHubSource::with_token(config.token.clone())?;

    let report = run_audit(&source, &config.audit).await?;
    let written = write_report(&report, config.format, &config.render, &config.output_dir)?;
    for path in &written {
        info!(path = %path.display(), "Wrote report");
    }

    println!(
        "Audited {} repo(s) on branch {}: {} ruleset row(s), written to {}",
        report.classic_rows.len(),
        report.branch,
        report.ruleset_rows.len(),
        config.output_dir.display()
    );

    Ok(())
}
