use anyhow::{Context, Result};
use tracing::info;

use history_sessions::{
    cli,
    config,
    logging,
    metadata::{self, ReportLimits, RunContext, RunSummary},
    parsers::{browser::BrowserKind, sqlite_db},
    pipeline::{self, AnalysisOptions},
    util,
};

fn main() -> Result<()> {
    let cli_opts = cli::parse();
    logging::init_logging(cli_opts.log_json);

    let loaded = config::load_config(cli_opts.config_path.as_deref())?;
    let mut cfg = loaded.config;
    util::apply_cli_overrides(&mut cfg, &cli_opts);
    config::validate(&cfg)?;

    let run_output_dir = cli_opts.output.join(&cfg.run_id);
    util::ensure_output_dir(&run_output_dir)?;

    let tool_version = env!("CARGO_PKG_VERSION");
    let kind = BrowserKind::from(cli_opts.browser);

    info!(
        "starting run_id={} input={} browser={} output={} gap_minutes={} workers={}",
        cfg.run_id,
        cli_opts.input.display(),
        kind.label(),
        run_output_dir.display(),
        cfg.gap_minutes,
        cli_opts.workers
    );

    let rows = sqlite_db::load_history(&cli_opts.input, kind, cfg.max_input_rows)
        .with_context(|| format!("reading history from {}", cli_opts.input.display()))?;
    info!("read {} visit rows", rows.len());

    let opts = AnalysisOptions::from_config(&cfg, cli_opts.workers);
    let report = pipeline::analyze(rows, kind, &opts)?;

    let ctx = RunContext {
        run_id: &cfg.run_id,
        tool_version,
        config_hash: &loaded.config_hash,
        browser: kind,
        input_path: &cli_opts.input,
    };
    let summary = RunSummary::new(&ctx, &opts, &report);

    let mut sink = metadata::build_sink(
        util::backend_from_cli(cli_opts.metadata_backend),
        &run_output_dir,
        cli_opts.write_visits,
    )?;
    let limits = ReportLimits {
        include_visits: cli_opts.write_visits,
        top_domains: cfg.top_domains,
        recent_searches: cfg.recent_search_limit,
    };
    metadata::write_report(sink.as_mut(), &report, &summary, limits)?;

    match summary.percent_below_threshold {
        Some(pct) => info!(
            "{pct:.2}% of {} domains had fewer than {} sessions",
            report.threshold.total(),
            cfg.visit_threshold
        ),
        None => info!("no domains to report"),
    }
    info!("history-sessions run finished");
    Ok(())
}
