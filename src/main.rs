use defi_series::{cache, cli, dataset, model, quality, render, stats, utils, view, window};

/// Main entry point of the application.
///
/// 1. Initializes logging.
/// 2. Parses command-line arguments.
/// 3. Loads the token and pool datasets (missing files become empty datasets).
/// 4. Runs the selected subcommand.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if any step fails.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("defi_series=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();

    let (tokens, token_reports) = dataset::load_dataset_or_empty(&args.tokens, model::SeriesKind::Token);
    let (pools, pool_reports) = dataset::load_dataset_or_empty(&args.pools, model::SeriesKind::Pool);

    match &args.command {
        cli::Command::List => {
            println!("🪙 Tokens ({})", args.tokens.display());
            render::print_series_list(&tokens);
            println!("💧 Pools ({})", args.pools.display());
            render::print_series_list(&pools);
            render::print_load_reports(token_reports.iter().chain(&pool_reports));
        }
        cli::Command::Show {
            series,
            windows,
            as_of,
            csv,
            rows,
        } => {
            let today = as_of.unwrap_or_else(utils::today_utc);
            show(&args, &tokens, &pools, series, windows, today, csv.as_deref(), *rows)?;
        }
        cli::Command::Compare {
            series,
            window: selected,
            as_of,
            rows,
        } => {
            let today = as_of.unwrap_or_else(utils::today_utc);
            compare(&tokens, &pools, series, *selected, today, *rows);
        }
        cli::Command::Validate => {
            let all_valid = run_batch(args.threads, || validate(&tokens, &pools))?;
            if !all_valid {
                println!("❌ GAPS DETECTED - run `fill` to forward-fill missing days");
                std::process::exit(1);
            }
            println!("✅ ALL DATA VALIDATED - NO GAPS FOUND");
        }
        cli::Command::Fill { kind, output } => {
            let source = match kind {
                model::SeriesKind::Token => &tokens,
                model::SeriesKind::Pool => &pools,
            };
            if source.is_empty() {
                return Err(anyhow::anyhow!("No {} series loaded, nothing to fill", kind));
            }
            let (filled, count) = run_batch(args.threads, || quality::fill_dataset(source))?;
            dataset::write_dataset(&filled, output)?;
            println!(
                "✅ Filled {} missing days across {} series -> {}",
                count,
                filled.len(),
                output.display()
            );
        }
    }

    tracing::debug!(elapsed = ?total_start.elapsed(), "Done");
    Ok(())
}

/// Runs a batch job on a dedicated pool when `--threads` is set, otherwise
/// on Rayon's global pool.
fn run_batch<T, F>(threads: Option<usize>, job: F) -> anyhow::Result<T>
where
    T: Send,
    F: FnOnce() -> anyhow::Result<T> + Send,
{
    let n = utils::effective_threads(threads)?;
    tracing::info!("Using {} thread(s)", n);
    if threads.is_some() {
        let local_pool = utils::configure_thread_pool(n)?;
        local_pool.install(job)
    } else {
        job()
    }
}

fn validate(tokens: &model::Dataset, pools: &model::Dataset) -> anyhow::Result<bool> {
    let mut all_valid = true;
    for (title, dataset) in [("TOKEN DATA VALIDATION:", tokens), ("POOL DATA VALIDATION:", pools)] {
        println!("{}", title);
        let reports = quality::validate_dataset(dataset)?;
        if reports.is_empty() {
            println!("  (no series)");
        }
        for (id, report) in &reports {
            render::print_gap_report(id, report);
            all_valid &= report.is_complete();
        }
    }
    anyhow::Ok(all_valid)
}

/// Renders every requested (series, window) pair.
///
/// One reduction cache serves the whole command, so a pair requested twice
/// is reduced once.
#[allow(clippy::too_many_arguments)]
fn show(
    args: &cli::Args,
    tokens: &model::Dataset,
    pools: &model::Dataset,
    series_ids: &[String],
    windows: &[window::TimeWindow],
    today: chrono::NaiveDate,
    csv: Option<&std::path::Path>,
    rows: usize,
) -> anyhow::Result<()> {
    if csv.is_some() && (series_ids.len() != 1 || windows.len() != 1) {
        return Err(anyhow::anyhow!("--csv needs exactly one --series and at most one --window"));
    }

    let settings = view::ViewSettings {
        today,
        density: args.density,
        ttl: args.cache_ttl,
    };
    let mut reductions: view::ReductionCache = cache::TtlCache::new();

    for id in series_ids {
        let Some((dataset, source)) = [tokens, pools]
            .into_iter()
            .find_map(|d| d.get(id).map(|s| (d, s)))
        else {
            println!("⚠️ No data available for {}", id);
            continue;
        };
        let mut windowed = view::WindowedView::new(dataset, &mut reductions, settings);
        for &selected in windows {
            let shown = windowed.series(id, selected)?;
            let in_window = window::reduce(&source.points, selected, today);
            let summary = stats::summarize(source.kind, &in_window);

            render::print_summary(source, selected, shown.len(), summary.as_ref());
            render::print_rows(source.kind, &shown, rows);
            println!();

            if let Some(path) = csv {
                render::export_csv(path, &shown)?;
                println!("📄 Wrote {} rows to {}", shown.len(), path.display());
            }
        }
    }
    anyhow::Ok(())
}

/// Prints the requested series rebased to 100 on their first shared day.
///
/// Each series is cut to the same window first. Unknown ids are reported
/// and left out of the table.
fn compare(
    tokens: &model::Dataset,
    pools: &model::Dataset,
    series_ids: &[String],
    selected: window::TimeWindow,
    today: chrono::NaiveDate,
    rows: usize,
) {
    let mut labels = Vec::with_capacity(series_ids.len());
    let mut windowed = Vec::with_capacity(series_ids.len());
    for id in series_ids {
        let Some(source) = tokens.get(id).or_else(|| pools.get(id)) else {
            println!("⚠️ No data available for {}", id);
            continue;
        };
        labels.push(source.label());
        windowed.push((source.kind, window::reduce(&source.points, selected, today)));
    }

    let columns: Vec<(model::SeriesKind, &[model::TimeSeriesPoint])> =
        windowed.iter().map(|(kind, points)| (*kind, points.as_slice())).collect();
    match stats::rebase_to_100(&columns) {
        Some(comparison) => render::print_comparison(&labels, selected, &comparison, rows),
        None => println!("⚠️ No common date for the selected series in window {}", selected),
    }
}
