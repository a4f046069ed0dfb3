/// Builds the progress bar shown while batch commands walk a dataset.
///
/// # Arguments
/// * `len` - Number of series to process.
/// * `label` - Prefix shown left of the bar (e.g. "validate").
///
/// # Returns
/// * `anyhow::Result<ProgressBar>` - Bar ready to be shared across Rayon workers.
pub fn series_bar(len: usize, label: &str) -> anyhow::Result<indicatif::ProgressBar> {
    let bar = indicatif::ProgressBar::new(len as u64);
    bar.set_style(
        indicatif::ProgressStyle::with_template(
            "{prefix:>10} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("##-"),
    );
    bar.set_prefix(label.to_string());
    anyhow::Ok(bar)
}
