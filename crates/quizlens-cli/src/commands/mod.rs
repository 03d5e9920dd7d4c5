pub mod analyze;
pub mod extract_topics;
pub mod init;
pub mod student;
pub mod validate;

/// Check a threshold given on the command line. Percentages are not
/// clamped, so values above 100 or below 0 are allowed.
pub fn check_threshold(threshold: f64) -> anyhow::Result<()> {
    anyhow::ensure!(
        threshold.is_finite(),
        "threshold must be a finite number, got {threshold}"
    );
    Ok(())
}
