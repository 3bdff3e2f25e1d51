use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over the annotation files of a run; `{msg}` shows the file
/// currently being converted. Nothing is drawn for an empty run.
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    if len == 0 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
                label
            ))
            .progress_chars("#>-"),
    );
    pb
}
