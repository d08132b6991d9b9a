use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

fn bar_style(color: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(&format!(
            "{{spinner:.{}}} [{{elapsed_precise}}] {{msg:>50}}",
            color
        ))
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// One spinner line per downloaded document.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
    doc_name: String,
}

impl ProgressTracker {
    pub fn new(multi_progress: Option<&Arc<MultiProgress>>, doc_name: &str) -> Self {
        let progress_bar = multi_progress.map(|mp| {
            let pb = mp.add(ProgressBar::new_spinner());
            pb.set_style(bar_style("green"));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self {
            progress_bar,
            doc_name: doc_name.to_string(),
        }
    }

    pub fn update_message(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("[{}] {}", self.doc_name, message));
        }
    }

    pub fn finish(&self, mark: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_style(bar_style("blue"));
            pb.finish_with_message(format!("[{}] {}", self.doc_name, mark));
        }
    }
}
