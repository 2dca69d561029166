use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress display for run-all on stderr. Inert when built disabled.
pub struct ProgressMonitor {
    bars: Option<Bars>,
}

struct Bars {
    multi: MultiProgress,
    tracks_done: ProgressBar,
    running: HashMap<String, ProgressBar>,
}

impl Bars {
    fn new(total_tracks: usize) -> Self {
        let multi = MultiProgress::new();
        let tracks_done = multi.add(ProgressBar::new(total_tracks as u64));
        tracks_done.set_style(
            ProgressStyle::with_template("{prefix:>9} [{elapsed}] {wide_bar} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        tracks_done.set_prefix("tracks");
        Self {
            multi,
            tracks_done,
            running: HashMap::new(),
        }
    }

    fn spinner(&self, track_id: &str) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template("{prefix:>9} {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(track_id.to_string());
        bar.set_message("running");
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

impl ProgressMonitor {
    pub fn new(total_tracks: usize, enabled: bool) -> Self {
        Self {
            bars: enabled.then(|| Bars::new(total_tracks)),
        }
    }

    pub fn add_track(&mut self, track_id: &str) {
        if let Some(bars) = &mut self.bars {
            let bar = bars.spinner(track_id);
            bars.running.insert(track_id.to_string(), bar);
        }
    }

    pub fn complete_track(&mut self, track_id: &str, success: bool) {
        let Some(bars) = &mut self.bars else {
            return;
        };
        if let Some(bar) = bars.running.remove(track_id) {
            bar.finish_with_message(if success { "done" } else { "failed" });
        }
        bars.tracks_done.inc(1);
    }

    pub fn update_round(&self, round: usize, total_rounds: usize) {
        if let Some(bars) = &self.bars {
            bars.tracks_done
                .set_message(format!("(round {round} of {total_rounds})"));
        }
    }

    pub fn finish(&self, success: bool) {
        if let Some(bars) = &self.bars {
            bars.tracks_done
                .finish_with_message(if success { "complete" } else { "halted" });
        }
    }

    #[cfg(test)]
    fn running(&self) -> usize {
        self.bars.as_ref().map_or(0, |b| b.running.len())
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        if let Some(bars) = &mut self.bars {
            for (_, bar) in bars.running.drain() {
                bar.finish_and_clear();
            }
        }
    }
}
