//! Optional terminal progress display driven by pipeline events.
//!
//! The display is an observer: it consumes the typed event channel on its
//! own thread and paints a spinner with the current stage and the files the
//! transform stage is working on. Core correctness never depends on it,
//! and nothing here runs unless stderr is a TTY.

use crate::events::PipelineEvent;
use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// True when a progress display is worth drawing.
pub fn stderr_is_interactive() -> bool {
    atty::is(atty::Stream::Stderr)
}

/// Spawns the observer thread. It exits when the event channel closes;
/// join the handle after the pipeline returns.
pub fn spawn_observer(rx: Receiver<PipelineEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));

        let mut active: BTreeSet<String> = BTreeSet::new();
        for event in rx {
            match event {
                PipelineEvent::StageStarted { stage } => {
                    active.clear();
                    bar.set_message(stage.to_string());
                }
                PipelineEvent::StageFinished { stage, elapsed } => {
                    bar.set_message(format!("{stage} done in {elapsed:.1?}"));
                }
                PipelineEvent::StageSkipped { .. } | PipelineEvent::StageRecovered { .. } => {}
                PipelineEvent::FileStarted { stage, path } => {
                    active.insert(path);
                    bar.set_message(format!("{stage}: {}", summarize(&active)));
                }
                PipelineEvent::FileFinished { stage, path } => {
                    active.remove(&path);
                    if !active.is_empty() {
                        bar.set_message(format!("{stage}: {}", summarize(&active)));
                    }
                }
                PipelineEvent::Warning { stage, message } => {
                    bar.println(format!("warning [{stage}]: {message}"));
                }
            }
        }
        bar.finish_and_clear();
    })
}

/// A short view of the active file set.
fn summarize(active: &BTreeSet<String>) -> String {
    let mut names: Vec<&str> = active.iter().map(String::as_str).take(3).collect();
    if active.len() > names.len() {
        names.push("…");
        format!("{} (+{} more)", names.join(", "), active.len() - 3)
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn observer_drains_channel_and_exits() {
        let (tx, rx) = unbounded();
        let handle = spawn_observer(rx);
        tx.send(PipelineEvent::StageStarted { stage: "sort" }).unwrap();
        tx.send(PipelineEvent::FileStarted {
            stage: "transform",
            path: "a.txt".into(),
        })
        .unwrap();
        tx.send(PipelineEvent::FileFinished {
            stage: "transform",
            path: "a.txt".into(),
        })
        .unwrap();
        drop(tx);
        handle.join().unwrap();
    }

    #[test]
    fn summary_caps_at_three_names() {
        let active: BTreeSet<String> =
            ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let summary = summarize(&active);
        assert!(summary.contains("+2 more"));
    }
}
