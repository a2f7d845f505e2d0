// Thumbnail worker pool
//
// Thumbnails are CPU bound and independent of each other, so they run on
// their own pool after a batch resolves. A failed task is logged and its
// siblings continue.

pub mod thumb;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;

use crate::ingest::FormatClass;

#[derive(Debug, Clone)]
pub struct ThumbTask {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub format: FormatClass,
}

/// Run the batch's thumbnail tasks across `threads` workers. Tasks whose
/// destination already exists are skipped. Returns the number generated.
pub fn generate_batch(tasks: &[ThumbTask], threads: usize) -> usize {
    if tasks.is_empty() {
        return 0;
    }

    let next = AtomicUsize::new(0);
    let generated = AtomicUsize::new(0);
    let workers = threads.max(1).min(tasks.len());

    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::SeqCst);
                if i >= tasks.len() {
                    break;
                }
                let task = &tasks[i];
                if task.dest.exists() {
                    continue;
                }

                let result = match task.format {
                    FormatClass::Image => thumb::generate_image_thumb(&task.source, &task.dest),
                    FormatClass::Video => thumb::generate_video_thumb(&task.source, &task.dest),
                };

                match result {
                    Ok(()) => {
                        generated.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => warn!("Thumbnail failed for {}: {}", task.source.display(), e),
                }
            });
        }
    });

    generated.into_inner()
}
