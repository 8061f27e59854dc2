//! Collapse queued events for the same path
//!
//! A single save often arrives as create + several modifies. Each one would
//! settle and hash the file again, so the worker drains whatever is queued
//! and keeps one event per path.

use crate::WatchEvent;
use std::collections::HashMap;
use std::path::PathBuf;

/// One event per path, in first-seen order, carrying the most recent kind
pub fn coalesce(batch: Vec<WatchEvent>) -> Vec<WatchEvent> {
    if batch.len() < 2 {
        return batch;
    }

    let mut slots: HashMap<PathBuf, usize> = HashMap::with_capacity(batch.len());
    let mut merged: Vec<WatchEvent> = Vec::with_capacity(batch.len());

    for event in batch {
        match slots.get(&event.path) {
            Some(&idx) => merged[idx].kind = event.kind,
            None => {
                slots.insert(event.path.clone(), merged.len());
                merged.push(event);
            }
        }
    }
    merged
}
