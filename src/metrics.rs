//! Lightweight global metrics for the VSS store reader.
//!
//! Thread-safe atomic counters for:
//! - on-disk chain walks (catalog, diff area table, bitmaps, location table)
//! - diff area entry decoding and forwarder resolution
//! - the chunked shadow copy read path

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// ----- Chains -----
static CHAIN_BLOCKS_READ: AtomicU64 = AtomicU64::new(0);
static CHAIN_LOOPS_DETECTED: AtomicU64 = AtomicU64::new(0);

// ----- Diff area -----
static DIFF_AREA_ENTRIES_DECODED: AtomicU64 = AtomicU64::new(0);
static OVERLAY_CONTINUATIONS_MISSED: AtomicU64 = AtomicU64::new(0);
static FORWARDERS_RESOLVED: AtomicU64 = AtomicU64::new(0);
static FORWARDERS_UNRESOLVED: AtomicU64 = AtomicU64::new(0);

// ----- Read path -----
static READ_CALLS: AtomicU64 = AtomicU64::new(0);
static CHUNKS_CURRENT_VOLUME: AtomicU64 = AtomicU64::new(0);
static CHUNKS_COPY_ON_WRITE: AtomicU64 = AtomicU64::new(0);
static CHUNKS_OVERLAY: AtomicU64 = AtomicU64::new(0);
static CHUNKS_ZEROES: AtomicU64 = AtomicU64::new(0);
static BYTES_READ_FROM_VOLUME: AtomicU64 = AtomicU64::new(0);
static BYTES_ZERO_FILLED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    // Chains
    pub chain_blocks_read: u64,
    pub chain_loops_detected: u64,

    // Diff area
    pub diff_area_entries_decoded: u64,
    pub overlay_continuations_missed: u64,
    pub forwarders_resolved: u64,
    pub forwarders_unresolved: u64,

    // Read path
    pub read_calls: u64,
    pub chunks_current_volume: u64,
    pub chunks_copy_on_write: u64,
    pub chunks_overlay: u64,
    pub chunks_zeroes: u64,
    pub bytes_read_from_volume: u64,
    pub bytes_zero_filled: u64,
}

impl MetricsSnapshot {
    pub fn chunks_total(&self) -> u64 {
        self.chunks_current_volume + self.chunks_copy_on_write + self.chunks_overlay + self.chunks_zeroes
    }

    /// Average number of dispatched chunks per read call (merging efficiency).
    pub fn avg_chunks_per_read(&self) -> f64 {
        if self.read_calls == 0 {
            0.0
        } else {
            self.chunks_total() as f64 / self.read_calls as f64
        }
    }
}

// ----- Recorders (chains) -----
pub fn record_chain_block() {
    CHAIN_BLOCKS_READ.fetch_add(1, Ordering::Relaxed);
}

pub fn record_chain_loop() {
    CHAIN_LOOPS_DETECTED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (diff area) -----
pub fn record_diff_area_entries(n: usize) {
    DIFF_AREA_ENTRIES_DECODED.fetch_add(n as u64, Ordering::Relaxed);
}

pub fn record_overlay_continuation_missed() {
    OVERLAY_CONTINUATIONS_MISSED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_forwarders(resolved: u64, unresolved: u64) {
    FORWARDERS_RESOLVED.fetch_add(resolved, Ordering::Relaxed);
    FORWARDERS_UNRESOLVED.fetch_add(unresolved, Ordering::Relaxed);
}

// ----- Recorders (read path) -----
pub fn record_read_call() {
    READ_CALLS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_chunk_current_volume(bytes: usize) {
    CHUNKS_CURRENT_VOLUME.fetch_add(1, Ordering::Relaxed);
    BYTES_READ_FROM_VOLUME.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_chunk_copy_on_write(bytes: usize) {
    CHUNKS_COPY_ON_WRITE.fetch_add(1, Ordering::Relaxed);
    BYTES_READ_FROM_VOLUME.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_chunk_overlay(bytes: usize) {
    CHUNKS_OVERLAY.fetch_add(1, Ordering::Relaxed);
    BYTES_READ_FROM_VOLUME.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_chunk_zeroes(bytes: usize) {
    CHUNKS_ZEROES.fetch_add(1, Ordering::Relaxed);
    BYTES_ZERO_FILLED.fetch_add(bytes as u64, Ordering::Relaxed);
}

/// Take a consistent-enough snapshot of all counters.
pub fn metrics_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        chain_blocks_read: CHAIN_BLOCKS_READ.load(Ordering::Relaxed),
        chain_loops_detected: CHAIN_LOOPS_DETECTED.load(Ordering::Relaxed),

        diff_area_entries_decoded: DIFF_AREA_ENTRIES_DECODED.load(Ordering::Relaxed),
        overlay_continuations_missed: OVERLAY_CONTINUATIONS_MISSED.load(Ordering::Relaxed),
        forwarders_resolved: FORWARDERS_RESOLVED.load(Ordering::Relaxed),
        forwarders_unresolved: FORWARDERS_UNRESOLVED.load(Ordering::Relaxed),

        read_calls: READ_CALLS.load(Ordering::Relaxed),
        chunks_current_volume: CHUNKS_CURRENT_VOLUME.load(Ordering::Relaxed),
        chunks_copy_on_write: CHUNKS_COPY_ON_WRITE.load(Ordering::Relaxed),
        chunks_overlay: CHUNKS_OVERLAY.load(Ordering::Relaxed),
        chunks_zeroes: CHUNKS_ZEROES.load(Ordering::Relaxed),
        bytes_read_from_volume: BYTES_READ_FROM_VOLUME.load(Ordering::Relaxed),
        bytes_zero_filled: BYTES_ZERO_FILLED.load(Ordering::Relaxed),
    }
}

/// Reset all counters to zero (tests / tooling).
pub fn metrics_reset() {
    for c in [
        &CHAIN_BLOCKS_READ,
        &CHAIN_LOOPS_DETECTED,
        &DIFF_AREA_ENTRIES_DECODED,
        &OVERLAY_CONTINUATIONS_MISSED,
        &FORWARDERS_RESOLVED,
        &FORWARDERS_UNRESOLVED,
        &READ_CALLS,
        &CHUNKS_CURRENT_VOLUME,
        &CHUNKS_COPY_ON_WRITE,
        &CHUNKS_OVERLAY,
        &CHUNKS_ZEROES,
        &BYTES_READ_FROM_VOLUME,
        &BYTES_ZERO_FILLED,
    ] {
        c.store(0, Ordering::Relaxed);
    }
}
