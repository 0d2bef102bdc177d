//! Timing Core - HBHE timing map aggregation engine
//!
//! This module turns a stream of reconstructed calorimeter hits into the
//! statistical maps used to spot mistimed channels and channel-to-channel
//! timing correlations.
//!
//! # Architecture
//!
//! ```text
//! JSONL rechits → EventReader (groups records by run/lumi/event)
//!     ↓
//! EventProcessor (run filter, per-hit dispatch, end-of-event flush)
//!     ├─→ EnergyTimeClassifier (IT / OOT1 / OOT2 energy spectra)
//!     ├─→ ChannelIndexer → AccumulatorGrid (energy > threshold:
//!     │        per-channel timing, per-depth profile + occupancy)
//!     ├─→ PhiCorrelationAnalyzer (iphi 67 / 66 pairwise timing)
//!     └─→ DiagnosticHook (optional pulse-shape capture)
//!     ↓
//! HistogramEntry export → HistogramWriter → JSONL or SQLite backend
//! ```

pub mod channel;
pub mod classifier;
pub mod correlator;
pub mod grid;
pub mod histogram;
pub mod measurement;
pub mod processor;
pub mod reader;
pub mod snapshot;
pub mod time_slices;
pub mod writer_backend;
pub mod jsonl_writer;
pub mod sqlite_writer;
pub mod writer;

pub use channel::{ChannelIndexer, DetectorChannel, InvalidChannelError, InvalidChannelReason, StorageIndex};
pub use classifier::{EnergyTimeClassifier, TimingWindow};
pub use correlator::{FlushCounts, PhiCorrelationAnalyzer};
pub use grid::AccumulatorGrid;
pub use histogram::{Axis, Hist1D, Hist2D, MergeError, Profile2D, ProfileCell};
pub use measurement::{AuxWords, EventId, EventRecord, Measurement, MeasurementRecord};
pub use processor::{EventOutcome, EventProcessor, ProcessingStats, ProcessorState};
pub use reader::EventReader;
pub use snapshot::{HistogramEntry, HistogramPayload, ProfileSnapshot};
pub use time_slices::{DiagnosticHook, PulseCapture, TimeSliceRecorder, TimeSlices};
pub use writer_backend::{HistogramStoreBackend, HistogramWriterError};
pub use jsonl_writer::HistogramJsonlWriter;
pub use sqlite_writer::SqliteHistogramWriter;
pub use writer::HistogramWriter;
