//! Reconstructed hit records and their JSONL form

use super::channel::DetectorChannel;
use serde::{Deserialize, Serialize};
use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub run: u32,
    pub lumi: u32,
    pub event: u64,
}

/// Auxiliary ADC words carrying the digitised time slices of a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxWords {
    /// Time slices 0..3
    pub aux_hbhe: u32,
    /// Time slices 4..7
    pub aux: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub channel: DetectorChannel,
    pub energy: f64,
    pub raw_energy: f64,
    /// Nanoseconds relative to the expected arrival
    pub time: f64,
    pub aux: Option<AuxWords>,
}

impl Measurement {
    pub fn new(channel: DetectorChannel, energy: f64, time: f64) -> Self {
        Self {
            channel,
            energy,
            raw_energy: energy,
            time,
            aux: None,
        }
    }
}

/// One line of the rechit JSONL stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub run: u32,
    pub lumi: u32,
    pub event: u64,
    pub depth: u8,
    pub ieta: i32,
    pub iphi: i32,
    pub energy: f64,
    #[serde(default)]
    pub raw_energy: Option<f64>,
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_hbhe: Option<u32>,
}

impl MeasurementRecord {
    /// Parse a record from a JSONL line
    pub fn from_jsonl(line: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let record: MeasurementRecord = serde_json::from_str(line)?;
        Ok(record)
    }

    pub fn event_id(&self) -> EventId {
        EventId {
            run: self.run,
            lumi: self.lumi,
            event: self.event,
        }
    }

    /// Records without a collection tag are accepted by every source label
    pub fn matches_source(&self, source_label: &str) -> bool {
        self.collection
            .as_deref()
            .map_or(true, |label| label == source_label)
    }

    pub fn into_measurement(self) -> Measurement {
        let aux = match (self.aux_hbhe, self.aux) {
            (Some(aux_hbhe), Some(aux)) => Some(AuxWords { aux_hbhe, aux }),
            _ => None,
        };

        Measurement {
            channel: DetectorChannel::new(self.depth, self.ieta, self.iphi),
            energy: self.energy,
            raw_energy: self.raw_energy.unwrap_or(self.energy),
            time: self.time,
            aux,
        }
    }
}

/// All measurements of one event, in input order
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: EventId,
    pub measurements: Vec<Measurement>,
}
