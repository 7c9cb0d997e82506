//! Batch decoding
//!
//! Request bodies are gzip streams of newline-delimited JSON, one log
//! record per line. Only `DeviceID` and `DeviceName` are read; every other
//! field is ignored.
//!
//! Any malformed input (bad gzip, oversized output, a line that is not a
//! JSON object) fails the whole batch. Lines that are well-formed but lack
//! either field are dropped.

use crate::error::{Error, Result};
use crate::model::Observation;
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, trace};

#[derive(Debug, Deserialize)]
struct LogLine {
    #[serde(rename = "DeviceID", default)]
    device_id: Option<String>,
    #[serde(rename = "DeviceName", default)]
    device_name: Option<String>,
}

impl LogLine {
    fn into_observation(self) -> Option<Observation> {
        let device_id = self.device_id.filter(|id| !id.trim().is_empty())?;
        let device_name = self.device_name.filter(|name| !name.trim().is_empty())?;
        Some(Observation::new(device_id, device_name))
    }
}

/// Decompress and parse a batch body
///
/// # Parameters
///
/// - `body`: gzip-compressed request body (concatenated members allowed)
/// - `max_decoded_bytes`: upper bound on the decompressed size
pub fn decode_batch(body: &[u8], max_decoded_bytes: usize) -> Result<Vec<Observation>> {
    let raw = gunzip(body, max_decoded_bytes)?;
    let observations = parse_lines(&raw)?;
    debug!(
        "Decoded {} observation(s) from {} compressed / {} raw bytes",
        observations.len(),
        body.len(),
        raw.len()
    );
    Ok(observations)
}

/// Decompress a gzip body, refusing output larger than `limit`
///
/// An empty body decodes to an empty batch.
pub fn gunzip(body: &[u8], limit: usize) -> Result<Vec<u8>> {
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut decoder = MultiGzDecoder::new(body).take(cap);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| Error::decode(format!("Invalid gzip stream: {}", e)))?;

    if raw.len() > limit {
        return Err(Error::decode(format!(
            "Decompressed batch exceeds {} bytes",
            limit
        )));
    }

    Ok(raw)
}

/// Parse newline-delimited JSON log records
pub fn parse_lines(raw: &[u8]) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();

    for (index, line) in raw.split(|byte| *byte == b'\n').enumerate() {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let entry: LogLine = serde_json::from_slice(line)
            .map_err(|e| Error::decode(format!("Malformed record on line {}: {}", index + 1, e)))?;

        match entry.into_observation() {
            Some(observation) => observations.push(observation),
            None => trace!("Line {} has no DeviceID/DeviceName, dropped", index + 1),
        }
    }

    Ok(observations)
}
