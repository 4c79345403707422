//! File I/O: recordings as safetensors, configs and reports as JSON.
//!
//! A recording file holds
//!   • `data`  — `[C, T]` samples, `F64` or `F32`
//!   • `sfreq` — sampling rate, one `F64`/`F32` element
//!   • channel names, comma-separated, under `__metadata__.ch_names`
//!     (optional; a newline-separated `U8` tensor `ch_names` is accepted too)
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::signal::MultichannelSignal;

// ── Reader ────────────────────────────────────────────────────────────────────

struct Header {
    tensors: serde_json::Map<String, Value>,
    metadata: BTreeMap<String, String>,
    data_start: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    let Some(len_bytes) = bytes.get(..8) else {
        bail!("safetensors file too small ({} bytes)", bytes.len());
    };
    let mut le = [0u8; 8];
    le.copy_from_slice(len_bytes);
    let n = usize::try_from(u64::from_le_bytes(le)).context("header length overflows usize")?;
    let end = 8usize.checked_add(n).filter(|&e| e <= bytes.len());
    let Some(end) = end else {
        bail!("header length {n} exceeds file size {}", bytes.len());
    };
    let mut tensors: serde_json::Map<String, Value> =
        serde_json::from_slice(&bytes[8..end]).context("failed to parse safetensors header")?;

    let metadata = match tensors.remove("__metadata__") {
        Some(m) => serde_json::from_value(m).context("__metadata__ must map strings to strings")?,
        None => BTreeMap::new(),
    };
    Ok(Header { tensors, metadata, data_start: end })
}

struct Entry<'a> {
    dtype: &'a str,
    shape: Vec<usize>,
    raw: &'a [u8],
}

fn entry<'a>(bytes: &'a [u8], header: &'a Header, name: &str) -> Result<Entry<'a>> {
    let e = header.tensors.get(name).with_context(|| format!("missing '{name}' tensor"))?;
    let dtype = e["dtype"].as_str().with_context(|| format!("'{name}' has no dtype"))?;
    let shape = e["shape"]
        .as_array()
        .with_context(|| format!("'{name}' has no shape"))?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize))
        .collect::<Option<Vec<_>>>()
        .with_context(|| format!("'{name}' has a non-integer dimension"))?;
    let offsets = e["data_offsets"].as_array().with_context(|| format!("'{name}' has no data_offsets"))?;
    let (Some(s), Some(t)) = (
        offsets.first().and_then(Value::as_u64),
        offsets.get(1).and_then(Value::as_u64),
    ) else {
        bail!("'{name}' has malformed data_offsets");
    };
    let (s, t) = (header.data_start + s as usize, header.data_start + t as usize);
    let Some(raw) = bytes.get(s..t) else {
        bail!("'{name}' data [{s}, {t}) lies outside the file");
    };
    Ok(Entry { dtype, shape, raw })
}

fn decode_floats(e: &Entry<'_>, name: &str) -> Result<Vec<f64>> {
    let out: Vec<f64> = match e.dtype {
        "F64" => e
            .raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        "F32" => e
            .raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        other => bail!("'{name}' has unsupported dtype {other} (expected F64 or F32)"),
    };
    let expected: usize = e.shape.iter().product();
    if out.len() != expected {
        bail!("'{name}' holds {} values, shape {:?} needs {expected}", out.len(), e.shape);
    }
    Ok(out)
}

/// Decode a recording from safetensors bytes.
pub fn parse_signal(bytes: &[u8]) -> Result<MultichannelSignal> {
    let header = parse_header(bytes)?;

    let data_entry = entry(bytes, &header, "data")?;
    let (c, t) = match data_entry.shape[..] {
        [c, t] => (c, t),
        [t] => (1, t),
        ref s => bail!("'data' must be [C, T], got shape {s:?}"),
    };
    let data = Array2::from_shape_vec((c, t), decode_floats(&data_entry, "data")?)?;

    let sfreq_entry = entry(bytes, &header, "sfreq")?;
    let Some(&sfreq) = decode_floats(&sfreq_entry, "sfreq")?.first() else {
        bail!("'sfreq' is empty");
    };

    let ch_names: Vec<String> = if let Some(names) = header.metadata.get("ch_names") {
        names.split(',').filter(|s| !s.is_empty()).map(String::from).collect()
    } else if header.tensors.contains_key("ch_names") {
        let e = entry(bytes, &header, "ch_names")?;
        std::str::from_utf8(e.raw)
            .context("'ch_names' is not UTF-8")?
            .split('\n')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    } else {
        Vec::new()
    };

    MultichannelSignal::new(data, sfreq, ch_names).context("invalid recording")
}

/// Load a recording written by [`write_signal`] or any tool emitting the same
/// layout.
pub fn read_signal(path: &Path) -> Result<MultichannelSignal> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_signal(&bytes).with_context(|| format!("decoding {}", path.display()))
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Minimal safetensors writer for `F64`, `F32` and `I32` tensors plus
/// string metadata.
///
/// ```rust,no_run
/// use eegscope::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("signal", &[1.0, 2.0, 3.0], &[1, 3]);
/// w.add_metadata("stage", "bandpass");
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
    metadata: BTreeMap<String, String>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn add_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Serialise header and tensors into one buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut header = serde_json::Map::new();
        if !self.metadata.is_empty() {
            header.insert("__metadata__".into(), serde_json::to_value(&self.metadata)?);
        }
        let mut offset = 0usize;
        for (name, data, dtype, shape) in &self.entries {
            header.insert(
                name.clone(),
                serde_json::json!({
                    "dtype": dtype,
                    "shape": shape,
                    "data_offsets": [offset, offset + data.len()],
                }),
            );
            offset += data.len();
        }
        let mut hdr = serde_json::to_vec(&header)?;
        // Tensor data starts on an 8-byte boundary.
        hdr.resize(hdr.len().next_multiple_of(8), b' ');

        let mut out = Vec::with_capacity(8 + hdr.len() + offset);
        out.extend_from_slice(&(hdr.len() as u64).to_le_bytes());
        out.extend_from_slice(&hdr);
        for (_, data, _, _) in &self.entries {
            out.extend_from_slice(data);
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
    }
}

fn signal_writer(signal: &MultichannelSignal) -> StWriter {
    let mut w = StWriter::new();
    w.add_f64_arr2("data", &signal.data);
    w.add_f64("sfreq", &[signal.sampling_rate], &[1]);
    w.add_metadata("ch_names", signal.resolved_names().join(","));
    w
}

/// Encode a recording as safetensors bytes.
pub fn signal_to_bytes(signal: &MultichannelSignal) -> Result<Vec<u8>> {
    signal_writer(signal).to_bytes()
}

/// Save a recording; channel names are always written in full.
pub fn write_signal(path: &Path, signal: &MultichannelSignal) -> Result<()> {
    signal_writer(signal).write(path)
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// Pretty-printed JSON dump of any report type.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// Load a JSON document (configs use `#[serde(default)]`, so partial files
/// are fine).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_bytes_decode_back() {
        let data = Array2::from_shape_fn((2, 5), |(c, t)| c as f64 * 10.0 + t as f64 * 0.5);
        let sig = MultichannelSignal::new(data, 250.0, vec!["Fz".into()]).unwrap();
        let back = parse_signal(&signal_to_bytes(&sig).unwrap()).unwrap();
        assert_eq!(back.data, sig.data);
        assert_eq!(back.sampling_rate, 250.0);
        assert_eq!(back.channel_names, vec!["Fz".to_string(), "Ch2".to_string()]);
    }

    #[test]
    fn header_is_eight_byte_aligned() {
        let mut w = StWriter::new();
        w.add_i32("n", &[3], &[1]);
        let bytes = w.to_bytes().unwrap();
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
        assert_eq!(n % 8, 0);
        assert_eq!(&bytes[8 + n..], &3i32.to_le_bytes());
    }

    #[test]
    fn f32_data_and_newline_names_accepted() {
        let mut w = StWriter::new();
        w.add_f32("data", &[1.0, 2.0, 3.0, 4.0], &[2, 2]);
        w.add_f32("sfreq", &[128.0], &[1]);
        let names = b"C3\nC4\n";
        w.entries.push(("ch_names".into(), names.to_vec(), "U8", vec![names.len()]));
        let sig = parse_signal(&w.to_bytes().unwrap()).unwrap();
        assert_eq!(sig.data[[1, 0]], 3.0);
        assert_eq!(sig.sampling_rate, 128.0);
        assert_eq!(sig.channel_names, vec!["C3".to_string(), "C4".to_string()]);
    }

    #[test]
    fn truncated_and_malformed_files_fail() {
        assert!(parse_signal(&[1, 2, 3]).is_err());
        let mut w = StWriter::new();
        w.add_f64("data", &[1.0, 2.0], &[1, 2]);
        let mut bytes = w.to_bytes().unwrap();
        assert!(parse_signal(&bytes).unwrap_err().to_string().contains("sfreq"));
        bytes.truncate(bytes.len() - 4);
        assert!(parse_signal(&bytes).is_err());
    }

    #[test]
    fn zero_rate_rejected() {
        let mut w = StWriter::new();
        w.add_f64("data", &[1.0], &[1, 1]);
        w.add_f64("sfreq", &[0.0], &[1]);
        assert!(parse_signal(&w.to_bytes().unwrap()).is_err());
    }
}
