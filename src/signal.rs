//! Multichannel recording container.
//!
//! Data is held as `[C, T]` (`channels × samples`) `f64`, the same row-major
//! layout the filters and spectral code iterate over.
use ndarray::{Array2, ArrayView1};

use crate::error::{check_sampling_rate, EegError, Result};

/// A recording: samples, sampling rate and (possibly incomplete) channel names.
#[derive(Debug, Clone, PartialEq)]
pub struct MultichannelSignal {
    /// `[C, T]` samples.
    pub data: Array2<f64>,
    /// Sampling rate in Hz, always finite and positive.
    pub sampling_rate: f64,
    /// Channel names; may be shorter than the channel count.
    pub channel_names: Vec<String>,
}

impl MultichannelSignal {
    /// Wrap `[C, T]` data. Fails on a non-positive sampling rate.
    pub fn new(data: Array2<f64>, sampling_rate: f64, channel_names: Vec<String>) -> Result<Self> {
        check_sampling_rate(sampling_rate)?;
        Ok(Self { data, sampling_rate, channel_names })
    }

    /// Build from one `Vec` per channel. All channels must have equal length.
    pub fn from_channels(channels: Vec<Vec<f64>>, sampling_rate: f64) -> Result<Self> {
        let n_ch = channels.len();
        let n_t = channels.first().map_or(0, Vec::len);
        if let Some((i, ch)) = channels.iter().enumerate().find(|(_, c)| c.len() != n_t) {
            return Err(EegError::InputShape(format!(
                "channel {i} has {} samples, channel 0 has {n_t}",
                ch.len()
            )));
        }
        let flat: Vec<f64> = channels.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((n_ch, n_t), flat)
            .map_err(|e| EegError::InputShape(e.to_string()))?;
        Self::new(data, sampling_rate, Vec::new())
    }

    /// Single-channel convenience constructor.
    pub fn from_samples(samples: &[f64], sampling_rate: f64) -> Result<Self> {
        let data = Array2::from_shape_vec((1, samples.len()), samples.to_vec())
            .map_err(|e| EegError::InputShape(e.to_string()))?;
        Self::new(data, sampling_rate, Vec::new())
    }

    /// Build from a trailing real-time window: ascending timestamps plus one
    /// list per channel. The rate is estimated from the timestamp span when
    /// `sampling_rate` is `None`.
    pub fn from_window(
        timestamps: &[f64],
        channel_data: &[Vec<f64>],
        sampling_rate: Option<f64>,
    ) -> Result<Self> {
        let rate = match sampling_rate {
            Some(r) => r,
            None => estimate_rate(timestamps)?,
        };
        if let Some(ch) = channel_data.iter().position(|c| c.len() != timestamps.len()) {
            return Err(EegError::InputShape(format!(
                "channel {ch} has {} samples for {} timestamps",
                channel_data[ch].len(),
                timestamps.len()
            )));
        }
        Self::from_channels(channel_data.to_vec(), rate)
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.channel_names = names;
        self
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn nyquist(&self) -> f64 {
        self.sampling_rate / 2.0
    }

    /// Recording length in seconds.
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sampling_rate
    }

    /// Row view of one channel.
    pub fn channel(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        if index >= self.n_channels() {
            return Err(EegError::ChannelOutOfRange { index, count: self.n_channels() });
        }
        Ok(self.data.row(index))
    }

    /// Name of channel `index`, synthesising `Ch{index+1}` when the name list
    /// is too short.
    pub fn channel_name(&self, index: usize) -> String {
        self.channel_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Ch{}", index + 1))
    }

    /// Names for every channel, padded with synthesised names.
    pub fn resolved_names(&self) -> Vec<String> {
        (0..self.n_channels()).map(|i| self.channel_name(i)).collect()
    }

    /// Same metadata, new samples.
    pub fn with_data(&self, data: Array2<f64>) -> Self {
        Self {
            data,
            sampling_rate: self.sampling_rate,
            channel_names: self.channel_names.clone(),
        }
    }
}

fn estimate_rate(timestamps: &[f64]) -> Result<f64> {
    let n = timestamps.len();
    if n < 2 {
        return Err(EegError::InputShape(format!(
            "need at least 2 timestamps to estimate the sampling rate, got {n}"
        )));
    }
    let span = timestamps[n - 1] - timestamps[0];
    check_sampling_rate((n - 1) as f64 / span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_fall_back_when_short() {
        let sig = MultichannelSignal::from_channels(vec![vec![0.0; 4]; 3], 100.0)
            .unwrap()
            .with_names(vec!["Fz".into()]);
        assert_eq!(sig.resolved_names(), ["Fz", "Ch2", "Ch3"]);
    }

    #[test]
    fn ragged_channels_rejected() {
        let err = MultichannelSignal::from_channels(vec![vec![0.0; 4], vec![0.0; 3]], 100.0);
        assert!(matches!(err, Err(EegError::InputShape(_))));
    }

    #[test]
    fn window_estimates_rate() {
        let ts: Vec<f64> = (0..251).map(|i| i as f64 / 250.0).collect();
        let sig = MultichannelSignal::from_window(&ts, &[vec![1.0; 251]], None).unwrap();
        approx::assert_abs_diff_eq!(sig.sampling_rate, 250.0, epsilon = 1e-9);
        assert_eq!(sig.n_channels(), 1);
    }

    #[test]
    fn channel_out_of_range() {
        let sig = MultichannelSignal::from_samples(&[1.0, 2.0], 10.0).unwrap();
        assert!(matches!(sig.channel(1), Err(EegError::ChannelOutOfRange { index: 1, count: 1 })));
    }
}
