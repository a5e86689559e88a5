//! Pre-decoded stimuli shared read-only by the engines

use crate::command::Track;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while assembling stimuli
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StimulusError {
    #[error("stimulus '{0}' has no channels")]
    NoChannels(String),
    #[error("stimulus '{0}' contains no audio")]
    Empty(String),
    #[error("stimulus '{id}': channel {channel} has {found} frames, expected {expected}")]
    ChannelLengthMismatch {
        id: String,
        channel: usize,
        expected: usize,
        found: usize,
    },
    #[error("stimulus '{id}' is at {found} Hz, session runs at {expected} Hz")]
    SampleRateMismatch { id: String, expected: u32, found: u32 },
    #[error("no stimuli were provided")]
    NoStimuli,
}

/// One decoded stimulus: planar channels of equal length
#[derive(Debug)]
pub struct Stimulus {
    id: String,
    channels: Vec<Box<[f32]>>,
    frames: usize,
    sample_rate: u32,
}

impl Stimulus {
    pub fn new(
        id: impl Into<String>,
        channels: Vec<Vec<f32>>,
        sample_rate: u32,
    ) -> Result<Self, StimulusError> {
        let id = id.into();
        let frames = match channels.first() {
            Some(first) => first.len(),
            None => return Err(StimulusError::NoChannels(id)),
        };
        if frames == 0 {
            return Err(StimulusError::Empty(id));
        }
        if let Some((channel, data)) = channels
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() != frames)
        {
            return Err(StimulusError::ChannelLengthMismatch {
                id,
                channel,
                expected: frames,
                found: data.len(),
            });
        }

        Ok(Self {
            id,
            channels: channels.into_iter().map(Vec::into_boxed_slice).collect(),
            frames,
            sample_rate,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(|c| &c[..])
    }

    /// Stereo view of one frame: mono is duplicated, channels past the
    /// second are ignored. Reads past the end yield silence.
    #[inline]
    pub fn frame(&self, position: usize) -> (f32, f32) {
        let left = self.channels[0].get(position).copied().unwrap_or(0.0);
        let right = match self.channels.get(1) {
            Some(ch) => ch.get(position).copied().unwrap_or(0.0),
            None => left,
        };
        (left, right)
    }
}

fn check_rate(stimulus: &Stimulus, expected: u32) -> Result<(), StimulusError> {
    if stimulus.sample_rate != expected {
        return Err(StimulusError::SampleRateMismatch {
            id: stimulus.id.clone(),
            expected,
            found: stimulus.sample_rate,
        });
    }
    Ok(())
}

/// Every stimulus presented on a page, indexed in presentation order
#[derive(Debug, Clone)]
pub struct StimulusStore {
    stimuli: Vec<Arc<Stimulus>>,
    sample_rate: u32,
}

impl StimulusStore {
    pub fn new(stimuli: Vec<Stimulus>) -> Result<Self, StimulusError> {
        let sample_rate = stimuli
            .first()
            .map(Stimulus::sample_rate)
            .ok_or(StimulusError::NoStimuli)?;
        for stimulus in &stimuli {
            check_rate(stimulus, sample_rate)?;
        }
        debug!(count = stimuli.len(), sample_rate, "stimulus store assembled");

        Ok(Self {
            stimuli: stimuli.into_iter().map(Arc::new).collect(),
            sample_rate,
        })
    }

    pub fn get(&self, index: usize) -> Option<&Stimulus> {
        self.stimuli.get(index).map(|s| s.as_ref())
    }

    /// Frame length of a stimulus
    pub fn length(&self, index: usize) -> Option<usize> {
        self.get(index).map(Stimulus::frames)
    }

    pub fn len(&self) -> usize {
        self.stimuli.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stimuli.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stimulus> {
        self.stimuli.iter().map(|s| s.as_ref())
    }
}

/// A reference and its conditions for a comparison trial.
///
/// The shared track length is the shortest stimulus, so any loop position is
/// readable on every track.
#[derive(Debug, Clone)]
pub struct ComparisonSet {
    reference: Arc<Stimulus>,
    conditions: Vec<Arc<Stimulus>>,
    sample_rate: u32,
    frames: usize,
}

impl ComparisonSet {
    pub fn new(reference: Stimulus, conditions: Vec<Stimulus>) -> Result<Self, StimulusError> {
        let sample_rate = reference.sample_rate();
        for condition in &conditions {
            check_rate(condition, sample_rate)?;
        }
        let frames = conditions
            .iter()
            .map(Stimulus::frames)
            .fold(reference.frames(), usize::min);
        debug!(
            conditions = conditions.len(),
            frames, sample_rate, "comparison set assembled"
        );

        Ok(Self {
            reference: Arc::new(reference),
            conditions: conditions.into_iter().map(Arc::new).collect(),
            sample_rate,
            frames,
        })
    }

    pub fn reference(&self) -> &Stimulus {
        &self.reference
    }

    pub fn condition(&self, index: usize) -> Option<&Stimulus> {
        self.conditions.get(index).map(|s| s.as_ref())
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    pub fn condition_ids(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|s| s.id())
    }

    /// Resolve a track; engine-A addressing has no meaning here
    pub fn track(&self, track: Track) -> Option<&Stimulus> {
        match track {
            Track::Reference => Some(self.reference()),
            Track::Condition(index) => self.condition(index),
            Track::Stimulus(_) => None,
        }
    }

    /// Shared track length in frames
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_upmix_and_truncation() {
        let mono = Stimulus::new("mono", vec![vec![0.5, -0.5]], 48000).unwrap();
        assert_eq!(mono.frame(1), (-0.5, -0.5));

        let wide = Stimulus::new(
            "wide",
            vec![vec![0.1; 3], vec![0.2; 3], vec![0.9; 3]],
            48000,
        )
        .unwrap();
        assert_eq!(wide.frame(0), (0.1, 0.2));
        assert_eq!(wide.frame(99), (0.0, 0.0));
    }

    #[test]
    fn test_rejects_ragged_channels() {
        let err = Stimulus::new("bad", vec![vec![0.0; 4], vec![0.0; 3]], 44100).unwrap_err();
        assert!(matches!(
            err,
            StimulusError::ChannelLengthMismatch { channel: 1, .. }
        ));
        assert!(matches!(
            Stimulus::new("none", vec![], 44100),
            Err(StimulusError::NoChannels(_))
        ));
        assert!(matches!(
            Stimulus::new("empty", vec![vec![]], 44100),
            Err(StimulusError::Empty(_))
        ));
    }

    #[test]
    fn test_store_lengths_and_rates() {
        let a = Stimulus::new("a", vec![vec![0.0; 10]], 48000).unwrap();
        let b = Stimulus::new("b", vec![vec![0.0; 20]], 48000).unwrap();
        let store = StimulusStore::new(vec![a, b]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.length(1), Some(20));
        assert_eq!(store.length(2), None);

        let c = Stimulus::new("c", vec![vec![0.0; 10]], 48000).unwrap();
        let d = Stimulus::new("d", vec![vec![0.0; 10]], 44100).unwrap();
        assert!(matches!(
            StimulusStore::new(vec![c, d]),
            Err(StimulusError::SampleRateMismatch { .. })
        ));
        assert_eq!(StimulusStore::new(vec![]).unwrap_err(), StimulusError::NoStimuli);
    }

    #[test]
    fn test_comparison_set_uses_shortest_track() {
        let reference = Stimulus::new("ref", vec![vec![0.0; 100]], 48000).unwrap();
        let c1 = Stimulus::new("c1", vec![vec![0.0; 90]], 48000).unwrap();
        let c2 = Stimulus::new("c2", vec![vec![0.0; 120]], 48000).unwrap();
        let set = ComparisonSet::new(reference, vec![c1, c2]).unwrap();
        assert_eq!(set.frames(), 90);
        assert_eq!(set.condition_count(), 2);
        assert_eq!(set.condition_ids().collect::<Vec<_>>(), vec!["c1", "c2"]);
        assert!(set.track(Track::Condition(2)).is_none());
        assert_eq!(set.track(Track::Reference).map(Stimulus::id), Some("ref"));
    }
}
