//! Stimulus file loading and decoding

use clarion_audio::{Stimulus, StimulusError};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while loading a stimulus
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Resample error: {0}")]
    Resample(String),
    #[error(transparent)]
    Stimulus(#[from] StimulusError),
}

/// Decodes audio files into stimuli at one session sample rate
pub struct StimulusLoader {
    target_sample_rate: u32,
}

impl Default for StimulusLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl StimulusLoader {
    /// Loader targeting 48kHz
    pub fn new() -> Self {
        Self::with_sample_rate(48000)
    }

    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    /// Decode a file, resample it to the session rate and name it after the file stem
    pub fn load(&self, path: &Path) -> Result<Stimulus, LoadError> {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("stimulus")
            .to_string();

        let (channels, source_rate) = decode_planar(path)?;
        let frames = channels.first().map_or(0, Vec::len);
        debug!(
            path = %path.display(),
            frames,
            channels = channels.len(),
            source_rate,
            "decoded stimulus"
        );

        let channels = if source_rate != self.target_sample_rate {
            info!(
                path = %path.display(),
                from = source_rate,
                to = self.target_sample_rate,
                "resampling stimulus"
            );
            resample_planar(&channels, source_rate, self.target_sample_rate)?
        } else {
            channels
        };

        Ok(Stimulus::new(id, channels, self.target_sample_rate)?)
    }
}

/// Decode every packet of the first audio track into planar f32 channels
fn decode_planar(path: &Path) -> Result<(Vec<Vec<f32>>, u32), LoadError> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| LoadError::Decode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(LoadError::NoAudioTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let source_rate = codec_params.sample_rate.unwrap_or(44100);
    let channel_count = codec_params.channels.map(|c| c.count()).unwrap_or(2).max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| LoadError::Decode(e.to_string()))?;

    let mut interleaved: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "stopped reading packets");
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping undecodable packet");
                continue;
            }
        };
        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    Ok((deinterleave(&interleaved, channel_count), source_rate))
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    (0..channels)
        .map(|ch| (0..frames).map(|f| samples[f * channels + ch]).collect())
        .collect()
}

/// Resample planar channels, keeping the length proportional to the rate change
pub fn resample_planar(
    channels: &[Vec<f32>],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<Vec<f32>>, LoadError> {
    use rubato::{FftFixedInOut, Resampler};

    let channel_count = channels.len();
    let frames = channels.first().map_or(0, Vec::len);
    if channel_count == 0 || frames == 0 || source_rate == target_rate {
        return Ok(channels.to_vec());
    }

    let mut resampler = FftFixedInOut::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        1024,
        channel_count,
    )
    .map_err(|e| LoadError::Resample(e.to_string()))?;

    let chunk_size = resampler.input_frames_next();
    let mut output: Vec<Vec<f32>> = vec![Vec::new(); channel_count];

    let mut pos = 0;
    while pos + chunk_size <= frames {
        let input: Vec<&[f32]> = channels.iter().map(|ch| &ch[pos..pos + chunk_size]).collect();
        let resampled = resampler
            .process(&input, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        for (out, data) in output.iter_mut().zip(resampled) {
            out.extend(data);
        }
        pos += chunk_size;
    }

    // Zero-pad the tail, then keep only its share of the output
    if pos < frames {
        let remaining = frames - pos;
        let padded: Vec<Vec<f32>> = channels
            .iter()
            .map(|ch| {
                let mut v = ch[pos..].to_vec();
                v.resize(chunk_size, 0.0);
                v
            })
            .collect();
        let input: Vec<&[f32]> = padded.iter().map(Vec::as_slice).collect();
        let resampled = resampler
            .process(&input, None)
            .map_err(|e| LoadError::Resample(e.to_string()))?;
        let tail_frames = remaining * target_rate as usize / source_rate as usize;
        for (out, data) in output.iter_mut().zip(resampled) {
            out.extend(&data[..tail_frames.min(data.len())]);
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    /// 16-bit PCM mono WAV
    fn write_wav(name: &str, sample_rate: u32, samples: &[i16]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("clarion-{}-{}.wav", name, std::process::id()));
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&bytes).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = StimulusLoader::new();
        let result = loader.load(Path::new("/nonexistent/clarion/stimulus.wav"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn test_load_wav_at_session_rate() {
        let path = write_wav("native", 48000, &[16384; 480]);
        let stimulus = StimulusLoader::with_sample_rate(48000).load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(stimulus.frames(), 480);
        assert_eq!(stimulus.channel_count(), 1);
        assert_eq!(stimulus.sample_rate(), 48000);
        assert!(stimulus.id().starts_with("clarion-native"));
        assert!((stimulus.frame(100).0 - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_resample_doubles_length() {
        let input = vec![vec![0.25f32; 4800], vec![-0.25f32; 4800]];
        let output = resample_planar(&input, 24000, 48000).unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].len(), 9600);
        assert_eq!(output[1].len(), 9600);
    }

    #[test]
    fn test_resample_same_rate_is_passthrough() {
        let input = vec![vec![0.1, 0.2, 0.3]];
        assert_eq!(resample_planar(&input, 48000, 48000).unwrap(), input);
    }

    #[test]
    fn test_deinterleave() {
        let planar = deinterleave(&[1.0, -1.0, 2.0, -2.0, 3.0, -3.0], 2);
        assert_eq!(planar, vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]]);
    }
}
