//! Output device host: runs a block processor from the cpal callback

use anyhow::{anyhow, Context};
use clarion_audio::{AudioBlock, BlockProcessor};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};
use tracing::{error, info, warn};

/// Default output device with a chosen stream configuration
pub struct Output {
    device: cpal::Device,
    config: StreamConfig,
}

impl Output {
    /// Open the default device, preferring `sample_rate` and a fixed `block_frames` buffer
    pub fn open(sample_rate: u32, block_frames: usize) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no audio output device found"))?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let preferred = device
            .supported_output_configs()
            .context("failed to query output configurations")?
            .filter(|range| range.sample_format() == SampleFormat::F32)
            .find(|range| {
                range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
            })
            .map(|range| range.with_sample_rate(SampleRate(sample_rate)));

        let supported = match preferred {
            Some(supported) => supported,
            None => {
                let fallback = device
                    .default_output_config()
                    .context("failed to get default output config")?;
                warn!(
                    preferred = sample_rate,
                    using = fallback.sample_rate().0,
                    "device does not offer the preferred sample rate"
                );
                fallback
            }
        };

        let buffer_size = match supported.buffer_size() {
            SupportedBufferSize::Range { min, max }
                if (*min as usize) <= block_frames && block_frames <= *max as usize =>
            {
                BufferSize::Fixed(block_frames as u32)
            }
            _ => BufferSize::Default,
        };
        let mut config: StreamConfig = supported.into();
        config.buffer_size = buffer_size;

        info!(
            device = %name,
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            buffer = ?config.buffer_size,
            "opened output device"
        );
        Ok(Self { device, config })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }

    /// Start the stream. The processor moves onto the audio thread.
    pub fn start(
        self,
        mut processor: Box<dyn BlockProcessor>,
        block_frames: usize,
    ) -> anyhow::Result<cpal::Stream> {
        let channels = self.channels().max(1);
        let block_frames = block_frames.max(1);
        let mut renderer = SubBlockRenderer::new(channels, block_frames);

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.render(processor.as_mut(), data);
                },
                |err| {
                    error!(error = %err, "audio stream error");
                },
                None,
            )
            .context("failed to create audio stream")?;

        stream.play().context("failed to start audio")?;
        Ok(stream)
    }
}

/// Splits device buffers into blocks of at most `block_frames` frames.
/// The planar scratch buffer is allocated once, up front.
struct SubBlockRenderer {
    channels: usize,
    block_frames: usize,
    scratch: Vec<f32>,
    alive: bool,
}

impl SubBlockRenderer {
    fn new(channels: usize, block_frames: usize) -> Self {
        Self {
            channels,
            block_frames,
            scratch: vec![0.0; channels * block_frames],
            alive: true,
        }
    }

    fn render(&mut self, processor: &mut dyn BlockProcessor, data: &mut [f32]) {
        if !self.alive {
            data.fill(0.0);
            return;
        }
        for chunk in data.chunks_mut(self.block_frames * self.channels) {
            let frames = chunk.len() / self.channels;
            let planar = &mut self.scratch[..frames * self.channels];
            let mut block = AudioBlock::new(planar, self.channels);
            self.alive = processor.process(&mut block);
            block.interleave_into(chunk);
            if !self.alive {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes a running frame counter on every channel
    struct Counter {
        next: f32,
        blocks: Vec<usize>,
    }

    impl BlockProcessor for Counter {
        fn process(&mut self, block: &mut AudioBlock<'_>) -> bool {
            self.blocks.push(block.frames());
            for frame in 0..block.frames() {
                block.write_frame(frame, self.next, -self.next);
                self.next += 1.0;
            }
            true
        }
    }

    #[test]
    fn test_device_buffer_split_into_blocks() {
        let mut renderer = SubBlockRenderer::new(2, 4);
        let mut counter = Counter {
            next: 0.0,
            blocks: Vec::new(),
        };
        let mut data = vec![9.0; 10 * 2];
        renderer.render(&mut counter, &mut data);

        assert_eq!(counter.blocks, vec![4, 4, 2]);
        for frame in 0..10 {
            assert_eq!(data[frame * 2], frame as f32);
            assert_eq!(data[frame * 2 + 1], -(frame as f32));
        }
    }

    #[test]
    fn test_extra_output_channels_are_silent() {
        let mut renderer = SubBlockRenderer::new(4, 8);
        let mut counter = Counter {
            next: 1.0,
            blocks: Vec::new(),
        };
        let mut data = vec![9.0; 3 * 4];
        renderer.render(&mut counter, &mut data);
        assert_eq!(&data[..4], &[1.0, -1.0, 0.0, 0.0]);
        assert_eq!(&data[8..], &[3.0, -3.0, 0.0, 0.0]);
    }
}
