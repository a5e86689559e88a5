//! Planar output block handed to a processor once per callback

/// A block of planar output audio: `channels` contiguous runs of `frames` samples.
///
/// The storage is borrowed from the host so nothing is allocated per callback.
pub struct AudioBlock<'a> {
    data: &'a mut [f32],
    channels: usize,
    frames: usize,
}

impl<'a> AudioBlock<'a> {
    /// Wrap channel-major storage. Trailing samples that do not fill a whole
    /// channel run are left untouched.
    pub fn new(data: &'a mut [f32], channels: usize) -> Self {
        let channels = channels.max(1);
        let frames = data.len() / channels;
        Self {
            data,
            channels,
            frames,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Samples of one output channel
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable samples of one output channel
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// Zero every channel
    pub fn fill_silence(&mut self) {
        self.data[..self.channels * self.frames].fill(0.0);
    }

    /// Zero every channel from `frame` to the end of the block
    pub fn silence_from(&mut self, frame: usize) {
        if frame >= self.frames {
            return;
        }
        for ch in 0..self.channels {
            self.channel_mut(ch)[frame..].fill(0.0);
        }
    }

    /// Write one stereo frame. A mono block receives the left sample only,
    /// channels past the second are silent.
    #[inline]
    pub fn write_frame(&mut self, frame: usize, left: f32, right: f32) {
        let frames = self.frames;
        self.data[frame] = left;
        if self.channels > 1 {
            self.data[frames + frame] = right;
        }
        for ch in 2..self.channels {
            self.data[ch * frames + frame] = 0.0;
        }
    }

    /// Multiply one frame across all channels
    #[inline]
    pub fn scale_frame(&mut self, frame: usize, gain: f32) {
        for ch in 0..self.channels {
            self.data[ch * self.frames + frame] *= gain;
        }
    }

    /// Interleave into a device buffer (`frames * channels` samples)
    pub fn interleave_into(&self, out: &mut [f32]) {
        for (frame, chunk) in out.chunks_mut(self.channels).take(self.frames).enumerate() {
            for (ch, sample) in chunk.iter_mut().enumerate() {
                *sample = self.data[ch * self.frames + frame];
            }
        }
    }
}

/// Anything that renders output blocks on the real-time thread.
///
/// Implementations must not block, allocate or log inside `process`.
pub trait BlockProcessor: Send {
    /// Render one block. Returns `false` once the processor wants to be released.
    fn process(&mut self, block: &mut AudioBlock<'_>) -> bool;
}
