//! Editable loop region of the comparison player

use thiserror::Error;

/// Reasons a loop edit was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEditError {
    #[error("loop start {start} is not before loop end {end}")]
    Inverted { start: usize, end: usize },
    #[error("loop end {end} is past the track end {track_length}")]
    PastEnd { end: usize, track_length: usize },
    #[error("loop of {length} frames is shorter than the minimum {minimum}")]
    TooShort { length: usize, minimum: usize },
}

/// `[start, end)` range that playback cycles within while looping is active.
///
/// Every successful edit keeps `start < end <= track_length` and
/// `end - start >= minimum`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopRegion {
    start: usize,
    end: usize,
    active: bool,
    minimum: usize,
    track_length: usize,
}

impl LoopRegion {
    /// Region covering the whole track
    pub fn new(track_length: usize, minimum: usize, active: bool) -> Self {
        Self {
            start: 0,
            end: track_length,
            active,
            minimum,
            track_length,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Minimum loop length in frames
    pub fn minimum(&self) -> usize {
        self.minimum
    }

    pub fn track_length(&self) -> usize {
        self.track_length
    }

    /// Midpoint used to decide which boundary a loop edit moves
    pub fn midpoint(&self) -> usize {
        (self.start + self.end) / 2
    }

    fn validate(&self, start: usize, end: usize) -> Result<(), LoopEditError> {
        if start >= end {
            return Err(LoopEditError::Inverted { start, end });
        }
        if end > self.track_length {
            return Err(LoopEditError::PastEnd {
                end,
                track_length: self.track_length,
            });
        }
        if end - start < self.minimum {
            return Err(LoopEditError::TooShort {
                length: end - start,
                minimum: self.minimum,
            });
        }
        Ok(())
    }

    /// Move the start boundary. Returns whether anything changed.
    pub fn set_start(&mut self, start: usize) -> Result<bool, LoopEditError> {
        self.set(start, self.end)
    }

    /// Move the end boundary. Returns whether anything changed.
    pub fn set_end(&mut self, end: usize) -> Result<bool, LoopEditError> {
        self.set(self.start, end)
    }

    /// Replace both boundaries at once. The pair is validated as a whole.
    pub fn set(&mut self, start: usize, end: usize) -> Result<bool, LoopEditError> {
        self.validate(start, end)?;
        let changed = (start, end) != (self.start, self.end);
        self.start = start;
        self.end = end;
        Ok(changed)
    }

    /// Where a position outside the region resumes. Before the start it moves
    /// up to the start; at or past the exclusive end it wraps to the start.
    pub fn clamp(&self, position: usize) -> Option<usize> {
        if position < self.start || position >= self.end {
            Some(self.start)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> LoopRegion {
        let mut region = LoopRegion::new(1000, 200, true);
        region.set(0, 500).unwrap();
        region
    }

    #[test]
    fn test_too_short_start_is_rejected() {
        let mut region = region();
        assert_eq!(
            region.set_start(350),
            Err(LoopEditError::TooShort {
                length: 150,
                minimum: 200
            })
        );
        assert_eq!((region.start(), region.end()), (0, 500));
    }

    #[test]
    fn test_valid_edits() {
        let mut region = region();
        assert_eq!(region.set_start(300), Ok(true));
        assert_eq!(region.set_end(1000), Ok(true));
        assert_eq!(region.set_end(1000), Ok(false));
        assert_eq!((region.start(), region.end()), (300, 1000));
        assert_eq!(region.midpoint(), 650);
    }

    #[test]
    fn test_invalid_edits_keep_boundaries() {
        let mut region = region();
        assert!(matches!(
            region.set_end(1001),
            Err(LoopEditError::PastEnd { .. })
        ));
        assert!(matches!(
            region.set(600, 400),
            Err(LoopEditError::Inverted { .. })
        ));
        assert!(matches!(
            region.set_start(500),
            Err(LoopEditError::Inverted { .. })
        ));
        assert_eq!((region.start(), region.end()), (0, 500));
    }

    #[test]
    fn test_set_validates_pair_as_whole() {
        // Moving the whole region right of the old end is a single valid edit
        let mut region = region();
        assert_eq!(region.set(600, 900), Ok(true));
        assert_eq!((region.start(), region.end()), (600, 900));
    }

    #[test]
    fn test_clamp_resumes_at_start() {
        let mut region = region();
        region.set(200, 600).unwrap();
        assert_eq!(region.clamp(100), Some(200));
        assert_eq!(region.clamp(600), Some(200));
        assert_eq!(region.clamp(700), Some(200));
        assert_eq!(region.clamp(200), None);
        assert_eq!(region.clamp(599), None);
    }
}
