//! Comparison player - one audible track, reference/condition roles, loop
//! region and raised-cosine transitions
//!
//! All tracks share one cursor so switching between the reference and a
//! condition keeps the listener at the same point in the material. Switching
//! fades the current track out and the requested one in; reaching the loop end
//! while looping crossfades the track into itself.

use crate::block::{AudioBlock, BlockProcessor};
use crate::command::{Command, Track};
use crate::engine::{AudioEngine, EngineConfig};
use crate::event::{Event, EventSink, Extent, Rejection};
use crate::loop_region::{LoopEditError, LoopRegion};
use crate::mailbox::CommandInbox;
use crate::ramp::{raised_cosine_in, raised_cosine_out};
use crate::stimulus::ComparisonSet;

/// Gain sub-state while playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadeMode {
    #[default]
    Plain,
    FadeOut,
    FadeIn,
}

/// Live fade state, owned by the block thread
#[derive(Debug, Clone, Copy)]
struct FadeState {
    mode: FadeMode,
    /// Ramp index, always below `window`
    position: usize,
    window: usize,
    /// Track to fade in once a fade-out completes; `None` fades to silence
    target: Option<Track>,
    /// Park the cursor at the loop start when fading to silence completes
    rewind: bool,
}

impl FadeState {
    fn new(window: usize) -> Self {
        Self {
            mode: FadeMode::Plain,
            position: 0,
            window: window.max(2),
            target: None,
            rewind: false,
        }
    }

    /// Ramp index giving the same gain in the opposite direction
    fn mirrored(&self) -> usize {
        self.window - 1 - self.position.min(self.window - 1)
    }

    fn arm_out(&mut self, target: Option<Track>, rewind: bool) {
        self.position = match self.mode {
            FadeMode::Plain => 0,
            FadeMode::FadeOut => self.position,
            FadeMode::FadeIn => self.mirrored(),
        };
        self.mode = FadeMode::FadeOut;
        self.target = target;
        self.rewind = rewind;
    }

    fn arm_in(&mut self, from_silence: bool) {
        self.position = match self.mode {
            _ if from_silence => 0,
            FadeMode::FadeOut => self.mirrored(),
            FadeMode::FadeIn => self.position,
            // Already at unity gain
            FadeMode::Plain => return,
        };
        self.mode = FadeMode::FadeIn;
        self.target = None;
        self.rewind = false;
    }

    fn reset(&mut self) {
        *self = Self::new(self.window);
    }

    #[inline]
    fn gain(&self) -> f32 {
        match self.mode {
            FadeMode::Plain => 1.0,
            FadeMode::FadeOut => raised_cosine_out(self.position, self.window),
            FadeMode::FadeIn => raised_cosine_in(self.position, self.window),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeRequest {
    Out { target: Option<Track>, rewind: bool },
    In,
}

/// Latest request of each kind since the previous block
#[derive(Debug, Default)]
struct PendingRequests {
    position: Option<usize>,
    fade: Option<FadeRequest>,
}

#[derive(Debug, Clone, Copy)]
enum LoopEdit {
    Start(usize),
    End(usize),
    Both(usize, usize),
}

/// Player for a reference and its conditions
pub struct ComparisonPlayer {
    set: ComparisonSet,
    active: Option<Track>,
    playing: bool,
    cursor: usize,
    loop_region: LoopRegion,
    fade: FadeState,
    pending: PendingRequests,
    inbox: CommandInbox,
    events: EventSink,
}

impl ComparisonPlayer {
    pub fn new(
        set: ComparisonSet,
        config: &EngineConfig,
        inbox: CommandInbox,
        events: EventSink,
    ) -> Self {
        let loop_region = LoopRegion::new(set.frames(), config.minimum_loop, config.looping);
        Self {
            set,
            active: None,
            playing: false,
            cursor: 0,
            loop_region,
            fade: FadeState::new(config.fade_window),
            pending: PendingRequests::default(),
            inbox,
            events,
        }
    }

    /// Build the player together with its control handle
    pub fn with_handle(set: ComparisonSet, config: &EngineConfig) -> (Self, AudioEngine) {
        let (engine, inbox, events) = AudioEngine::create_channels(config);
        (Self::new(set, config, inbox, events), engine)
    }

    /// Track currently feeding the output (or last fed it)
    pub fn active(&self) -> Option<Track> {
        self.active
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn loop_region(&self) -> &LoopRegion {
        &self.loop_region
    }

    pub fn fade_mode(&self) -> FadeMode {
        self.fade.mode
    }

    pub fn set(&self) -> &ComparisonSet {
        &self.set
    }

    fn position_event(&self, sample: usize) -> Event {
        Event::PositionUpdate {
            sample,
            extent: Extent::SampleRate(self.set.sample_rate()),
            track: self.active,
        }
    }

    fn reject(&mut self, command: Command, reason: Rejection) {
        self.events.emit(Event::CommandRejected { command, reason });
    }

    fn play(&mut self, track: Track) {
        // A stop from this same block still rewinds even if play cancels its fade
        if let Some(FadeRequest::Out { rewind: true, .. }) = self.pending.fade {
            self.pending.position = Some(self.loop_region.start());
        }
        if !self.playing {
            self.active = Some(track);
            self.pending.fade = Some(FadeRequest::In);
        } else if self.active != Some(track) {
            self.pending.fade = Some(FadeRequest::Out {
                target: Some(track),
                rewind: false,
            });
        } else if self.fade.mode == FadeMode::FadeOut && self.fade.target != Some(track) {
            // Leaving this track; turn the ramp around
            self.pending.fade = Some(FadeRequest::In);
        } else {
            self.pending.fade = None;
        }
    }

    fn apply_loop_edit(&mut self, edit: LoopEdit) {
        let result: Result<bool, LoopEditError> = match edit {
            LoopEdit::Start(start) => self.loop_region.set_start(start),
            LoopEdit::End(end) => self.loop_region.set_end(end),
            LoopEdit::Both(start, end) => self.loop_region.set(start, end),
        };
        // Refused edits leave the region alone and stay silent
        if !matches!(result, Ok(true)) {
            return;
        }

        let position = self.pending.position.unwrap_or(self.cursor);
        if let Some(clamped) = self.loop_region.clamp(position) {
            self.pending.position = Some(clamped);
        }
        let (start, end) = (self.loop_region.start(), self.loop_region.end());
        self.events.emit(match edit {
            LoopEdit::Start(_) => Event::LoopStartChanged { start, end },
            LoopEdit::End(_) => Event::LoopEndChanged { start, end },
            LoopEdit::Both(..) => Event::LoopChanged { start, end },
        });
    }

    /// Fold one command into the pending requests
    fn handle_command(&mut self, command: Command) {
        let condition_count = self.set.condition_count();
        match command {
            Command::PlayReference => {
                self.play(Track::Reference);
                self.events
                    .emit(Event::PlayReferenceTriggered { condition_count });
            }
            Command::PlayCondition(index) => {
                if index >= condition_count {
                    return self.reject(command, Rejection::UnknownTrack);
                }
                self.play(Track::Condition(index));
                self.events.emit(Event::PlayConditionTriggered {
                    index,
                    condition_count,
                });
            }
            Command::Pause => {
                if self.playing {
                    self.pending.fade = Some(FadeRequest::Out {
                        target: None,
                        rewind: false,
                    });
                } else if self.pending.fade == Some(FadeRequest::In) {
                    self.pending.fade = None;
                }
                self.events.emit(Event::PauseTriggered { condition_count });
            }
            Command::Stop => {
                let start = self.loop_region.start();
                if self.playing {
                    self.pending.fade = Some(FadeRequest::Out {
                        target: None,
                        rewind: true,
                    });
                } else {
                    self.pending.fade = None;
                    self.pending.position = Some(start);
                }
                self.events.emit(Event::StopTriggered { condition_count });
                let update = self.position_event(start);
                self.events.emit(update);
            }
            Command::SetPosition {
                position,
                loop_edit,
            } => {
                if position >= self.set.frames() {
                    return self.reject(command, Rejection::PositionOutOfRange);
                }
                if loop_edit {
                    if position <= self.loop_region.midpoint() {
                        self.apply_loop_edit(LoopEdit::Start(position));
                    } else {
                        self.apply_loop_edit(LoopEdit::End(position));
                    }
                }
                // The loop end is exclusive; seeking there lands on the loop start
                let position = if position >= self.loop_region.end() {
                    self.loop_region.start()
                } else {
                    position
                };
                self.pending.position = Some(position);
                let update = self.position_event(position);
                self.events.emit(update);
            }
            Command::SetLoopStart(start) => self.apply_loop_edit(LoopEdit::Start(start)),
            Command::SetLoopEnd(end) => self.apply_loop_edit(LoopEdit::End(end)),
            Command::SetLoop { start, end } => self.apply_loop_edit(LoopEdit::Both(start, end)),
            Command::SetLoopingActive(active) => self.loop_region.set_active(active),
            Command::GetPosition(_) => {
                let update = self.position_event(self.cursor);
                self.events.emit(update);
            }
            Command::GetDuration(_) => self.events.emit(Event::Duration {
                track: None,
                frames: self.set.frames(),
            }),
            Command::Play(_) => self.reject(command, Rejection::Unsupported),
        }
    }

    /// Consume the pending record in one step
    fn apply_pending(&mut self) {
        if let Some(position) = self.pending.position.take() {
            self.cursor = position;
        }
        match self.pending.fade.take() {
            Some(FadeRequest::In) => {
                let from_silence = !self.playing;
                self.playing = true;
                self.fade.arm_in(from_silence);
            }
            Some(FadeRequest::Out { target, rewind }) if self.playing => {
                self.fade.arm_out(target, rewind);
            }
            _ => {}
        }
        // Loop edits already clamp; a seek before the loop start plays into it
        if self.cursor >= self.loop_region.end() {
            self.cursor = self.loop_region.start();
        }
    }

    fn render(&mut self, block: &mut AudioBlock<'_>) {
        self.apply_pending();

        let Some(mut track) = self.active else {
            self.playing = false;
            block.fill_silence();
            return;
        };
        if !self.playing {
            block.fill_silence();
            return;
        }
        let Some(mut stimulus) = self.set.track(track) else {
            self.playing = false;
            block.fill_silence();
            return;
        };

        let window = self.fade.window;
        let loop_start = self.loop_region.start();
        let loop_end = self.loop_region.end();
        let looping = self.loop_region.is_active();
        let mut cursor = self.cursor;
        let mut fade = self.fade;
        let mut playing = true;

        for frame in 0..block.frames() {
            // Crossfade the track into itself instead of cutting at the loop end
            if looping && fade.mode != FadeMode::FadeOut && cursor + window == loop_end {
                fade.arm_out(Some(track), false);
            }

            let gain = fade.gain();
            let (left, right) = stimulus.frame(cursor);
            block.write_frame(frame, left * gain, right * gain);
            cursor += 1;

            match fade.mode {
                FadeMode::FadeOut => {
                    fade.position += 1;
                    if fade.position >= window {
                        fade.position = 0;
                        match fade.target {
                            Some(next) => {
                                fade.mode = FadeMode::FadeIn;
                                fade.target = None;
                                if let Some(next_stimulus) = self.set.track(next) {
                                    track = next;
                                    stimulus = next_stimulus;
                                }
                            }
                            None => {
                                if fade.rewind {
                                    cursor = loop_start;
                                }
                                fade.reset();
                                playing = false;
                            }
                        }
                    }
                }
                FadeMode::FadeIn => {
                    fade.position += 1;
                    if fade.position >= window {
                        fade.position = 0;
                        fade.mode = FadeMode::Plain;
                    }
                }
                FadeMode::Plain => {}
            }

            if cursor >= loop_end {
                cursor = loop_start;
                if !looping && playing {
                    playing = false;
                    fade.reset();
                    self.events.emit(Event::Ended { track });
                }
            }

            if !playing {
                block.silence_from(frame + 1);
                break;
            }
        }

        self.cursor = cursor;
        self.fade = fade;
        self.active = Some(track);
        self.playing = playing;
        let update = self.position_event(cursor);
        self.events.emit(update);
    }
}

impl BlockProcessor for ComparisonPlayer {
    fn process(&mut self, block: &mut AudioBlock<'_>) -> bool {
        while let Some(command) = self.inbox.next() {
            self.handle_command(command);
        }
        self.render(block);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::Stimulus;

    const WINDOW: usize = 8;

    fn constant(id: &str, value: f32, frames: usize) -> Stimulus {
        Stimulus::new(id, vec![vec![value; frames]], 48000).unwrap()
    }

    fn config(minimum_loop: usize, looping: bool) -> EngineConfig {
        EngineConfig {
            fade_window: WINDOW,
            minimum_loop,
            looping,
            ..EngineConfig::default()
        }
    }

    /// Reference at 0.1, conditions at 0.2, 0.3, 0.4
    fn player(frames: usize, config: EngineConfig) -> (ComparisonPlayer, AudioEngine) {
        let set = ComparisonSet::new(
            constant("ref", 0.1, frames),
            vec![
                constant("c0", 0.2, frames),
                constant("c1", 0.3, frames),
                constant("c2", 0.4, frames),
            ],
        )
        .unwrap();
        ComparisonPlayer::with_handle(set, &config)
    }

    /// Left channel of one stereo block
    fn run(player: &mut ComparisonPlayer, frames: usize) -> Vec<f32> {
        let mut data = vec![0.0; frames * 2];
        let mut block = AudioBlock::new(&mut data, 2);
        assert!(player.process(&mut block));
        block.channel(0).to_vec()
    }

    fn drain(engine: &mut AudioEngine) -> Vec<Event> {
        engine.events().collect()
    }

    #[test]
    fn test_stopped_player_is_silent() {
        let (mut player, mut engine) = player(1000, config(200, true));
        assert!(run(&mut player, 32).iter().all(|&s| s == 0.0));
        assert!(drain(&mut engine).is_empty());
    }

    #[test]
    fn test_play_from_silence_fades_in() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::PlayReference).unwrap();
        let out = run(&mut player, 32);
        for t in 0..WINDOW {
            let expected = 0.1 * raised_cosine_in(t, WINDOW);
            assert!((out[t] - expected).abs() < 1e-6, "frame {}", t);
        }
        assert!(out[WINDOW..].iter().all(|&s| (s - 0.1).abs() < 1e-6));
        assert_eq!(player.fade_mode(), FadeMode::Plain);

        let events = drain(&mut engine);
        assert_eq!(
            events,
            vec![
                Event::PlayReferenceTriggered { condition_count: 3 },
                Event::PositionUpdate {
                    sample: 32,
                    extent: Extent::SampleRate(48000),
                    track: Some(Track::Reference),
                },
            ]
        );
    }

    #[test]
    fn test_switch_fades_out_then_in() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::PlayCondition(2)).unwrap();
        run(&mut player, 32);

        engine.send(Command::PlayReference).unwrap();
        let out = run(&mut player, WINDOW);
        for t in 0..WINDOW {
            let expected = 0.4 * raised_cosine_out(t, WINDOW);
            assert!((out[t] - expected).abs() < 1e-6, "frame {}", t);
        }
        assert_eq!(player.active(), Some(Track::Reference));
        assert_eq!(player.fade_mode(), FadeMode::FadeIn);

        let out = run(&mut player, WINDOW);
        for t in 0..WINDOW {
            let expected = 0.1 * raised_cosine_in(t, WINDOW);
            assert!((out[t] - expected).abs() < 1e-6, "frame {}", t);
        }
        assert_eq!(player.active(), Some(Track::Reference));
        assert_eq!(player.fade_mode(), FadeMode::Plain);
        // Shared cursor keeps running through the switch
        assert_eq!(player.cursor(), 32 + 2 * WINDOW);
    }

    #[test]
    fn test_switch_is_not_immediate() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::PlayCondition(2)).unwrap();
        run(&mut player, 32);
        engine.send(Command::PlayReference).unwrap();
        run(&mut player, WINDOW / 2);
        assert_eq!(player.active(), Some(Track::Condition(2)));
        assert_eq!(player.fade_mode(), FadeMode::FadeOut);
        run(&mut player, 2 * WINDOW);
        assert_eq!(player.active(), Some(Track::Reference));
    }

    #[test]
    fn test_retarget_during_fade_out() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::PlayCondition(0)).unwrap();
        run(&mut player, 32);
        engine.send(Command::PlayReference).unwrap();
        run(&mut player, WINDOW / 2);
        engine.send(Command::PlayCondition(1)).unwrap();
        let out = run(&mut player, WINDOW / 2);
        // Same ramp keeps going down, no jump back to unity
        assert!(out[0] < 0.2);
        run(&mut player, 2 * WINDOW);
        assert_eq!(player.active(), Some(Track::Condition(1)));
        assert_eq!(player.fade_mode(), FadeMode::Plain);
    }

    #[test]
    fn test_play_during_pause_fade_turns_ramp_around() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::PlayCondition(0)).unwrap();
        run(&mut player, 32);
        engine.send(Command::Pause).unwrap();
        let mut out = run(&mut player, WINDOW / 2);
        assert_eq!(player.fade_mode(), FadeMode::FadeOut);

        engine.send(Command::PlayCondition(0)).unwrap();
        let resumed = run(&mut player, WINDOW);
        // Picks up at the gain the fade-out would have reached next
        let expected = 0.2 * raised_cosine_out(WINDOW / 2, WINDOW);
        assert!((resumed[0] - expected).abs() < 1e-6);
        out.extend(resumed);
        let limit = 0.2 * std::f32::consts::PI / (2.0 * (WINDOW - 1) as f32) + 1e-5;
        for pair in out.windows(2) {
            assert!((pair[1] - pair[0]).abs() <= limit);
        }

        assert!(player.is_playing());
        assert_eq!(player.fade_mode(), FadeMode::Plain);
        assert_eq!(player.active(), Some(Track::Condition(0)));
        assert_eq!(player.cursor(), 32 + WINDOW / 2 + WINDOW);
    }

    #[test]
    fn test_pause_during_fade_in_turns_ramp_around() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::PlayCondition(0)).unwrap();
        let head = run(&mut player, 3);
        assert_eq!(player.fade_mode(), FadeMode::FadeIn);

        engine.send(Command::Pause).unwrap();
        let out = run(&mut player, WINDOW);
        let expected = 0.2 * raised_cosine_in(3, WINDOW);
        assert!((out[0] - expected).abs() < 1e-6);
        assert!(out[0] > head[2]);
        assert!(out[WINDOW - 4..].iter().all(|&s| s == 0.0));
        assert!(!player.is_playing());
        assert_eq!(player.cursor(), 3 + WINDOW - 4);
    }

    #[test]
    fn test_pause_fades_to_silence_and_keeps_cursor() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::PlayCondition(0)).unwrap();
        run(&mut player, 32);
        engine.send(Command::Pause).unwrap();
        let out = run(&mut player, 32);
        assert!((out[0] - 0.2).abs() < 1e-6);
        assert!(out[WINDOW..].iter().all(|&s| s == 0.0));
        assert!(!player.is_playing());
        assert_eq!(player.cursor(), 32 + WINDOW);
        assert!(drain(&mut engine).contains(&Event::PauseTriggered { condition_count: 3 }));

        // Resumes from the preserved cursor
        engine.send(Command::PlayCondition(0)).unwrap();
        run(&mut player, 16);
        assert_eq!(player.cursor(), 32 + WINDOW + 16);
    }

    #[test]
    fn test_stop_rewinds_to_loop_start() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 100, end: 900 }).unwrap();
        engine.send(Command::PlayReference).unwrap();
        run(&mut player, 64);
        assert_eq!(player.cursor(), 164);
        let _ = drain(&mut engine);

        engine.send(Command::Stop).unwrap();
        run(&mut player, 32);
        assert!(!player.is_playing());
        assert_eq!(player.cursor(), 100);
        let events = drain(&mut engine);
        assert_eq!(events[0], Event::StopTriggered { condition_count: 3 });
        assert!(matches!(events[1], Event::PositionUpdate { sample: 100, .. }));
    }

    #[test]
    fn test_looping_wraps_without_end_event() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 0, end: 300 }).unwrap();
        engine.send(Command::PlayReference).unwrap();
        for _ in 0..25 {
            run(&mut player, 16);
        }
        assert_eq!(player.cursor(), 100);
        assert!(player.is_playing());
        assert!(!drain(&mut engine)
            .iter()
            .any(|e| matches!(e, Event::Ended { .. })));
    }

    #[test]
    fn test_non_looping_stops_once_at_loop_end() {
        let (mut player, mut engine) = player(1000, config(200, false));
        engine.send(Command::SetLoop { start: 0, end: 300 }).unwrap();
        engine.send(Command::PlayReference).unwrap();
        let mut out = Vec::new();
        for _ in 0..25 {
            out.extend(run(&mut player, 16));
        }
        assert!(!player.is_playing());
        assert_eq!(player.cursor(), 0);
        assert!(out[300..].iter().all(|&s| s == 0.0));
        let ended = drain(&mut engine)
            .into_iter()
            .filter(|e| *e == Event::Ended { track: Track::Reference })
            .count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn test_loop_seam_is_smooth() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 0, end: 256 }).unwrap();
        engine.send(Command::PlayReference).unwrap();
        let mut out = Vec::new();
        for _ in 0..20 {
            out.extend(run(&mut player, 32));
        }
        let limit = 0.1 * std::f32::consts::PI / (2.0 * (WINDOW - 1) as f32) + 1e-5;
        for pair in out.windows(2) {
            assert!((pair[1] - pair[0]).abs() <= limit);
        }
        // The seam reaches silence right before the wrap
        assert!(out[255].abs() < 1e-6);
        assert!(out[256].abs() < 1e-6);
    }

    #[test]
    fn test_set_loop_emits_one_event() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 100, end: 700 }).unwrap();
        run(&mut player, 4);
        assert_eq!(
            drain(&mut engine),
            vec![Event::LoopChanged { start: 100, end: 700 }]
        );
        assert_eq!(
            (player.loop_region().start(), player.loop_region().end()),
            (100, 700)
        );
    }

    #[test]
    fn test_invalid_loop_edits_are_ignored() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 0, end: 500 }).unwrap();
        run(&mut player, 4);
        let _ = drain(&mut engine);

        for command in [
            Command::SetLoopStart(350),
            Command::SetLoopStart(500),
            Command::SetLoopEnd(1001),
            Command::SetLoopEnd(150),
            Command::SetLoop { start: 400, end: 300 },
            Command::SetLoop { start: 800, end: 900 },
            Command::SetLoop { start: 0, end: 1200 },
        ] {
            engine.send(command).unwrap();
        }
        run(&mut player, 4);
        assert!(drain(&mut engine).is_empty());
        assert_eq!(
            (player.loop_region().start(), player.loop_region().end()),
            (0, 500)
        );
    }

    #[test]
    fn test_loop_edit_moves_nearer_boundary() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine
            .send(Command::SetPosition { position: 300, loop_edit: true })
            .unwrap();
        engine
            .send(Command::SetPosition { position: 800, loop_edit: true })
            .unwrap();
        run(&mut player, 4);
        let events = drain(&mut engine);
        assert!(events.contains(&Event::LoopStartChanged { start: 300, end: 1000 }));
        assert!(events.contains(&Event::LoopEndChanged { start: 300, end: 800 }));
        assert_eq!(
            (player.loop_region().start(), player.loop_region().end()),
            (300, 800)
        );
    }

    #[test]
    fn test_cursor_clamped_into_new_region() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::PlayReference).unwrap();
        run(&mut player, 64);
        engine.send(Command::SetLoopStart(600)).unwrap();
        run(&mut player, 10);
        assert_eq!(player.cursor(), 610);

        // Past the new end wraps to the new start
        engine.send(Command::SetLoop { start: 100, end: 400 }).unwrap();
        run(&mut player, 10);
        assert_eq!(player.cursor(), 110);

        engine.send(Command::SetLoopStart(200)).unwrap();
        run(&mut player, 10);
        assert_eq!(player.cursor(), 210);
    }

    #[test]
    fn test_seek_before_loop_start_is_honoured() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 100, end: 900 }).unwrap();
        engine
            .send(Command::SetPosition { position: 50, loop_edit: false })
            .unwrap();
        engine.send(Command::PlayReference).unwrap();
        run(&mut player, 16);
        assert_eq!(player.cursor(), 66);
        assert!(drain(&mut engine).contains(&Event::PositionUpdate {
            sample: 50,
            extent: Extent::SampleRate(48000),
            track: None,
        }));

        run(&mut player, 16);
        assert_eq!(player.cursor(), 82);
    }

    #[test]
    fn test_seek_to_loop_end_lands_on_loop_start() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 100, end: 600 }).unwrap();
        engine
            .send(Command::SetPosition { position: 700, loop_edit: false })
            .unwrap();
        run(&mut player, 4);
        let events = drain(&mut engine);
        assert!(matches!(
            events.last(),
            Some(Event::PositionUpdate { sample: 100, .. })
        ));
        assert_eq!(player.cursor(), 100);
    }

    #[test]
    fn test_stop_then_play_in_one_block_keeps_rewind() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 100, end: 900 }).unwrap();
        engine.send(Command::PlayReference).unwrap();
        run(&mut player, 128);
        assert_eq!(player.cursor(), 228);

        engine.send(Command::Stop).unwrap();
        engine.send(Command::PlayReference).unwrap();
        run(&mut player, 16);
        assert!(player.is_playing());
        assert_eq!(player.cursor(), 116);
    }

    #[test]
    fn test_rejections_and_queries() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::Play(0)).unwrap();
        engine.send(Command::PlayCondition(7)).unwrap();
        engine
            .send(Command::SetPosition { position: 1000, loop_edit: false })
            .unwrap();
        engine.send(Command::GetDuration(0)).unwrap();
        engine
            .send(Command::SetPosition { position: 250, loop_edit: false })
            .unwrap();
        run(&mut player, 4);
        engine.send(Command::GetPosition(0)).unwrap();
        run(&mut player, 4);

        let events = drain(&mut engine);
        assert_eq!(
            events,
            vec![
                Event::CommandRejected {
                    command: Command::Play(0),
                    reason: Rejection::Unsupported
                },
                Event::CommandRejected {
                    command: Command::PlayCondition(7),
                    reason: Rejection::UnknownTrack
                },
                Event::CommandRejected {
                    command: Command::SetPosition { position: 1000, loop_edit: false },
                    reason: Rejection::PositionOutOfRange
                },
                Event::Duration { track: None, frames: 1000 },
                Event::PositionUpdate {
                    sample: 250,
                    extent: Extent::SampleRate(48000),
                    track: None
                },
                Event::PositionUpdate {
                    sample: 250,
                    extent: Extent::SampleRate(48000),
                    track: None
                },
            ]
        );
        assert!(!player.is_playing());
    }

    #[test]
    fn test_looping_toggle_takes_effect() {
        let (mut player, mut engine) = player(1000, config(200, true));
        engine.send(Command::SetLoop { start: 0, end: 200 }).unwrap();
        engine.send(Command::SetLoopingActive(false)).unwrap();
        engine.send(Command::PlayCondition(1)).unwrap();
        for _ in 0..20 {
            run(&mut player, 16);
        }
        assert!(!player.is_playing());
        assert!(!player.loop_region().is_active());
    }
}
