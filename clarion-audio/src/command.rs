//! Commands sent from the control thread to a playback engine

/// Addresses one playable track.
///
/// The multi-track player addresses its stimuli by index, the comparison player
/// addresses the reference and its conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Stimulus(usize),
    Reference,
    Condition(usize),
}

/// Control commands. Small and `Copy` so they fit a lock-free ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start or switch to a stimulus (multi-track player)
    Play(usize),
    PlayReference,
    PlayCondition(usize),
    Pause,
    Stop,
    /// Jump to a frame; with `loop_edit` the position also moves the nearer
    /// loop boundary (comparison player)
    SetPosition { position: usize, loop_edit: bool },
    SetLoopStart(usize),
    SetLoopEnd(usize),
    SetLoop { start: usize, end: usize },
    SetLoopingActive(bool),
    /// Ask for a `PositionUpdate` of the given track
    GetPosition(usize),
    /// Ask for a `Duration` of the given track
    GetDuration(usize),
}

impl Command {
    /// Short name used in logs and diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Command::Play(_) => "play",
            Command::PlayReference => "play_reference",
            Command::PlayCondition(_) => "play_condition",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::SetPosition { .. } => "set_position",
            Command::SetLoopStart(_) => "set_loop_start",
            Command::SetLoopEnd(_) => "set_loop_end",
            Command::SetLoop { .. } => "set_loop",
            Command::SetLoopingActive(_) => "set_looping_active",
            Command::GetPosition(_) => "get_position",
            Command::GetDuration(_) => "get_duration",
        }
    }
}
