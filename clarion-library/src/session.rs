//! Session assembly: which stimuli are loaded and which player drives them

use crate::loader::{LoadError, StimulusLoader};
use clarion_audio::{
    AudioEngine, BlockProcessor, ComparisonPlayer, ComparisonSet, EngineConfig, MultiTrackPlayer,
    Stimulus, StimulusError, StimulusStore,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no stimulus files were given")]
    NoStimuli,
    #[error("a comparison needs at least one condition")]
    NoConditions,
    #[error("failed to load '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error(transparent)]
    Stimulus(#[from] StimulusError),
}

/// Loaded stimuli for one listening page
#[derive(Debug)]
pub enum Session {
    /// Independent stimuli, one cursor each
    Generic(StimulusStore),
    /// Reference plus conditions on a shared cursor
    Comparison(ComparisonSet),
}

fn load_all(loader: &StimulusLoader, paths: &[PathBuf]) -> Result<Vec<Stimulus>, SessionError> {
    paths
        .iter()
        .map(|path| load_one(loader, path))
        .collect()
}

fn load_one(loader: &StimulusLoader, path: &Path) -> Result<Stimulus, SessionError> {
    loader.load(path).map_err(|source| SessionError::Load {
        path: path.to_path_buf(),
        source,
    })
}

impl Session {
    /// Load independent stimuli, in order
    pub fn generic(loader: &StimulusLoader, paths: &[PathBuf]) -> Result<Self, SessionError> {
        if paths.is_empty() {
            return Err(SessionError::NoStimuli);
        }
        Self::from_stimuli(load_all(loader, paths)?)
    }

    /// Load a reference and its conditions
    pub fn comparison(
        loader: &StimulusLoader,
        reference: &Path,
        conditions: &[PathBuf],
    ) -> Result<Self, SessionError> {
        if conditions.is_empty() {
            return Err(SessionError::NoConditions);
        }
        let reference = load_one(loader, reference)?;
        Self::from_comparison(reference, load_all(loader, conditions)?)
    }

    pub fn from_stimuli(stimuli: Vec<Stimulus>) -> Result<Self, SessionError> {
        let store = StimulusStore::new(stimuli)?;
        info!(stimuli = store.len(), sample_rate = store.sample_rate(), "generic session ready");
        Ok(Session::Generic(store))
    }

    pub fn from_comparison(
        reference: Stimulus,
        conditions: Vec<Stimulus>,
    ) -> Result<Self, SessionError> {
        if conditions.is_empty() {
            return Err(SessionError::NoConditions);
        }
        let set = ComparisonSet::new(reference, conditions)?;
        info!(
            conditions = set.condition_count(),
            frames = set.frames(),
            sample_rate = set.sample_rate(),
            "comparison session ready"
        );
        Ok(Session::Comparison(set))
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            Session::Generic(store) => store.sample_rate(),
            Session::Comparison(set) => set.sample_rate(),
        }
    }

    /// Names shown for the number keys, in index order
    pub fn labels(&self) -> Vec<String> {
        match self {
            Session::Generic(store) => store.iter().map(|s| s.id().to_string()).collect(),
            Session::Comparison(set) => set.condition_ids().map(str::to_string).collect(),
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Session::Comparison(_))
    }

    /// Build the player for the audio thread and the handle for the control thread
    pub fn into_player(self, config: &EngineConfig) -> (Box<dyn BlockProcessor>, AudioEngine) {
        match self {
            Session::Generic(store) => {
                let (player, engine) = MultiTrackPlayer::with_handle(store, config);
                (Box::new(player), engine)
            }
            Session::Comparison(set) => {
                let (player, engine) = ComparisonPlayer::with_handle(set, config);
                (Box::new(player), engine)
            }
        }
    }
}
