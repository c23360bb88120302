use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Cry error: {0}")]
    Cry(#[from] core_playback::CryError),

    #[error("Invalid creature name: {0:?}")]
    InvalidName(String),

    #[error("Creature not found: {0}")]
    CreatureNotFound(String),

    #[error("Creature lookup failed: {0}")]
    CreatureLookup(String),

    #[error("Creature {0} has no cry")]
    MissingCry(String),
}

impl CoreError {
    /// Whether the failure came from the creature lookup rather than the cry
    /// pipeline.
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidName(_)
                | CoreError::CreatureNotFound(_)
                | CoreError::CreatureLookup(_)
                | CoreError::MissingCry(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bridge_surfaces_as_runtime_error() {
        let err = CoreError::from(core_runtime::Error::CapabilityMissing {
            capability: "PlaybackAdapter".to_string(),
            message: "inject one or enable desktop-shims".to_string(),
        });

        assert!(matches!(
            &err,
            CoreError::Runtime(core_runtime::Error::CapabilityMissing { capability, .. })
                if capability == "PlaybackAdapter"
        ));
        assert!(!err.is_lookup_error());
        assert!(err.to_string().contains("PlaybackAdapter"));
    }
}
