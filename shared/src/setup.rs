//! Ordered level setup
//!
//! Stages complete one at a time, in order. The simulation starts only once every stage is done.

use std::fmt;

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetupStage {
    Physics,
    Terrain,
    Structures,
    Player,
}

impl SetupStage {
    pub const ORDER: [SetupStage; 4] = [
        SetupStage::Physics,
        SetupStage::Terrain,
        SetupStage::Structures,
        SetupStage::Player,
    ];

    pub fn next(self) -> Option<SetupStage> {
        match self {
            SetupStage::Physics => Some(SetupStage::Terrain),
            SetupStage::Terrain => Some(SetupStage::Structures),
            SetupStage::Structures => Some(SetupStage::Player),
            SetupStage::Player => None,
        }
    }
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStage::Physics => "physics",
            SetupStage::Terrain => "terrain",
            SetupStage::Structures => "structures",
            SetupStage::Player => "player",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// A required asset was absent after loading.
    MissingAsset { stage: SetupStage, path: String },
    /// A stage reported completion before its predecessors.
    OutOfOrder {
        expected: Option<SetupStage>,
        got: SetupStage,
    },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::MissingAsset { stage, path } => {
                write!(f, "{stage} setup: missing asset {path}")
            }
            SetupError::OutOfOrder {
                expected: Some(expected),
                got,
            } => write!(f, "{got} setup finished before {expected}"),
            SetupError::OutOfOrder { expected: None, got } => {
                write!(f, "{got} setup finished after setup was already complete")
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// Load progress of one asset a stage depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Progress {
    Running(SetupStage),
    Ready,
    Failed(SetupError),
}

/// Tracks setup progress. Failure is terminal until [`SetupPipeline::reset`].
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct SetupPipeline {
    progress: Progress,
}

impl Default for SetupPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupPipeline {
    pub fn new() -> Self {
        Self {
            progress: Progress::Running(SetupStage::Physics),
        }
    }

    /// Stage waiting to complete, if any.
    pub fn current(&self) -> Option<SetupStage> {
        match self.progress {
            Progress::Running(stage) => Some(stage),
            Progress::Ready | Progress::Failed(_) => None,
        }
    }

    /// Mark `stage` done. Returns the next stage to run, or `None` once ready.
    pub fn complete(&mut self, stage: SetupStage) -> Result<Option<SetupStage>, SetupError> {
        if let Progress::Failed(err) = &self.progress {
            return Err(err.clone());
        }

        let expected = self.current();
        if expected != Some(stage) {
            let err = SetupError::OutOfOrder { expected, got: stage };
            self.progress = Progress::Failed(err.clone());
            return Err(err);
        }

        self.progress = match stage.next() {
            Some(next) => Progress::Running(next),
            None => Progress::Ready,
        };
        Ok(stage.next())
    }

    /// True once every asset has loaded. The first failed asset fails the pipeline.
    pub fn await_assets<P: Into<String>>(
        &mut self,
        stage: SetupStage,
        assets: impl IntoIterator<Item = (P, AssetStatus)>,
    ) -> bool {
        let mut all_loaded = true;
        for (path, status) in assets {
            match status {
                AssetStatus::Loaded => {}
                AssetStatus::Pending => all_loaded = false,
                AssetStatus::Failed => {
                    self.fail(SetupError::MissingAsset {
                        stage,
                        path: path.into(),
                    });
                    return false;
                }
            }
        }
        all_loaded
    }

    pub fn fail(&mut self, error: SetupError) {
        self.progress = Progress::Failed(error);
    }

    pub fn is_ready(&self) -> bool {
        self.progress == Progress::Ready
    }

    pub fn error(&self) -> Option<&SetupError> {
        match &self.progress {
            Progress::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error().is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_order_reaches_ready() {
        let mut pipeline = SetupPipeline::new();
        for stage in SetupStage::ORDER {
            assert!(!pipeline.is_ready());
            assert_eq!(pipeline.current(), Some(stage));
            assert_eq!(pipeline.complete(stage), Ok(stage.next()));
        }
        assert!(pipeline.is_ready());
        assert_eq!(pipeline.current(), None);
    }

    #[test]
    fn test_out_of_order_fails() {
        let mut pipeline = SetupPipeline::new();
        let err = pipeline.complete(SetupStage::Terrain).unwrap_err();
        assert_eq!(
            err,
            SetupError::OutOfOrder {
                expected: Some(SetupStage::Physics),
                got: SetupStage::Terrain
            }
        );
        assert!(pipeline.is_failed());
        // Failure sticks
        assert!(pipeline.complete(SetupStage::Physics).is_err());
    }

    #[test]
    fn test_missing_asset_is_terminal() {
        let mut pipeline = SetupPipeline::new();
        pipeline.complete(SetupStage::Physics).unwrap();
        pipeline.fail(SetupError::MissingAsset {
            stage: SetupStage::Terrain,
            path: "models/ice.glb".into(),
        });

        assert!(!pipeline.is_ready());
        assert_eq!(pipeline.current(), None);
        assert_eq!(
            pipeline.error().map(ToString::to_string),
            Some("terrain setup: missing asset models/ice.glb".to_string())
        );

        pipeline.reset();
        assert_eq!(pipeline.current(), Some(SetupStage::Physics));
    }

    #[test]
    fn test_await_assets_waits_for_every_asset() {
        let mut pipeline = SetupPipeline::new();
        let assets = [
            ("models/low_poly_male.glb", AssetStatus::Loaded),
            ("models/low_poly_male.glb#Animation3", AssetStatus::Pending),
        ];
        assert!(!pipeline.await_assets(SetupStage::Physics, assets));
        assert!(!pipeline.is_failed());

        let assets = [
            ("models/low_poly_male.glb", AssetStatus::Loaded),
            ("models/low_poly_male.glb#Animation3", AssetStatus::Loaded),
        ];
        assert!(pipeline.await_assets(SetupStage::Physics, assets));
    }

    #[test]
    fn test_await_assets_fails_on_missing_clip() {
        let mut pipeline = SetupPipeline::new();
        let assets = [
            ("models/low_poly_male.glb", AssetStatus::Pending),
            ("models/low_poly_male.glb#Animation5", AssetStatus::Failed),
        ];

        assert!(!pipeline.await_assets(SetupStage::Player, assets));
        assert_eq!(
            pipeline.error(),
            Some(&SetupError::MissingAsset {
                stage: SetupStage::Player,
                path: "models/low_poly_male.glb#Animation5".to_string(),
            })
        );
    }

    #[test]
    fn test_completing_twice_is_out_of_order() {
        let mut pipeline = SetupPipeline::new();
        for stage in SetupStage::ORDER {
            pipeline.complete(stage).unwrap();
        }
        assert!(matches!(
            pipeline.complete(SetupStage::Player),
            Err(SetupError::OutOfOrder { expected: None, .. })
        ));
    }
}
