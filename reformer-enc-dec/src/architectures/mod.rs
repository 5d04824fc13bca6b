//! Traits for model architectures and their collaborators.
use candle_nn::VarBuilder;

mod adapters;
pub use adapters::{BuildDecoderAdapter, BuildEncoderAdapter, TrainingModel};

mod sequence_model;
pub use sequence_model::{
    BuildSequenceModel, SequenceModel, SequenceModelInputs, SequenceModelInputsError,
    SequenceModelOutput,
};

use crate::error::BoxedError;

/// Trait for building model architectures.
pub trait BuildArchitecture {
    /// The architecture to build.
    type Architecture;

    /// Build the architecture.
    fn build(&self, vb: VarBuilder) -> Result<Self::Architecture, BoxedError>;
}
