use std::fmt::Debug;

use candle_core::Tensor;

use crate::architectures::{SequenceModel, SequenceModelInputs, SequenceModelOutput};
use crate::error::BoxedError;

/// Trait for building encoder adapters.
///
/// An encoder adapter wraps a sequence model, normalizing its inputs
/// (e.g. padding them to a length that the model can process) while
/// preserving the wrapped model's call contract.
pub trait BuildEncoderAdapter: Debug {
    /// Configuration of the wrapped model.
    type Config;

    /// Wrap a sequence model.
    ///
    /// * `model` - The model to wrap.
    /// * `config` - Configuration that `model` was built from.
    fn wrap(
        &self,
        model: Box<dyn SequenceModel>,
        config: &Self::Config,
    ) -> Result<Box<dyn SequenceModel>, BoxedError>;
}

/// Trait for models that can be trained and used for generation.
pub trait TrainingModel {
    /// Apply the model to a target sequence.
    ///
    /// * `input` - Target sequence.
    ///   *Shape:* `(batch_size, seq_len)`
    /// * `return_loss` - Return the training loss rather than logits.
    /// * `inputs` - Masks, encoder keys and other model arguments.
    /// * `train` - Whether to train the model.
    fn forward_t(
        &self,
        input: &Tensor,
        return_loss: bool,
        inputs: &SequenceModelInputs,
        train: bool,
    ) -> Result<SequenceModelOutput, BoxedError>;

    /// Generate a sequence autoregressively.
    ///
    /// * `start` - Sequence to start generating from.
    ///   *Shape:* `(batch_size, start_len)`
    /// * `seq_len` - Number of pieces to generate.
    /// * `inputs` - Masks, encoder keys and generation arguments.
    ///
    /// Returns the generated pieces.
    /// *Shape:* `(batch_size, seq_len)`
    fn generate(
        &self,
        start: &Tensor,
        seq_len: usize,
        inputs: &SequenceModelInputs,
    ) -> Result<Tensor, BoxedError>;
}

/// Trait for building decoder adapters.
///
/// A decoder adapter wraps a sequence model to add training loss
/// computation and autoregressive generation.
pub trait BuildDecoderAdapter: Debug {
    /// Configuration of the wrapped model.
    type Config;

    /// Wrap a sequence model.
    ///
    /// * `model` - The model to wrap.
    /// * `config` - Configuration that `model` was built from.
    fn wrap(
        &self,
        model: Box<dyn SequenceModel>,
        config: &Self::Config,
    ) -> Result<Box<dyn TrainingModel>, BoxedError>;
}
