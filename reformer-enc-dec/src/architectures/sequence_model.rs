use std::fmt::Debug;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use snafu::{ResultExt, Snafu};

use crate::error::BoxedError;
use crate::kwargs::{KwArg, KwArgs};
use crate::layers::attention::{AttentionMask, AttentionMaskError};

/// Sequence model output.
#[derive(Clone, Debug)]
pub enum SequenceModelOutput {
    /// Hidden representations.
    ///
    /// *Shape:* `(batch_size, seq_len, dim)`
    Embeddings(Tensor),

    /// Unnormalized next-piece probabilities.
    ///
    /// *Shape:* `(batch_size, seq_len, n_pieces)`
    Logits(Tensor),

    /// Training loss.
    Loss(Tensor),
}

impl SequenceModelOutput {
    /// Hidden representations, if the model returned embeddings.
    pub fn embeddings(&self) -> Option<&Tensor> {
        match self {
            SequenceModelOutput::Embeddings(embeddings) => Some(embeddings),
            _ => None,
        }
    }

    /// Logits, if the model returned logits.
    pub fn logits(&self) -> Option<&Tensor> {
        match self {
            SequenceModelOutput::Logits(logits) => Some(logits),
            _ => None,
        }
    }

    /// Loss, if the model returned a loss.
    pub fn loss(&self) -> Option<&Tensor> {
        match self {
            SequenceModelOutput::Loss(loss) => Some(loss),
            _ => None,
        }
    }
}

/// Sequence model inputs besides the input sequence itself.
#[derive(Clone, Debug, Default)]
pub struct SequenceModelInputs {
    /// Mask of the input sequence.
    ///
    /// *Shape:* `(batch_size, seq_len)`
    pub input_mask: Option<AttentionMask>,

    /// Mask of the context (`keys`) that the model attends to.
    ///
    /// *Shape:* `(batch_size, context_len)`
    pub context_mask: Option<AttentionMask>,

    /// Context representations for cross-attention, such as encoder
    /// outputs.
    ///
    /// *Shape:* `(batch_size, context_len, dim)`
    pub keys: Option<Tensor>,

    /// Remaining arguments, passed through to the model as-is.
    pub extra: KwArgs<KwArg>,
}

/// Errors when converting keyword arguments to sequence model inputs.
#[derive(Debug, Snafu)]
pub enum SequenceModelInputsError {
    #[snafu(display("Argument '{name}' must be a {expected}, was a {found}"))]
    IncorrectKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[snafu(display("Cannot use argument '{name}' as a mask"))]
    InvalidMask {
        source: AttentionMaskError,
        name: String,
    },
}

fn take_mask(
    kwargs: &mut KwArgs<KwArg>,
    name: &str,
) -> Result<Option<AttentionMask>, SequenceModelInputsError> {
    match kwargs.remove(name) {
        None => Ok(None),
        Some(KwArg::Mask(mask)) => Ok(Some(mask)),
        Some(KwArg::Tensor(tensor)) => AttentionMask::new(tensor)
            .map(Some)
            .context(InvalidMaskSnafu { name }),
        Some(arg) => IncorrectKindSnafu {
            name,
            expected: "mask",
            found: arg.kind(),
        }
        .fail(),
    }
}

fn take_tensor(
    kwargs: &mut KwArgs<KwArg>,
    name: &str,
) -> Result<Option<Tensor>, SequenceModelInputsError> {
    match kwargs.remove(name) {
        None => Ok(None),
        Some(KwArg::Tensor(tensor)) => Ok(Some(tensor)),
        Some(arg) => IncorrectKindSnafu {
            name,
            expected: "tensor",
            found: arg.kind(),
        }
        .fail(),
    }
}

impl TryFrom<KwArgs<KwArg>> for SequenceModelInputs {
    type Error = SequenceModelInputsError;

    fn try_from(mut kwargs: KwArgs<KwArg>) -> Result<Self, Self::Error> {
        Ok(SequenceModelInputs {
            input_mask: take_mask(&mut kwargs, "input_mask")?,
            context_mask: take_mask(&mut kwargs, "context_mask")?,
            keys: take_tensor(&mut kwargs, "keys")?,
            extra: kwargs,
        })
    }
}

/// Trait for sequence models.
pub trait SequenceModel {
    /// Apply the model to an input sequence.
    ///
    /// Returns embeddings, logits or a loss, depending on how the model
    /// was configured.
    ///
    /// * `input` - Input sequence.
    ///   *Shape:* `(batch_size, seq_len)`
    /// * `inputs` - Masks, context and other model arguments.
    /// * `train` - Whether to train the model.
    fn forward_t(
        &self,
        input: &Tensor,
        inputs: &SequenceModelInputs,
        train: bool,
    ) -> Result<SequenceModelOutput, BoxedError>;
}

/// Trait for building sequence models.
pub trait BuildSequenceModel: Debug {
    /// Model configuration.
    type Config;

    /// Build a sequence model.
    ///
    /// * `config` - Model configuration.
    /// * `vb` - Variable builder for the model parameters.
    fn build(
        &self,
        config: &Self::Config,
        vb: VarBuilder,
    ) -> Result<Box<dyn SequenceModel>, BoxedError>;
}
