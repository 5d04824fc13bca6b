use candle_core::Tensor;
use snafu::{ensure, Snafu};

/// Errors for attention masks.
#[derive(Debug, Snafu)]
pub enum AttentionMaskError {
    #[snafu(display("Attention mask must be 2D, was {}D", n_dims))]
    InvalidDims { n_dims: usize },
}

/// Attention mask.
///
/// Sequence elements for which the corresponding mask element is set to
/// `false` are ignored during attention calculation. Used both for the
/// input mask of a sequence model and for the context mask that marks
/// which encoder outputs the decoder may attend to. Guaranteed to be
/// a 2D array.
#[derive(Clone, Debug)]
pub struct AttentionMask {
    bool_mask: Tensor,
}

impl AttentionMask {
    /// Create an attention mask.
    ///
    /// * `bool_mask` - Boolean mask tensor.
    ///   *Shape:* `(batch_size, seq_len)`
    pub fn new(bool_mask: Tensor) -> Result<Self, AttentionMaskError> {
        let n_dims = bool_mask.dims().len();
        ensure!(n_dims == 2, InvalidDimsSnafu { n_dims });
        Ok(AttentionMask { bool_mask })
    }

    /// Get the boolean mask.
    ///
    /// *Shape:* `(batch_size, seq_len)`
    pub fn bool_mask(&self) -> &Tensor {
        &self.bool_mask
    }

    /// Length of the masked sequence.
    pub fn seq_len(&self) -> usize {
        self.bool_mask.dims()[1]
    }
}
