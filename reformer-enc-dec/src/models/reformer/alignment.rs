use candle_core::Tensor;
use snafu::{ensure, OptionExt, ResultExt, Snafu};

use crate::architectures::{
    BuildEncoderAdapter, SequenceModel, SequenceModelInputs, SequenceModelOutput,
};
use crate::error::BoxedError;
use crate::models::reformer::ReformerLMConfig;

/// Bucket alignment adapter configuration.
///
/// Locality-sensitive hashing attention splits a sequence into chunks
/// of two buckets. This adapter does not pad, it only rejects inputs
/// whose length is not a multiple of `2 * bucket_size`. Suitable when
/// inputs are already aligned; inputs of arbitrary length need an adapter
/// that pads.
#[derive(Clone, Debug, Default)]
pub struct BucketAlignmentConfig;

impl BuildEncoderAdapter for BucketAlignmentConfig {
    type Config = ReformerLMConfig;

    fn wrap(
        &self,
        model: Box<dyn SequenceModel>,
        config: &Self::Config,
    ) -> Result<Box<dyn SequenceModel>, BoxedError> {
        let bucket_size = config.bucket_size;
        ensure!(bucket_size > 0, ZeroBucketSizeSnafu);
        let multiple = bucket_size
            .checked_mul(2)
            .context(BucketSizeOverflowSnafu { bucket_size })?;

        Ok(Box::new(BucketAlignment {
            inner: model,
            multiple,
        }))
    }
}

/// Bucket alignment errors.
#[derive(Debug, Snafu)]
pub enum BucketAlignmentError {
    #[snafu(display("Bucket size {bucket_size} is too large to align inputs to"))]
    BucketSizeOverflow { bucket_size: usize },

    #[snafu(display("Input must have shape (batch_size, seq_len)"))]
    InputShape { source: candle_core::Error },

    #[snafu(display("Input mask length ({mask_len}) differs from input length ({seq_len})"))]
    MaskLength { mask_len: usize, seq_len: usize },

    #[snafu(display("Input length {seq_len} is not a multiple of {multiple}"))]
    UnalignedInput { multiple: usize, seq_len: usize },

    #[snafu(display("Bucket size must be larger than zero"))]
    ZeroBucketSize,
}

/// Sequence model wrapper that checks bucket alignment.
struct BucketAlignment {
    inner: Box<dyn SequenceModel>,
    multiple: usize,
}

impl SequenceModel for BucketAlignment {
    fn forward_t(
        &self,
        input: &Tensor,
        inputs: &SequenceModelInputs,
        train: bool,
    ) -> Result<SequenceModelOutput, BoxedError> {
        let (_, seq_len) = input.shape().dims2().context(InputShapeSnafu)?;
        let multiple = self.multiple;
        ensure!(
            seq_len % multiple == 0,
            UnalignedInputSnafu { multiple, seq_len }
        );

        if let Some(mask) = &inputs.input_mask {
            let mask_len = mask.seq_len();
            ensure!(mask_len == seq_len, MaskLengthSnafu { mask_len, seq_len });
        }

        self.inner.forward_t(input, inputs, train)
    }
}
