//! Reformer encoder-decoder (Kitaev et al., 2020).
//!
//! See [Reformer: The Efficient Transformer](https://arxiv.org/abs/2001.04451).
mod alignment;
pub use alignment::{BucketAlignmentConfig, BucketAlignmentError};

mod config;
pub use config::ReformerLMConfig;

mod enc_dec;
pub use enc_dec::{
    ReformerEncDec, ReformerEncDecConfig, ReformerEncDecConfigError, ReformerEncDecError,
    DEFAULT_ENCODER_BUCKET_SIZE,
};
