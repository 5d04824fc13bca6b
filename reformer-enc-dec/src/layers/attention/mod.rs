mod mask;
pub use mask::{AttentionMask, AttentionMaskError};
