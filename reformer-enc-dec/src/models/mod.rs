pub mod reformer;
pub use reformer::{ReformerEncDec, ReformerEncDecConfig, ReformerLMConfig};

pub mod util;
