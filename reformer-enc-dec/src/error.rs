use std::error::Error;

/// Boxed error that can be sent across threads.
///
/// Used wherever errors cross the boundary of an injected model, adapter,
/// or factory, so that their concrete error types stay opaque.
pub type BoxedError = Box<dyn Error + Send + Sync>;
