pub mod architectures;
pub mod error;
pub mod kwargs;
pub mod layers;
pub mod models;
