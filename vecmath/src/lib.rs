//! Fixed-dimension vector operations shared by the face store and matcher.
//!
//! All functions take `&[f32]` embeddings and accumulate in `f64`, so the
//! result does not depend on which side of a comparison a vector sits.

mod error;
mod math;

pub use error::VecMathError;
pub use math::{cosine_similarity, distance, is_degenerate, mean, norm};
