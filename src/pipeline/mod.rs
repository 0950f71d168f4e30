// Post-run processing: flatten nested payloads and assemble the output table

pub mod flatten;
pub mod normalize;

pub use normalize::{normalize, FlatTable};
