pub mod preprocessing;
pub mod lines;
pub mod extraction;
pub mod detection;
pub mod segmentation;
pub mod ordering;
pub mod grouping;
pub mod assembly;

pub use preprocessing::*;
pub use lines::*;
pub use extraction::*;
pub use detection::*;
pub use segmentation::*;
pub use grouping::*;
pub use assembly::*;
