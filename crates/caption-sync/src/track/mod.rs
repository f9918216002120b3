//! Caption track storage and position resolution

pub mod caption;
pub mod resolver;

pub use caption::{CaptionEntry, CaptionTrack};
pub use resolver::CaptionResolver;
