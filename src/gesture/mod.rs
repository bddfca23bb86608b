mod hold;

pub use hold::{HoldDetector, HoldId, HoldSignal};
