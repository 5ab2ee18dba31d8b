pub mod progress;
pub mod review;
pub mod sync;
