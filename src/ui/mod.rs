pub mod icons;
pub mod progress;
pub mod report;

pub use progress::GenerationUi;
pub use report::{print_generation_summary, print_validation_report};
