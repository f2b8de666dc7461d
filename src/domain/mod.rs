pub mod conversion;
pub mod math;

pub use conversion::{ConversionResult, PipelineSummary};
pub use math::{DisplayMode, MathNode, OutputMode};
