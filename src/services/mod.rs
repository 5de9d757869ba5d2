pub mod verdict_analyzer;

pub use verdict_analyzer::{classify, Classification, VerdictAnalyzer};
