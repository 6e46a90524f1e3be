//! Analysis backend integration and section derivation

pub mod client;
pub mod sections;

pub use client::AnalysisClient;
pub use sections::{EnergyHeuristicPolicy, SectionPolicy};
