pub mod audit;
pub mod client;
pub mod driver;
pub mod grpc;
pub mod memory;
pub mod model;

// Re-export tonic for external tests that need matching versions
pub use tonic;
