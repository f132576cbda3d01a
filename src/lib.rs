pub mod ast;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod error;
pub mod error_mode;
pub mod eval;
pub mod level;
pub mod parser;
pub mod pdata;
pub mod processor;
pub mod resolver;
pub mod telemetry;
pub mod walker;

// Re-exports
pub use cache::CacheManager;
pub use compiler::{BuiltinCompiler, PathReference, SourceKind, StatementCompiler};
pub use config::Config;
pub use error::*;
pub use error_mode::ErrorMode;
pub use level::ContextLevel;
pub use pdata::*;
pub use processor::{Processor, StatementGroup};
pub use resolver::{ContextResolver, Resolution};
pub use telemetry::{
    DiagnosticLevel, DiagnosticsSink, InMemoryMetrics, MetricsSnapshot, NopDiagnostics,
    NopMetrics, ProcessorMetrics, TelemetrySettings, TracingDiagnostics,
};
pub use walker::{HierarchyWalker, NodeId};
