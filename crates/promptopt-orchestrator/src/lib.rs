//! Drives a full optimization run: the Loop Orchestrator sequences
//! evaluation, pair mining, patch synthesis, the champion/challenger
//! tournament, and checkpointing; the Task Store tracks run progress; the
//! Telemetry Sink records latency and in-flight call counts; the champion
//! store persists the current champion between runs.

pub mod champion_store;
pub mod loop_orchestrator;
pub mod task_store;
pub mod telemetry;

pub use loop_orchestrator::{CancellationToken, LoopConfig, LoopOrchestrator};
pub use task_store::TaskStore;
pub use telemetry::{LatencyHistogram, TelemetrySink, TelemetrySnapshot};
