pub mod alerts;
pub mod gate;
pub mod news;
pub mod orchestrator;
pub mod rate_limiter;
pub mod reconciler;
