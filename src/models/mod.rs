pub mod audit_log;
pub mod insights;
pub mod probe_result;
pub mod timing;

// Re-export core models for easy access
pub use audit_log::AuditLogEntry;
pub use probe_result::{HttpResponse, ProbeResult, TcpResponse};
pub use timing::{HttpTiming, TimingPhases};
