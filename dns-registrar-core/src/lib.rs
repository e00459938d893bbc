//! Subdomain Registrar Core Library
//!
//! Business logic for a community subdomain registrar:
//! - Configuration unit schema, validation and expansion (Registry)
//! - Domain-wide validation rules and owner quotas
//! - Reconciliation of desired records against provider zone state
//! - Concurrent HTTP health probing of registered names
//!
//! Provider access goes through the `dns-registrar-provider` gateway trait;
//! everything here is provider-independent.

pub mod config;
pub mod deploy;
pub mod error;
pub mod health;
pub mod quota;
pub mod registry;
pub mod schema;
pub mod validator;

// Re-export common types
pub use config::{DomainInfo, GlobalConfig};
pub use deploy::{diff_records, DeploymentDiff, DomainDeployer, MAX_DIFF_OPERATIONS};
pub use error::{CoreError, CoreResult};
pub use health::{HealthCheckResult, HealthProber, RateGate};
pub use quota::GlobalQuotaChecker;
pub use registry::{DomainRegistry, RegisteredUnit, RegistryStats, UnitFailure};
pub use schema::{DomainConfig, ExpandedDnsRecord, FieldIssue};
pub use validator::{validate, IssueScope, Severity, ValidationIssue, ValidationReport};
