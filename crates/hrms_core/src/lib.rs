//! HRMS Client Core
//!
//! Client-side core of the HR-management application, providing:
//! - A fingerprint-keyed query cache with load deduplication
//! - Declarative cache invalidation after mutations, including the
//!   two-phase profile cascade
//! - The session bootstrap state machine (gate, login, provisioning)
//! - A debounced, role-gated global search aggregator
//!
//! # Quick Start
//!
//! ```
//! use hrms_core::{keys, EmployeeId, Invalidation};
//!
//! // Every read is cached under a fingerprint.
//! assert_eq!(keys::employee(EmployeeId(42)).as_str(), "employee:42");
//!
//! // A prefix target covers every search of the employee directory.
//! let all_searches = Invalidation::Prefix(keys::employees());
//! assert!(all_searches.matches(&keys::employee_search("ada")));
//! assert!(!all_searches.matches(&keys::employee(EmployeeId(42))));
//! ```
//!
//! # Features
//!
//! ## Access Gate
//!
//! The gate records a display name before login and seeds auto-provisioning:
//!
//! ```
//! use hrms_core::{GateStore, MemoryGateStore};
//!
//! let gate = MemoryGateStore::new();
//! let record = gate.complete(" Ada ", "Lovelace").unwrap();
//! assert_eq!(record.display_name(), Some("Ada Lovelace"));
//! assert!(gate.complete("  ", "").is_err());
//! ```
//!
//! ## Invalidation Table
//!
//! ```
//! use hrms_core::{invalidation_plan, EmployeeId, GoalStatus, Mutation, MutationOutput};
//!
//! let plan = invalidation_plan(
//!     &Mutation::UpdateGoalProgress {
//!         employee_id: EmployeeId(7),
//!         goal_id: 1,
//!         progress: 80,
//!         status: GoalStatus::InProgress,
//!     },
//!     &MutationOutput::Done,
//! );
//! // The goal list plus every cached global search.
//! assert_eq!(plan.immediate.len(), 2);
//! assert!(!plan.cascade);
//! ```

mod bootstrap;
mod cache;
mod client;
mod config;
mod error;
mod fingerprint;
mod gate;
mod identity;
mod invalidation;
mod memory_service;
mod mutation;
mod notify;
mod search;
mod service;
mod types;

pub use bootstrap::{SessionBootstrap, SessionState};
pub use cache::{CacheMetrics, CacheStore, EntryStatus, FetchOptions, Subscriber, SubscriptionId};
pub use client::{Completed, RecordClient};
pub use config::{CacheConfig, Config, GateConfig, SearchConfig, CONFIG_FILE};
pub use error::{HrmsError, Result};
pub use fingerprint::{keys, Fingerprint, Invalidation, KeyPart};
pub use gate::{full_name, FileGateStore, GateRecord, GateStore, MemoryGateStore};
pub use identity::{IdentityContext, IdentityProvider, IdentityStatus, LocalIdentityProvider};
pub use invalidation::{
    describe as describe_plan, plan as invalidation_plan, InvalidationCoordinator,
    InvalidationPlan, InvalidationReport,
};
pub use memory_service::{EmployeeItems, InMemoryRecordService, Seed, SeedProfile};
pub use mutation::{Mutation, MutationOutput};
pub use notify::{Notification, NotificationCenter, NotificationLevel};
pub use search::{
    describe as describe_result, NavigationTarget, Route, SearchAggregator, SearchBucket,
    SearchBuckets, SearchOutcome, SearchView,
};
pub use service::RecordService;
pub use types::*;
