//! # ct-app
//!
//! Application layer for CoTab shared tab-group collaboration: the flow
//! controller and the process-wide collaboration service, driving the
//! `ct-core` ports.

pub mod usecases;

pub use usecases::collaboration::{
    CollaborationConfig, CollaborationController, CollaborationMetrics, CollaborationService,
    ServiceStatusSource,
};
