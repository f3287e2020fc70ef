//! # domus-mailer
//!
//! Durable email delivery queue for the Domus listings backend.
//!
//! Business callers hand an email to the [`dispatcher::Dispatcher`], which
//! persists it as an [`model::EmailTask`] and drives it through the retry
//! state machine (`Queued → Retrying → Sent | Failed`) with exponential
//! backoff. A periodic [`scheduler::Scheduler`] sweep re-drives tasks that
//! survived a crash or were parked by configuration. Delivery is
//! at-least-once; callers poll the [`store::TaskStore`] by id for final
//! status.

pub mod backoff;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod escalation;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod transport;
pub mod worker;
