//! PulseBot Backend Library
//!
//! Core engines for inbound social-event decisioning and outbound content
//! scheduling/publishing. Binaries and integration tests compose these
//! modules over the repository implementations in `storage`.

pub mod analysis;
pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod metrics;
pub mod models;
pub mod publishing;
pub mod scheduling;
pub mod storage;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::AppConfig;
pub use decision::engine::{DecisionEngine, DecisionEngineResult};
pub use error::{CoreError, CoreResult};
pub use models::{BrandContext, Platform, SocialEvent};
pub use publishing::PublishingManager;
pub use scheduling::SchedulingEngine;
