//! Resource creation saga and compensation.
//!
//! A saga walks the states in [`SagaState`], records every remote resource
//! it creates as a [`ResourceHandle`](crate::platform::ResourceHandle), and
//! on failure hands that list to [`compensate`].

mod compensation;
mod config;
mod creative;
mod error;
mod runner;
mod state;

pub use compensation::{compensate, CompensationResult};
pub use config::{AdDefaults, AdSetDefaults, CampaignDefaults, CreationDefaults};
pub use creative::{ad_name, build_ad, build_creative, creative_name, UploadedMedia};
pub use error::{ItemError, SagaError};
pub use runner::{ItemFailure, SagaReport, SagaRunner};
pub use state::{InvalidTransition, SagaState, SagaStateMachine};
