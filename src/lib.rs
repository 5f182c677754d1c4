//! pagetour - guided tours that span several pages of a site
//!
//! A tour is an ordered list of steps, each anchored to an element on a
//! named page. [`controller::TourController`] drives a tour through the
//! current page, hands progress over to the next page through durable
//! storage and a one-shot URL parameter, and resumes it after the load.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod handoff;
pub mod layout;
pub mod logging;
pub mod navigator;
pub mod render;
pub mod resolver;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod site;
pub mod state;
pub mod ui;

pub use catalog::{StepCatalog, StepDescriptor, TourFile};
pub use config::Config;
pub use controller::{Completion, Phase, TourController};
pub use error::TourError;
pub use session::{Action, TourSession};
pub use state::{JsonFileStore, MemoryStore, StateStore, TourState};
