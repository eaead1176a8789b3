//! Surface configuration negotiation.
//!
//! Turns a caller's capability request into one driver-advertised
//! configuration, walking multisample levels before falling back to
//! single-sampled configurations.

mod chooser;
mod request;

pub use chooser::{ConfigChooser, MINIMUM_COLOR_CHANNEL_SIZE, MULTISAMPLE_LEVELS, describe};
pub use request::CapabilityRequest;
