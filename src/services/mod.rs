//! Document processing services.
//!
//! Routing, filing and delivery are kept apart from the watcher and CLI so
//! both the long-running watcher and one-shot batch runs share them.

pub mod delivery;
pub mod mover;
pub mod pipeline;
pub mod router;

pub use delivery::{CommandDelivery, Delivery, DeliveryError, NoDelivery};
pub use mover::{DestinationMover, MoveError};
pub use pipeline::ScanPipeline;
pub use router::{decide, DocumentRouter, ProcessingStage};
