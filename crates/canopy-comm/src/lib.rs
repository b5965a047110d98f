//! Message-passing substrate for SPMD process groups.
//!
//! Every distributed operation in Canopy goes through the
//! [`Communicator`] trait: point-to-point traffic is expressed as an
//! [`all_to_all`](Communicator::all_to_all) exchange, and the reductions
//! the solver needs (timestep minimum, cell-count sums, change flags)
//! are built on top of it.
//!
//! # Backends
//!
//! - [`SerialComm`]: a group of one; every collective is a local no-op.
//! - [`ProcessGroup`]: an in-process group running one thread per rank,
//!   each holding a [`GroupComm`] connected to its peers by FIFO channels.
//!
//! All collectives are blocking and must be called by every rank in the
//! same order. A rank that leaves the group early (error or panic) drops
//! its channel endpoints, and every peer waiting on it receives
//! [`CommError::PeerDisconnected`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod communicator;
pub mod error;
pub mod group;
pub mod serial;

pub use communicator::Communicator;
pub use error::CommError;
pub use group::{GroupComm, ProcessGroup};
pub use serial::SerialComm;
