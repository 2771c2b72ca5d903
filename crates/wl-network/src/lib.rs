//! wl-network: water distribution network model for waterleak.
//!
//! Provides:
//! - Network data structures (junctions, reservoirs, tanks, pipes, patterns)
//! - Incremental network builder with validation
//! - Contiguous junction indexing for the leak-localization core
//!
//! # Example
//!
//! ```
//! use wl_core::{lps, m, mm};
//! use wl_network::{Junction, NetworkBuilder, Pipe, Reservoir};
//!
//! let mut builder = NetworkBuilder::new();
//! let src = builder.add_reservoir("R1", Reservoir::new(m(50.0)));
//! let j1 = builder.add_junction("J1", Junction::new(m(10.0), lps(2.0)));
//! builder.add_pipe("P1", src, j1, Pipe::new(m(500.0), mm(200.0), 120.0));
//! let net = builder.build().unwrap();
//!
//! assert_eq!(net.junction_count(), 1);
//! assert_eq!(net.pipes().len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod indexing;
pub mod network;
pub(crate) mod validate;

pub use builder::NetworkBuilder;
pub use error::{NetworkError, NetworkResult};
pub use indexing::JunctionIndex;
pub use network::{
    Junction, Link, Network, Node, NodeKind, Pattern, Pipe, Reservoir, Tank, TimeOptions,
};
