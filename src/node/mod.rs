pub mod client;
pub mod model;
pub mod stream;

pub use client::{ContainerSpec, HttpTransport, NodeClient, Transport};
