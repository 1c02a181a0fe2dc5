//! # pipesync-remote
//!
//! Team-scoped access to pipelines on a remote CI server.
//!
//! A [`Connector`] authenticates once per team and hands back an
//! [`Arc<dyn RemoteClient>`](RemoteClient) that lists, fetches, writes and
//! deletes pipelines for that team. Two backends implement the pair:
//! [`http::HttpConnector`] speaks the server's HTTP API directly and
//! [`fly::FlyConnector`] drives the `fly` command-line binary.

pub mod client;
pub mod error;
pub mod fly;
pub mod http;

pub use client::{connector_for, Connector, ConnectorOptions, RemoteClient};
pub use error::RemoteError;
