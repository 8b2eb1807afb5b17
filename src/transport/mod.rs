use std::{borrow::Cow, error::Error};

use async_trait::async_trait;
use tonic::{body::BoxBody, client::GrpcService};

use crate::credentials::ConfigError;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{context}")]
    Connection {
        context: Cow<'static, str>,
        #[source]
        source: Option<BoxError>,
    },
}

impl TransportError {
    /// Build a connection error with optional context and source.
    pub fn connection<S, E>(context: S, source: E) -> Self
    where
        S: Into<Cow<'static, str>>,
        E: Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a connection error that only has context (no underlying source).
    pub fn connection_message<S>(context: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self::Connection {
            context: context.into(),
            source: None,
        }
    }
}

/// Source of the gRPC channel and per-call credentials used by [`crate::LndClient`].
///
/// Implementations build their channel lazily on the first [`service`](Transport::service) call
/// and hand out cheap clones afterwards, so one channel serves every RPC issued through a client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The underlying gRPC service used by tonic clients.
    type Svc: GrpcService<BoxBody> + Clone + Send + Sync + 'static;

    /// Return a tonic-compatible gRPC service bound to the node.
    async fn service(&self) -> Result<Self::Svc, TransportError>;

    /// Per-request metadata headers (key, value) attached to Lightning calls.
    async fn metadata(&self) -> Result<Vec<(String, String)>, TransportError> {
        Ok(Vec::new())
    }
}

#[cfg(feature = "transport-direct")]
pub mod direct;
