//! A2A-style agent RPC for Agentwire.
//!
//! Provides the JSON-RPC envelopes and result normalisation, an HTTP
//! [`RpcTransport`], descriptor resolution through well-known documents or an
//! [`AgentRegistry`], the submit-then-poll [`TaskLifecycleClient`], and a small
//! [`AgentServer`] that exposes any [`AgentCompute`] function over the same
//! protocol.

/// Submit-then-poll task client.
pub mod client;
/// Client timeouts and poll interval.
pub mod config;
/// JSON-RPC envelopes and result normalisation.
pub mod protocol;
/// Agent registries.
pub mod registry;
/// Descriptor resolution.
pub mod resolver;
/// In-process agent server.
pub mod server;
/// Task state machine.
pub mod task;
/// RPC transports.
pub mod transport;

pub use client::{AgentCaller, TaskLifecycleClient, TaskOutcome};
pub use config::ClientConfig;
pub use protocol::{RpcRequest, RpcResponse, SendResult, TaskGetResponse};
pub use registry::{AgentRegistry, HttpRegistry, InMemoryRegistry};
pub use resolver::{DescriptorResolver, RegistryResolver, WellKnownResolver};
pub use server::{AgentCompute, AgentServer, ComputeError, ResponseMode};
pub use task::{TaskRecord, TaskState};
pub use transport::{CallOptions, HttpTransport, RpcTransport};
