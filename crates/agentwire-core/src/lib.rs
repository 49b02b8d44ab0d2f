//! Core types and error definitions for the agentwire framework.
//!
//! This crate provides the foundational types shared by the RPC client and the
//! orchestration layer: the error taxonomy every agent call reports through, and
//! the descriptor that identifies a remote agent.
//!
//! # Main types
//!
//! - [`AgentwireError`]: Unified error enum for transport, protocol, task and discovery failures.
//! - [`AgentwireResult`]: Convenience alias for `Result<T, AgentwireError>`.
//! - [`ErrorInfo`]: Cloneable, serializable capture of an error for result reports.
//! - [`AgentDescriptor`]: Resolved location and capabilities of a remote agent.

/// Agent descriptor type and descriptor-document parsing.
pub mod descriptor;
/// Error taxonomy.
pub mod error;

pub use descriptor::AgentDescriptor;
pub use error::{AgentwireError, AgentwireResult, ErrorInfo};
