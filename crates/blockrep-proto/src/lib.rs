//! blockrep Protocol - gRPC service definitions
//!
//! This crate contains the protobuf-generated code for the replicated
//! block store that blockrep clients talk to.

/// Block store service (streaming block writes and reads)
pub mod store {
    tonic::include_proto!("blockrep.store");
}
