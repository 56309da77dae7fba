//! The tracker delivery layers: the HTTP and UDP tracker front ends and the
//! admin REST API, plus the shutdown signal plumbing they share.
pub mod apis;
pub mod http;
pub mod signals;
pub mod udp;
