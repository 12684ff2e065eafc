//! REST boundary for the opsdeck control plane

pub mod http;
