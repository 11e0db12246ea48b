//! End-to-end tests driving the engine against a loopback line-protocol peer.

#[cfg(test)]
mod negotiation;
