mod fake_peer;
mod integration;
