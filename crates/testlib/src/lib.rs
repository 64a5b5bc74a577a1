//! In-memory fakes for the workspace's dependency-injection seams
//! ([`bus::MessageBus`], [`hot_state::HotStore`]), grounded in the teacher's
//! own test-double conventions (`crates/shared/src/*` fakes used by
//! `autopilot`'s integration tests). Used by binary crates' `#[cfg(test)]`
//! modules and integration tests that don't want a real NATS/Redis.

pub mod fake_bus;
pub mod fake_hot_state;

pub use {fake_bus::FakeBus, fake_hot_state::FakeHotStore};
