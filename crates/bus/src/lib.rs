pub mod client;
pub mod delivery;
pub mod error;
pub mod topology;
pub mod trait_def;

pub use {
    client::{Bus, PullConsumer},
    delivery::{Delivery, DeliveryHandle},
    error::{Error, Result},
    trait_def::{Consumer, MessageBus},
};
