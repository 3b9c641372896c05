//! Domain layer for the Rocket context.

pub mod aggregates;
pub mod events;
pub mod repository;
pub mod services;
pub mod value_objects;
