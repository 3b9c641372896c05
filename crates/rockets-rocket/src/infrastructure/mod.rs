//! Infrastructure adapters for the Rocket context.

pub mod in_memory_repository;
