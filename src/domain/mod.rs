//! Domain entities the pricing engine reads from and writes back to.
pub mod aggregates;
pub mod events;
pub mod value_objects;
