//! Request / response types for the public API.

pub mod chat;
