//! Request / response DTO types for the public HTTP API.
//!
//! Annotated with [`utoipa`] attributes to generate the OpenAPI schema.

pub mod api;
