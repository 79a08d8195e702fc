//! Core type definitions for the articulated-body pipeline.
//!
//! This module contains the fundamental types that flow through every
//! algorithm: joint enums, body mass properties, Model and Data.

pub(crate) mod body;
pub(crate) mod data;
pub(crate) mod enums;
pub(crate) mod model;
pub(crate) mod model_factories;

pub use body::Body;
pub use data::Data;
pub use enums::*;
pub use model::{Model, STANDARD_GRAVITY};
