//! hostwatch - monitoring daemon configuration pipeline
//!
//! This library turns a tree of template-based `define` files into the flat,
//! duplicate-checked object set the monitoring daemon runs against. One
//! [`session::LoadSession`] owns a whole load: ingestion and directive
//! dispatch, template resolution, group expansion, object fan-out,
//! cross-object default inheritance, and finally registration with an
//! external [`register::ObjectBuilder`] or serialization as a pre-flattened
//! object cache.

pub mod constants;
pub mod errors;
pub mod records;
pub mod register;
pub mod session;
pub mod skiplist;

mod cache;
mod duplicate;
mod expand;
mod parse;
mod reader;
mod resolve;
