//! Resource types and the values they expose.
//!
//! A resource type is the shape of a payload a provider can be armed with.
//! It declares, once, the names of the values it exposes for injection and
//! knows how to read each of them from an instance:
//!
//! - [`Resource`] - The exposing trait, usually derived
//! - [`Value`] - A type-erased exposed value
//! - [`Payload`] - A type-erased armed instance
//!
//! # Example
//!
//! ```
//! use armory_core::Resource;
//! use armory_core::resource::{Resource, read_value};
//!
//! #[derive(Resource)]
//! #[resource(accessors(area))]
//! struct Rect {
//!     width: u32,
//!     height: u32,
//!     #[resource(skip)]
//!     label: String,
//! }
//!
//! impl Rect {
//!     fn area(&self) -> u32 {
//!         self.width * self.height
//!     }
//! }
//!
//! assert_eq!(Rect::provides(), &["width", "height", "area"]);
//!
//! let rect = Rect { width: 3, height: 4, label: "r".into() };
//! let area = rect.resource("area").unwrap();
//! assert_eq!(read_value::<u32>(&area), Some(12));
//! assert!(rect.resource("label").is_none());
//! ```

#[expect(
    clippy::module_inception,
    reason = "resource.rs contains the core Resource trait and value helpers"
)]
mod resource;

pub use resource::{Payload, Resource, ResourceId, Value, into_value, read_value};
