//! `smeta-core` — Shared primitives for the pricing engine.
//!
//! Rounding policy, normalized-name keys, and business-locale collation.
//! Everything numeric downstream goes through [`round2`]; everything that
//! groups or looks up by material name goes through [`normalize_name`].

pub mod collate;
pub mod numeric;
pub mod text;
pub mod types;

pub use collate::collate_names;
pub use numeric::{prices_equal, round2, PRICE_EPSILON};
pub use text::normalize_name;
pub use types::{ItemType, RateScope};
