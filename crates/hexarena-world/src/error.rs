//! Error types for the `hexarena-world` crate.
//!
//! Grid queries never fail: out-of-range lookups return `None` or an empty
//! collection. Errors only arise when rebuilding a grid from its wire form.

use hexarena_types::HexCoord;

/// Errors that can occur while decoding grid data.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A coordinate key was not of the form `"q,r"`.
    #[error("malformed coordinate key: {0:?}")]
    MalformedKey(String),

    /// A serialized tile lies outside the grid radius.
    #[error("coordinate {coord} is outside a grid of radius {radius}")]
    OutOfBounds {
        /// The offending coordinate.
        coord: HexCoord,
        /// The grid radius.
        radius: u32,
    },

    /// The radius cannot be represented as a signed axial coordinate.
    #[error("grid radius {0} is too large")]
    RadiusTooLarge(u32),
}
