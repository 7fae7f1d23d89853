//! A library for colour palette extraction and image recolouring.
//!
//! `nievette` partitions the CIELAB colour space (D65 illuminant) into
//! fixed-size cubes, keeps the cubes whose pixel population passes a two-tier
//! relevancy test, and rewrites every pixel of the image to the mean colour of
//! its own or nearest relevant cube. The result is a recoloured image, the
//! colour palette it uses, and the relative frequency of each palette colour.
//!
//! # Features
//! To reduce dependencies and compile times, `nievette` has a couple of
//! `cargo` features that can be turned off or on:
//! - `pipelines`: exposes a builder struct that serves as the high-level API.
//! - `image`: enables integration with the [`image`] crate.
//!
//! # High-Level API
//! To get started with the high-level API, see [`ExtractionPipeline`].
//! It has examples in its documentation, but here is an additional example:
//! ```no_run
//! # use nievette::{ExtractionPipeline, PartitionStrategy, PaletteOutcome};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("some image")?.into_rgb8();
//!
//! let outcome = ExtractionPipeline::try_from(&img)?
//!     .cube_size(20) // set the CIELAB side length of the partitioning cubes
//!     .strategy(PartitionStrategy::Centred)
//!     .extract()?;
//!
//! if let PaletteOutcome::Completed(result) = outcome {
//!     for (colour, frequency) in result.palette.iter().zip(&result.frequencies) {
//!         println!("{colour:?}: {frequency:.3}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! For progress reporting and cooperative cancellation, pass a
//! [`ProgressMonitor`] via [`ExtractionPipeline::extract_with`] or
//! [`generate_palette`].

#![deny(unsafe_code)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod colorspace;
mod error;
mod progress;
mod types;

pub mod nieves;

#[cfg(feature = "pipelines")]
mod api;

pub use error::*;
pub use nieves::{generate_palette, NievesOptions, PartitionStrategy};
pub use progress::{CancellationToken, ProgressMonitor};
pub use types::*;

#[cfg(feature = "pipelines")]
pub use api::*;

/// The maximum supported image size in number of pixels is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;
