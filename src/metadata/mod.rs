//! Metadata access for live debuggee modules and on-disk images.
//!
//! Two very different sources feed this module. A paused debuggee
//! exposes per-module metadata through an IMetaDataImport-style
//! interface, modeled by [`import::MetadataImport`] and consumed by the
//! algorithms in [`reader`]. An on-disk image exposes raw physical
//! metadata, parsed by [`physical`] for the one query the entry-point
//! resolver needs. Both speak the same ECMA-335 vocabulary: tokens,
//! table ids, signature blobs.
//!
//! # Key Components
//!
//! - [`token`] - Metadata table row references used throughout .NET
//! - [`import`] - The live metadata seam plus per-row property records
//! - [`reader`] - Name resolution, member queries and recognizers
//! - [`signature`] - Method and field signature parsing
//! - [`cor20`] - The CLR header of a PE image
//! - [`physical`] - Standalone metadata parsing for on-disk images
//!
//! # Examples
//!
//! ```rust
//! use dotprobe::metadata::signature::{parse_field_sig, TypeSig};
//!
//! let field_type = parse_field_sig(&[0x06, 0x0E])?;
//! assert!(matches!(field_type, TypeSig::String));
//! # Ok::<(), dotprobe::Error>(())
//! ```

/// Implementation of the CLR (COR20) header of a PE image
pub mod cor20;
/// The seam to a live module's metadata, plus per-row property records
pub mod import;
/// Implementation of standalone physical metadata parsing
pub mod physical;
/// Name resolution, member queries and recognizers over an import
pub mod reader;
/// Implementation of method and field signatures
pub mod signature;
/// Commonly used metadata token type
pub mod token;
