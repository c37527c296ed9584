//! pixmill-io: Concrete targets and codecs for the pixmill engine.
//!
//! Provides the [`ImageSurface`] (encoded `src`, like an `<img>`) and
//! [`CanvasSurface`] (raw RGBA) implementations of
//! [`pixmill_engine::Surface`], plus PNG/JPEG encoding, data-URI
//! handling, and file helpers used by the command-line tool.

pub mod codec;
pub mod data_uri;
pub mod surfaces;

pub use codec::SurfaceIoError;
pub use data_uri::{DataUri, DataUriError};
pub use surfaces::{CanvasSurface, ImageSurface};
