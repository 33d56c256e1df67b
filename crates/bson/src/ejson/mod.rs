//! Extended JSON bridge: canonical and relaxed conversion between BSON
//! values and `serde_json` trees.
//!
//! Canonical mode wraps every BSON-specific type in its `$`-keyed
//! wrapper object (`$oid`, `$numberLong`, `$binary`, ...), round-tripping
//! every variant exactly. Relaxed mode prefers native JSON numbers and
//! ISO-8601 dates where the value fits. The decoder accepts both modes.

mod decoder;
mod encoder;
mod error;
mod iso;

pub use decoder::EjsonDecoder;
pub use encoder::{EjsonEncoder, EjsonEncoderOptions};
pub use error::EjsonDecodeError;
