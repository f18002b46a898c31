//! Ground-support tooling for the skylink telemetry bus.
//!
//! Boards exchange fixed-layout packets over a byte-stuffed serial link.
//! This crate ties the pieces together:
//!
//! - [`frame`]: wire framing, streaming decoder, connections
//! - [`schema`]: board/packet definitions, validation, packet catalog
//! - [`codegen`]: embedded C and catalog generation
//! - [`decode`]: catalog-driven runtime decoding

/// Re-export frame types.
pub mod frame {
    pub use skylink_frame::*;
}

/// Re-export schema types.
pub mod schema {
    pub use skylink_schema::*;
}

/// Re-export code generation types.
pub mod codegen {
    pub use skylink_codegen::*;
}

/// Re-export runtime decoding types.
pub mod decode {
    pub use skylink_decode::*;
}
