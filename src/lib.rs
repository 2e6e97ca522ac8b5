#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]
//! Error chains that carry key/value metadata, render as a tree for
//! terminals and round-trip through JSON maps.
//!
//! ```
//! use errtree::{PlainError, attach_meta, read_meta, render, wrap, Scalar, TraceStyle};
//!
//! let err = wrap(Some(PlainError::new("email in use")), "failed to create user").unwrap();
//! let err = attach_meta(err, "code", "503");
//! let err = wrap(Some(err), "failed to register").unwrap();
//!
//! assert_eq!(read_meta(&err, "code"), Some(&Scalar::from("503")));
//! let text = render(&err, &TraceStyle::plain());
//! assert!(text.contains("failed to create user"));
//! ```

pub mod chain;
pub mod codec;
pub mod error;
pub mod render;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use chain::walker::{Link, classify, fanout};
pub use chain::{
    BoxError, Cause, ErrorNode, Joined, PlainError, ResultExt, attach_meta, attach_metas, join,
    merged_meta, read_all_meta, read_meta, wrap,
};
pub use codec::{
    decode, decode_from_json, encode, encode_to_json, encode_to_json_pretty, normalize_json,
    render_json,
};
pub use error::Error;
pub use render::style::{
    Glyphs, Palette, Rgb, Token, TraceStyle, global_style, set_banner, set_color,
    set_colors_enabled, set_global_style, set_glyphs,
};
pub use render::{render, trace};
pub use types::{Metadata, Scalar};
