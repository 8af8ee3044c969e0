//! Wire format: one UTF-8 JSON job record followed by a single `\n`.

pub mod codec;
pub mod validator;

pub use codec::{decode_job, encode_job, read_job};
