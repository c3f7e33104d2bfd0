//! The SNAP on-wire message: types, canonical signing, a fluent builder, and
//! the validator pipeline (spec.md §3-4).

pub mod builder;
pub mod signing;
pub mod types;
pub mod validator;

pub use builder::MessageBuilder;
pub use signing::{sign, sign_with_aux_rand, signing_digest, verify, verify_self, SigningError};
pub use types::{MessageType, SnapMessage, PROTOCOL_VERSION};
pub use validator::{validate, validate_structure, ValidateOptions};
