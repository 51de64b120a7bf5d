//! Bearer token verification backed by a JSON Web Key Set.

pub mod jwks;

pub use jwks::{JwksVerifier, KeySource, RemoteJwks};
