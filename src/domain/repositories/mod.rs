//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for data operations; implementations live in
//! `crate::infrastructure::persistence`. Mock implementations are generated
//! via `mockall` for unit tests.

pub mod profile_repository;

pub use profile_repository::ProfileRepository;

#[cfg(test)]
pub use profile_repository::MockProfileRepository;
