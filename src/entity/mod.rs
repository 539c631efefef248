//! Sea-ORM entities mirroring the vault schema managed by the
//! `migration` crate.

pub mod access_log;
pub mod user;
pub mod vault;
pub mod vault_nominee;
