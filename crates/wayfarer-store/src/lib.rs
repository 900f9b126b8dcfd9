//! Wayfarer session persistence.
//!
//! `SessionStore` owns the session list and the active selection; it is the
//! single writer for message state. Persistence goes through the synchronous
//! `KvStore` trait, backed by SQLite in production and an in-memory map in
//! tests.

pub mod kv;
pub mod store;

pub use kv::{KvStore, MemoryKv, SqliteKv};
pub use store::SessionStore;
