//! Test utilities and module declarations for auth-state tests.

mod memory_store;

pub(crate) use memory_store::MemoryStore;
