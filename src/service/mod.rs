//! Repository implementations and contract validation.

mod crud;
mod memory;
mod validation;
pub use crud::PgRepository;
pub use memory::MemoryRepository;
pub use validation::RequestValidator;
