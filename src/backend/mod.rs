pub mod memory;
pub mod postgrest;
pub mod traits;
pub mod types;

pub use memory::MemoryBackend;
pub use postgrest::PostgrestBackend;
pub use traits::Backend;
