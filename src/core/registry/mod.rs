pub mod client;
pub mod model;

pub use client::{ByteStream, ModrinthClient, RegistryClient};
pub use model::{FileHashes, Project, User, Version, VersionFile};
