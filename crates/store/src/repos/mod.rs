//! Repository traits for store operations.

pub mod assets;
pub mod projects;
pub mod tokens;

pub use assets::AssetRepo;
pub use projects::ProjectRepo;
pub use tokens::TokenRepo;
