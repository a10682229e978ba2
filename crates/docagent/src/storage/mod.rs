pub mod filesystem;
pub mod store;

pub use filesystem::FsFileStore;
pub use store::FileStore;
