pub mod credentials;
pub mod hashing;
pub mod store;

// Re-exports for convenience
pub use credentials::{
    AccessKeyPair, CredentialError, CredentialProvider, GpgCredentialProvider, Passphrase,
};
pub use hashing::compute_file_md5;
pub use store::{MemoryObjectStore, ObjectStore, S3Config, S3ObjectStore, StoreError};
