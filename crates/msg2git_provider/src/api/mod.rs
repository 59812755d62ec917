//! HTTP-API provider backend, and the shared client/issue/asset logic the
//! clone backend also depends on.

pub mod assets;
pub mod client;
pub mod contents;
pub mod issues;
pub mod provider;
pub mod release_mutex;

pub use client::ApiClient;
pub use provider::ApiProvider;
pub use release_mutex::ReleaseMutexTable;
