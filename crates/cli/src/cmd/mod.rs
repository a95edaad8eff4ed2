mod build;
mod call;
mod init;
mod manifest;

pub use build::cmd_build;
pub use call::cmd_call;
pub use init::cmd_init;
pub use manifest::cmd_manifest;
