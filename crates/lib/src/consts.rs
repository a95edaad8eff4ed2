//! Constants shared across the crate.

/// Number of digest bytes kept in a [`ContentHash`](crate::util::hash::ContentHash).
pub const CONTENT_HASH_BYTES: usize = 16;

/// Hex characters taken from each hash when building a fingerprinted name.
pub const FINGERPRINT_SEGMENT_LEN: usize = 6;

/// Default file name of the serialized manifest inside a bundle.
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

/// Environment variable carrying the IPC socket path to child processes.
pub const SOCKET_ENV: &str = "ASSETPACK_SOCK";

/// File name of the IPC socket inside its temporary directory.
pub const SOCKET_FILE_NAME: &str = "control.sock";

/// How long an accepted IPC connection may take to send its request line.
pub const REQUEST_READ_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Prefix of the temporary directory holding the IPC socket.
pub const SOCKET_DIR_PREFIX: &str = "assetpack-ipc-callback";

/// Default URL prefix under which fingerprinted assets are served.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/_/";

/// Suffix of the sidecar file recording the source hash of a cached output.
pub const CACHE_HASH_SUFFIX: &str = ".hash";

/// Default identifier of the generated embeddable asset table.
pub const DEFAULT_EMBED_IDENT: &str = "ASSETS";

/// Directory names under the assets dir that get default steps.
pub const FONTS_DIR: &str = "fonts";
pub const IMAGES_DIR: &str = "images";
pub const SASS_DIR: &str = "sass";
pub const TEMPLATES_DIR: &str = "templates";
pub const CSS_DIR: &str = "css";
pub const JS_DIR: &str = "js";

/// Default step script name inside the assets directory.
pub const SCRIPT_NAME: &str = "assets.lua";

/// Default name of the translate function in templates.
pub const DEFAULT_TRANS_FUNC_NAME: &str = "T";

/// Default embeddable listing file name inside the assets directory.
pub const EMBED_FILE_NAME: &str = "assets.rs";
