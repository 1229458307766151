//! Crate-wide constants.

pub const APP_NAME: &str = "kiln";

/// Location of the manifest inside a module archive.
pub const MODULE_MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// File extensions recognised as module archives during discovery.
pub const MODULE_ARCHIVE_EXTENSIONS: &[&str] = &["jar", "zip"];

/// Extension point receiving `Feature::ContentType`.
pub const CONTENT_TYPE_POINT: &str = "content-type";

/// Extension point receiving `Feature::Transform`.
pub const BUILD_TASK_POINT: &str = "build-task";

/// Extension point receiving `Feature::Platform`.
pub const BUILD_PLATFORM_POINT: &str = "build-platform";

/// Extension point receiving `Feature::Function`.
pub const FUNCTION_POINT: &str = "function";

/// Environment variable holding the module search path list.
pub const MODULE_PATH_ENV: &str = "KILN_MODULE_PATH";

/// Environment variable naming the default build platform.
pub const PLATFORM_ENV: &str = "KILN_PLATFORM";

/// Environment variable overriding the build output directory.
pub const OUTPUT_DIR_ENV: &str = "KILN_OUTPUT_DIR";

/// Environment variable overriding the worker pool size.
pub const JOBS_ENV: &str = "KILN_JOBS";
