use std::env;
use std::path::{Path, PathBuf};

/// Resolves the absolute path of an executable.
///
/// Absolute paths are checked as-is. Otherwise the binary is searched in:
/// 1. Directories listed in `CLEARBAR_EXTRA_PATHS` (colon-separated).
/// 2. The current process `PATH`.
/// 3. The system tool directories and common user install locations on macOS.
///
/// # Errors
///
/// Returns a description of the failure when no executable candidate exists.
pub fn resolve_binary(binary: &str) -> Result<PathBuf, String> {
    if binary.is_empty() {
        return Err("Binary name cannot be empty".to_string());
    }

    let candidate = Path::new(binary);
    if candidate.is_absolute() {
        return if is_executable(candidate) {
            Ok(candidate.to_path_buf())
        } else {
            Err(format!("Binary at {} is not executable", candidate.display()))
        };
    }

    let mut search_paths = Vec::new();

    if let Ok(extra) = env::var("CLEARBAR_EXTRA_PATHS") {
        search_paths.extend(extra.split(':').map(PathBuf::from));
    }

    if let Some(path_var) = env::var_os("PATH") {
        search_paths.extend(env::split_paths(&path_var));
    }

    // `log` and `sips` live here; launchd agents may start with a minimal PATH.
    search_paths.extend([
        PathBuf::from("/usr/bin"),
        PathBuf::from("/usr/sbin"),
        PathBuf::from("/usr/local/bin"),
        PathBuf::from("/opt/homebrew/bin"),
    ]);

    if let Some(home) = home_dir_from_env() {
        search_paths.push(home.join(".local/bin"));
    }

    for directory in search_paths {
        if directory.as_os_str().is_empty() {
            continue;
        }

        let candidate_path = directory.join(binary);
        if is_executable(&candidate_path) {
            return Ok(candidate_path);
        }
    }

    Err(format!(
        "Unable to locate executable '{binary}' in known search paths"
    ))
}

fn home_dir_from_env() -> Option<PathBuf> { env::var_os("HOME").map(PathBuf::from) }

fn is_executable(path: &Path) -> bool {
    use std::fs;

    if !path.exists() {
        return false;
    }

    match fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return false;
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                metadata.permissions().mode() & 0o111 != 0
            }

            #[cfg(not(unix))]
            {
                true
            }
        }
        Err(_) => false,
    }
}
