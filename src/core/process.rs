use std::path::PathBuf;

fn managed_bin_dir() -> Option<PathBuf> {
    Some(crate::storage::config::data_dir().join("bin"))
}

fn enhanced_path() -> Option<String> {
    let bin_dir = managed_bin_dir()?;
    let sep = if cfg!(windows) { ";" } else { ":" };
    let current = std::env::var("PATH").unwrap_or_default();
    Some(format!("{}{}{}", bin_dir.display(), sep, current))
}

/// Builds a subprocess command with the managed bin directory on PATH, so
/// helper executables installed next to our data dir are found before
/// system-wide ones.
pub fn command<S: AsRef<std::ffi::OsStr>>(program: S) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(0x08000000);
    }
    if let Some(path) = enhanced_path() {
        cmd.env("PATH", path);
    }
    cmd.env("PYTHONIOENCODING", "utf-8");
    cmd.env("PYTHONUTF8", "1");
    cmd
}
