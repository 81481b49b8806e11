use anyhow::{Context, Result, bail};
use log::debug;
use std::env;
use std::path::{Component, Path, PathBuf};

const CHDIR_FLAGS: [&str; 2] = ["-chdir", "--chdir"];

/// Determine the effective working directory from the raw arguments.
///
/// The arguments are only inspected; the caller forwards them untouched.
pub fn resolve(args: &[String]) -> Result<PathBuf> {
    let cwd = env::current_dir().context("Could not determine current directory")?;
    resolve_from(args, &cwd)
}

/// Same as [`resolve`], relative to an explicit base directory.
pub fn resolve_from(args: &[String], cwd: &Path) -> Result<PathBuf> {
    let workdir = match find_chdir(args)? {
        Some(value) => {
            debug!("Working directory overridden by -chdir: {}", value);
            normalize(&cwd.join(value))
        }
        None => normalize(cwd),
    };

    debug!("Working directory: {}", workdir.display());
    Ok(workdir)
}

/// Return the value of the single `-chdir` / `--chdir` flag, if present.
fn find_chdir(args: &[String]) -> Result<Option<&str>> {
    let mut found: Option<&str> = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let value = if CHDIR_FLAGS.contains(&arg.as_str()) {
            iter.next().map(String::as_str).unwrap_or("")
        } else if let Some(value) = CHDIR_FLAGS
            .iter()
            .find_map(|flag| arg.strip_prefix(flag).and_then(|v| v.strip_prefix('=')))
        {
            value
        } else {
            continue;
        };

        if found.is_some() {
            bail!("-chdir was specified more than once");
        }
        if value.is_empty() {
            bail!("-chdir requires a non-empty directory");
        }
        found = Some(value);
    }

    Ok(found)
}

/// Make `path` absolute-looking by folding `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
