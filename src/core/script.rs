//! Generated script: ordered lines plus atomic persistence.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// An ordered sequence of shell lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn comment(&mut self, text: &str) {
        self.lines.push(format!("# {}", text));
    }

    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Non-blank, non-comment lines.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
    }

    /// Full text, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Write atomically: temp file beside the target, then rename.
    ///
    /// A failed write removes the temp file, so `path` either holds a
    /// complete script or is left as it was.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| output_err(parent, e))?;
        }

        let tmp_path = temp_path(path);
        let result = std::fs::write(&tmp_path, self.render())
            .and_then(|()| make_executable(&tmp_path))
            .and_then(|()| std::fs::rename(&tmp_path, path));

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(output_err(path, e));
        }
        Ok(())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn output_err(path: &Path, source: std::io::Error) -> Error {
    Error::Output {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Script {
        let mut s = Script::new();
        s.push("#!/bin/bash");
        s.blank();
        s.comment("Create Pod");
        s.push("kubectl deploy pod a.yaml");
        s
    }

    #[test]
    fn test_script_render() {
        assert_eq!(
            sample().render(),
            "#!/bin/bash\n\n# Create Pod\nkubectl deploy pod a.yaml\n"
        );
    }

    #[test]
    fn test_script_commands_skip_comments() {
        let s = sample();
        let cmds: Vec<_> = s.commands().collect();
        assert_eq!(cmds, vec!["kubectl deploy pod a.yaml"]);
    }

    #[test]
    fn test_script_write_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("cluster.sh");
        sample().write_atomic(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), sample().render());
        assert!(!dir.path().join("out").join("cluster.sh.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_script_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.sh");
        sample().write_atomic(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_script_write_into_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("taken");
        std::fs::create_dir_all(target.join("child")).unwrap();
        let err = sample().write_atomic(&target).unwrap_err();
        assert!(matches!(err, Error::Output { .. }));
        assert!(!dir.path().join("taken.tmp").exists());
    }

    #[test]
    fn test_script_temp_path() {
        assert_eq!(
            temp_path(Path::new("/x/y/run.sh")),
            PathBuf::from("/x/y/run.sh.tmp")
        );
    }
}
