//! Fixed command lines for the recorder and player backends

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// ALSA command-line recorder
pub const ARECORD: &str = "/usr/bin/arecord";

/// Player used for looped playback; aplay has no loop option
pub const MPLAYER: &str = "/usr/bin/mplayer";

/// A program and its argument vector, passed to the OS unmodified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandLine {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(|a| a.as_ref().to_owned()).collect(),
        }
    }

    /// Capture signed 16-bit little-endian, 48 kHz, stereo from `device` into `path`
    pub fn recorder(device: &str, path: &Path) -> Self {
        Self::new(
            ARECORD,
            [
                OsStr::new("-f"),
                OsStr::new("S16_LE"),
                OsStr::new("-r"),
                OsStr::new("48000"),
                OsStr::new("-c"),
                OsStr::new("2"),
                OsStr::new("-D"),
                OsStr::new(device),
                path.as_os_str(),
            ],
        )
    }

    /// Play `path` in an infinite loop
    pub fn player(path: &Path) -> Self {
        Self::new(
            MPLAYER,
            [
                OsStr::new("-loop"),
                OsStr::new("0"),
                path.as_os_str(),
            ],
        )
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_arguments() {
        let cmd = CommandLine::recorder("hw:1,0", Path::new("records/rec_1.raw"));
        assert_eq!(cmd.program(), Path::new("/usr/bin/arecord"));
        assert_eq!(
            cmd.to_string(),
            "/usr/bin/arecord -f S16_LE -r 48000 -c 2 -D hw:1,0 records/rec_1.raw"
        );
    }

    #[test]
    fn test_player_arguments() {
        let cmd = CommandLine::player(Path::new("records/rec_1.raw"));
        assert_eq!(cmd.program(), Path::new("/usr/bin/mplayer"));
        assert_eq!(cmd.args(), ["-loop", "0", "records/rec_1.raw"]);
    }

    #[test]
    fn test_device_passed_through_unmodified() {
        let cmd = CommandLine::recorder("plughw:CARD=USB,DEV=0", Path::new("x.raw"));
        assert_eq!(cmd.args()[7], "plughw:CARD=USB,DEV=0");
    }
}
