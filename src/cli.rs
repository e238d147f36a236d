//! Command line surface.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Hint printed after installs and in `--help`.
pub const REFRESH_HINT: &str =
    "(after install use sudo update-desktop-database to reload gnome icons)";

#[derive(Parser, Debug)]
#[command(
    name = "appinstaller",
    version,
    about = "Install AppImage bundles into the desktop shell",
    override_usage = "sudo appinstaller [OPTIONS] [path/to/app.AppImage]",
    after_help = REFRESH_HINT,
    disable_version_flag = true,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Config file overriding the default directories
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// List installed apps (from this tool only)
    #[arg(short = 'l', long = "list", conflicts_with_all = ["delete", "bundle"])]
    pub list: bool,

    /// Delete the specified app (installed by this tool)
    #[arg(short = 'd', long = "delete", value_name = "NAME", conflicts_with = "bundle")]
    pub delete: Option<String>,

    /// Show version information
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Also start the app on login
    #[arg(long)]
    pub autostart: bool,

    /// AppImage to install
    #[arg(value_name = "APPIMAGE")]
    pub bundle: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install an AppImage
    Install {
        bundle: PathBuf,
        /// Also start the app on login
        #[arg(long)]
        autostart: bool,
    },
    /// List installed apps and optionally pick one to delete
    List {
        /// Print the table only, never prompt
        #[arg(long)]
        plain: bool,
    },
    /// Delete an installed app by name
    Delete { name: String },
    /// Show version information
    Version,
}

/// What to do, after folding the flag forms into the subcommand forms.
#[derive(Debug, PartialEq)]
pub enum Action {
    Install { bundle: PathBuf, autostart: bool },
    List { plain: bool },
    Delete(String),
    Version,
    Help,
}

impl Cli {
    pub fn action(self) -> Action {
        match self.command {
            Some(Command::Install { bundle, autostart }) => Action::Install {
                bundle,
                autostart: autostart || self.autostart,
            },
            Some(Command::List { plain }) => Action::List { plain },
            Some(Command::Delete { name }) => Action::Delete(name),
            Some(Command::Version) => Action::Version,
            None if self.list => Action::List { plain: false },
            None => match (self.delete, self.bundle) {
                (Some(name), _) => Action::Delete(name),
                (None, Some(bundle)) => Action::Install {
                    bundle,
                    autostart: self.autostart,
                },
                (None, None) => Action::Help,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(args: &[&str]) -> Action {
        let mut argv = vec!["appinstaller"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().action()
    }

    #[test]
    fn test_bare_path_installs() {
        assert_eq!(
            action(&["./X.AppImage"]),
            Action::Install {
                bundle: PathBuf::from("./X.AppImage"),
                autostart: false
            }
        );
        assert_eq!(
            action(&["install", "--autostart", "X.AppImage"]),
            Action::Install {
                bundle: PathBuf::from("X.AppImage"),
                autostart: true
            }
        );
    }

    #[test]
    fn test_flag_and_subcommand_forms_agree() {
        assert_eq!(action(&["-l"]), Action::List { plain: false });
        assert_eq!(action(&["list"]), Action::List { plain: false });
        assert_eq!(action(&["-d", "Firefox"]), Action::Delete("Firefox".into()));
        assert_eq!(action(&["delete", "Firefox"]), Action::Delete("Firefox".into()));
        assert_eq!(action(&["version"]), Action::Version);
        assert_eq!(action(&[]), Action::Help);
    }

    #[test]
    fn test_config_is_global() {
        let cli = Cli::try_parse_from(["appinstaller", "list", "--config", "/tmp/c.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
    }

    #[test]
    fn test_delete_requires_name() {
        assert!(Cli::try_parse_from(["appinstaller", "-d"]).is_err());
    }

    #[test]
    fn test_short_version_flag() {
        let err = Cli::try_parse_from(["appinstaller", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
