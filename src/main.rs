//! appinstaller - install AppImage bundles into the desktop shell
//!
//! Copies the bundle into a system directory, extracts its desktop entry and
//! icon, and registers it so it shows up in the application menu.

mod cli;
mod preflight;
mod selector;

use appinstaller_core::{CancelToken, InstallOptions, Installer, Layout, Registry};
use clap::{CommandFactory, Parser};
use cli::{Action, Cli, REFRESH_HINT};
use log::{debug, info};
use std::error::Error;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let layout = Layout::discover(cli.config.as_deref());
    debug!("Layout: {:?}", layout);

    match run(cli.action(), &layout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(action: Action, layout: &Layout) -> Result<(), Box<dyn Error>> {
    let cancel = CancelToken::new();

    match action {
        Action::Help => {
            Cli::command().print_help()?;
            Ok(())
        }
        Action::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Action::Install { bundle, autostart } => {
            preflight::check_privileges(layout)?;
            preflight::check_libraries(&layout.run_limits(cancel.clone()))?;
            install(layout, &bundle, autostart, cancel)
        }
        Action::List { plain } => {
            preflight::check_privileges(layout)?;
            let interactive = !plain && std::io::stdin().is_terminal();
            selector::run(
                &Registry::new(layout),
                &layout.run_limits(cancel),
                interactive,
            )
        }
        Action::Delete(name) => {
            preflight::check_privileges(layout)?;
            selector::delete_with_feedback(&Registry::new(layout), &name)
        }
    }
}

fn install(
    layout: &Layout,
    bundle: &Path,
    autostart: bool,
    cancel: CancelToken,
) -> Result<(), Box<dyn Error>> {
    let report = Installer::new(layout, cancel)
        .options(InstallOptions { autostart })
        .install(bundle)?;

    info!("Extracted with {}", report.strategy);
    println!(
        "Installed {} -> {}",
        report.name.as_deref().unwrap_or("application"),
        report.executable.display()
    );
    println!("Desktop entry: {}", report.descriptor.display());
    match &report.icon {
        Some(icon) => println!("Icon: {}", icon.display()),
        None => println!("Icon: none found"),
    }
    if let Some(path) = &report.autostart {
        println!("Autostart entry: {}", path.display());
    }
    println!("{}", REFRESH_HINT);
    Ok(())
}
