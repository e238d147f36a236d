//! Interactive listing: show installed apps and let the user pick one to delete.

use appinstaller_core::process::{self, RunLimits};
use appinstaller_core::{Descriptor, Registry, SubprocessError};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};

const FZF: &str = "fzf";
const FZF_CANCELLED: i32 = 130;
const FZF_NO_MATCH: i32 = 1;
const TABLE_WIDTH: usize = 87;

/// One listed application.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub exec_path: String,
}

impl Row {
    pub fn from_descriptor(d: &Descriptor) -> Self {
        Self {
            name: d.name().unwrap_or_default().to_string(),
            exec_path: d.exec_program().unwrap_or_default().to_string(),
        }
    }

    fn fzf_line(&self) -> String {
        format!("{:<30} | {}", self.name, self.exec_path)
    }
}

/// Print installed apps; when `interactive`, offer to delete one.
pub fn run(registry: &Registry, limits: &RunLimits, interactive: bool) -> Result<(), Box<dyn Error>> {
    let rows: Vec<Row> = registry.list()?.iter().map(Row::from_descriptor).collect();

    if rows.is_empty() {
        println!("No installed applications found");
        return Ok(());
    }

    let choice = if interactive && which::which(FZF).is_ok() {
        select_with_fzf(&rows, limits)?
    } else {
        print_table(&rows);
        if interactive {
            prompt_number(&rows, &mut io::stdin().lock())?
        } else {
            None
        }
    };

    match choice {
        Some(name) => delete_with_feedback(registry, &name),
        None => Ok(()),
    }
}

/// Delete `name`, reporting progress the way the listing does.
pub fn delete_with_feedback(registry: &Registry, name: &str) -> Result<(), Box<dyn Error>> {
    print!("Deleting application '{}'... ", name);
    io::stdout().flush()?;

    match registry.delete(name) {
        Ok(_) => {
            println!("success");
            Ok(())
        }
        Err(e) => {
            println!("error: {}", e);
            Err(e.into())
        }
    }
}

fn print_table(rows: &[Row]) {
    println!("\n{:<4} | {:<30} | {:<50}", "#", "Name", "Executable Path");
    println!("{}", "-".repeat(TABLE_WIDTH));
    for (i, row) in rows.iter().enumerate() {
        println!("{:<4} | {:<30} | {:<50}", i + 1, row.name, row.exec_path);
    }
    println!("{}", "-".repeat(TABLE_WIDTH));
}

fn select_with_fzf(rows: &[Row], limits: &RunLimits) -> Result<Option<String>, Box<dyn Error>> {
    let input: String = rows.iter().map(|r| r.fzf_line() + "\n").collect();

    let mut cmd = Command::new(FZF);
    cmd.arg("--header=Select application to delete (ESC to exit)")
        .arg("--height=40%")
        .stderr(Stdio::inherit());

    // A person is choosing; only cancellation applies, not the tool timeout.
    let interactive = RunLimits {
        timeout: None,
        cancel: limits.cancel.clone(),
    };
    let (status, selected) = process::run_with_input(cmd, input, &interactive)?;

    match status.code() {
        Some(0) => Ok(parse_selection(&selected)),
        Some(FZF_CANCELLED) | Some(FZF_NO_MATCH) => Ok(None),
        _ => Err(SubprocessError::Exit {
            program: FZF.to_string(),
            status,
        }
        .into()),
    }
}

/// Name column of an fzf line.
fn parse_selection(selected: &str) -> Option<String> {
    let selected = selected.trim();
    if selected.is_empty() {
        return None;
    }
    let name = selected.split('|').next().unwrap_or_default().trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn prompt_number(rows: &[Row], input: &mut impl BufRead) -> io::Result<Option<String>> {
    print!("\nEnter application number to delete (or 'q' to exit): ");
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();
    if line == "q" || line.is_empty() {
        return Ok(None);
    }

    match line.parse::<usize>() {
        Ok(n) if (1..=rows.len()).contains(&n) => Ok(Some(rows[n - 1].name.clone())),
        _ => {
            println!("Invalid input");
            Ok(None)
        }
    }
}
