// Line-oriented shell over a mounted navigator
// Errors are reported and the loop keeps going

use crate::print_listing;
use fatnav_core::BlockDevice;
use fatnav_filesystems::Fat32Navigator;
use std::io::{self, BufRead, Write};

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Info,
    Ls { path: Option<String>, all: bool },
    Cd(String),
    Open { name: String, mode: String },
    Close(String),
    Lsof,
    Lseek { name: String, offset: i64 },
    Read { name: String, size: usize },
    Exit,
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match (command, args) {
            ("info", []) => ShellCommand::Info,
            ("ls", args) => {
                let all = args.contains(&"-a");
                let path = args.iter().find(|a| **a != "-a").map(|s| s.to_string());
                ShellCommand::Ls { path, all }
            }
            ("cd", [path]) => ShellCommand::Cd(path.to_string()),
            ("open", [name, mode]) => ShellCommand::Open {
                name: name.to_string(),
                mode: mode.to_string(),
            },
            ("close", [name]) => ShellCommand::Close(name.to_string()),
            ("lsof", []) => ShellCommand::Lsof,
            ("lseek", [name, offset]) => ShellCommand::Lseek {
                name: name.to_string(),
                offset: offset.parse().map_err(|_| format!("Invalid offset: {}", offset))?,
            },
            ("read", [name, size]) => ShellCommand::Read {
                name: name.to_string(),
                size: size.parse().map_err(|_| format!("Invalid size: {}", size))?,
            },
            ("exit" | "quit", []) => ShellCommand::Exit,
            ("cd" | "close", _) => return Err(format!("Usage: {} <path>", command)),
            ("open", _) => return Err("Usage: open <name> <-r|-w|-rw|-wr>".into()),
            ("lseek", _) => return Err("Usage: lseek <name> <offset>".into()),
            ("read", _) => return Err("Usage: read <name> <size>".into()),
            _ => return Err(format!("Unknown command: {}", command)),
        };
        Ok(Some(command))
    }
}

fn execute<D: BlockDevice, W: Write>(
    nav: &mut Fat32Navigator<D>,
    command: ShellCommand,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        ShellCommand::Info => writeln!(out, "{}", nav.info())?,
        ShellCommand::Ls { path, all } => {
            let entries = match path {
                Some(path) => nav.list_path(&path)?,
                None => nav.list_current()?,
            };
            print_listing(&entries, all, out)?;
        }
        ShellCommand::Cd(path) => nav.change_directory(&path)?,
        ShellCommand::Open { name, mode } => {
            let file = nav.open_file(&name, &mode)?;
            writeln!(out, "Opened {} {}", file.name, file.mode)?;
        }
        ShellCommand::Close(name) => {
            let file = nav.close(&name)?;
            writeln!(out, "Closed {}", file.name)?;
        }
        ShellCommand::Lsof => {
            let files = nav.open_files();
            if files.is_empty() {
                writeln!(out, "No files are open")?;
            }
            for (index, file) in files.iter().enumerate() {
                writeln!(
                    out,
                    "{:>3}  {:<12} {:<3} offset {} of {}",
                    index, file.name, file.mode, file.offset, file.size
                )?;
            }
        }
        ShellCommand::Lseek { name, offset } => nav.seek(&name, offset)?,
        ShellCommand::Read { name, size } => {
            let data = nav.read(&name, size)?;
            writeln!(out, "{}", String::from_utf8_lossy(&data))?;
        }
        ShellCommand::Exit => {}
    }
    Ok(())
}

/// Run commands from `input` until `exit` or end of input.
pub fn run<D: BlockDevice, R: BufRead, W: Write>(
    nav: &mut Fat32Navigator<D>,
    image_name: &str,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    let mut lines = input.lines();
    loop {
        write!(out, "[{}]{}> ", image_name, nav.cwd())?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            return Ok(());
        };

        match ShellCommand::parse(&line?) {
            Ok(None) => {}
            Ok(Some(ShellCommand::Exit)) => return Ok(()),
            Ok(Some(command)) => {
                if let Err(e) = execute(nav, command, out) {
                    writeln!(out, "Error: {}", e)?;
                }
            }
            Err(message) => writeln!(out, "{}", message)?,
        }
    }
}
