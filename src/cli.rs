//! Command-line interface definition using clap

use std::path::PathBuf;

use clap::Parser;

/// Poll a serial I/O controller from the terminal
#[derive(Parser, Debug)]
#[command(name = "iopanel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Serial port to poll (overrides the profile)
    #[arg(long, value_name = "PORT")]
    pub port: Option<String>,

    /// Baud rate (overrides the profile)
    #[arg(long, value_name = "RATE")]
    pub baud: Option<u32>,

    /// Configuration profile to load
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Directory holding configuration profiles
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Talk to a simulated device instead of a serial port
    #[arg(long)]
    pub mock: bool,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `c`: connect when disconnected, disconnect otherwise
    ToggleConnection,
    /// `t <n>`: flip output line n
    ToggleOutput(usize),
    /// `s`: print status JSON
    Status,
    /// `q`: leave
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some("c") => Command::ToggleConnection,
            Some("t") => {
                let index = words
                    .next()
                    .ok_or_else(|| "usage: t <line>".to_string())?
                    .parse()
                    .map_err(|e| format!("bad line number: {e}"))?;
                Command::ToggleOutput(index)
            }
            Some("s") => Command::Status,
            Some("q") => Command::Quit,
            Some(other) => return Err(format!("unknown command '{other}' (c, t <n>, s, q)")),
            None => return Err("empty command".to_string()),
        };
        match words.next() {
            Some(extra) => Err(format!("unexpected argument '{extra}'")),
            None => Ok(command),
        }
    }
}
