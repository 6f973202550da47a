//! iopanel - poll a serial I/O controller from the terminal
//!
//! Usage:
//!   iopanel --port /dev/ttyUSB0 --baud 9600
//!   iopanel --mock                  Simulated device, no hardware
//!   iopanel --list-ports
//!
//! At the prompt: `c` connect/disconnect, `t <n>` toggle output n,
//! `s` print status, `q` quit.

mod cli;

use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::{select, unbounded, Receiver};

use iopanel_lib::adapters::mock_device::{MockDeviceFactory, MOCK_PORT_NAME};
use iopanel_lib::adapters::SerialPortFactory;
use iopanel_lib::commands;
use iopanel_lib::domain::{BaudRate, Configuration, InputMask};
use iopanel_lib::ports::SerialFactory;
use iopanel_lib::{PanelController, WorkerEvent};

use cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let factory: Arc<dyn SerialFactory> = if cli.mock {
        Arc::new(MockDeviceFactory::new())
    } else {
        Arc::new(SerialPortFactory)
    };

    if cli.list_ports {
        for port in commands::serial::list_serial_ports(factory.as_ref())? {
            println!("{:<24} {}", port.name, port.port_type);
        }
        let rates: Vec<String> = commands::serial::list_baud_rates()
            .iter()
            .map(u32::to_string)
            .collect();
        println!("Baud rates: {}", rates.join(", "));
        return Ok(());
    }

    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(commands::config::default_config_dir);
    let config = match &cli.profile {
        Some(name) => commands::config::load_configuration(&config_dir, name)?,
        None => Configuration::default(),
    };
    log::info!("Using configuration '{}'", config.name);

    let port = cli
        .port
        .clone()
        .or_else(|| config.serial_port.clone())
        .or_else(|| cli.mock.then(|| MOCK_PORT_NAME.to_string()))
        .ok_or_else(|| "No serial port given (use --port or a profile)".to_string())?;
    let baud_rate = match cli.baud {
        Some(rate) => BaudRate::try_from(rate).map_err(|e| e.to_string())?,
        None => config.baud_rate,
    };

    let (mut panel, events) = PanelController::new(Arc::clone(&factory), &config);
    let lines = spawn_stdin_reader()?;

    println!("{port} @ {baud_rate} baud. Commands: c, t <n>, s, q");
    let mut shown_inputs: Option<InputMask> = None;

    loop {
        select! {
            recv(lines) -> line => {
                // Closed stdin ends the session like `q`
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(&mut panel, command, &port, baud_rate),
                    Err(e) => println!("{e}"),
                }
            }
            recv(events) -> event => {
                let Ok(event) = event else { break };
                let kind = event.event.clone();
                if !panel.handle_event(event) {
                    continue;
                }
                match kind {
                    WorkerEvent::Response(inputs) => {
                        if shown_inputs != Some(inputs) {
                            println!("IN  {inputs:016b}");
                            shown_inputs = Some(inputs);
                        }
                    }
                    WorkerEvent::Error(e) => {
                        println!("Disconnected: {e}");
                        shown_inputs = None;
                    }
                }
            }
        }
    }

    if panel.is_connected() {
        panel.disconnect();
    }
    Ok(())
}

fn execute(panel: &mut PanelController, command: Command, port: &str, baud_rate: BaudRate) {
    match command {
        Command::ToggleConnection => {
            let result = if panel.is_connected() {
                commands::serial::disconnect_serial(panel).map(|()| "Disconnected".to_string())
            } else {
                commands::serial::connect_serial(panel, port, baud_rate.as_u32())
                    .map(|params| format!("Connecting to {} @ {}", params.port, params.baud_rate))
            };
            match result {
                Ok(message) => println!("{message}"),
                Err(e) => println!("{e}"),
            }
        }
        Command::ToggleOutput(index) => match commands::io::toggle_output(panel, index) {
            Ok(on) => println!("OUT{index} {}", if on { "on" } else { "off" }),
            Err(e) => println!("{e}"),
        },
        Command::Status => match commands::status::connection_status_json(panel) {
            Ok(json) => println!("{json}"),
            Err(e) => println!("{e}"),
        },
        Command::Quit => {}
    }
}

/// Read stdin lines on their own thread so the controller can wait on
/// keyboard input and worker events at the same time.
fn spawn_stdin_reader() -> Result<Receiver<String>, String> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("iopanel-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| format!("Failed to spawn stdin reader: {e}"))?;
    Ok(rx)
}
