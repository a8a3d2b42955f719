// rovlink operator console -- drive a rover from the terminal.
//
// Usage:
//   rovlink run
//   rovlink --host 10.0.0.7 --robot 2 --velocity 1 run
//   rovlink send RF1
//   rovlink autonomy --seconds 10
//   rovlink commands

mod console;
mod logging;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::error;

use rovlink::command;
use rovlink::{
    Command, ConnectOutcome, Direction, RobotId, RoverClient, RoverClientBuilder, RoverEvent,
    Velocity, DEFAULT_HOST, DEFAULT_PORT,
};

use console::Action;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// rovlink operator console -- drives a rover over its TCP command port.
#[derive(Parser)]
#[command(name = "rovlink", version, about)]
struct Cli {
    /// Rover host name or IP address.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Rover command port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Robot selected at startup.
    #[arg(long, default_value = "1")]
    robot: RobotId,

    /// Initial velocity (slider value, truncated toward zero).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    velocity: f64,

    /// Pause between connection attempts, in milliseconds.
    #[arg(long, default_value_t = 500)]
    retry_ms: u64,

    /// Autonomy heartbeat period, in milliseconds.
    #[arg(long, default_value_t = 100)]
    heartbeat_ms: u64,

    /// Give up connecting after this many attempts (default: keep trying).
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Interactive console: one operator action per line.
    Run,

    /// Connect, send one raw command (e.g. RF1, STOP, auto0), disconnect.
    Send {
        /// Wire form of the command.
        command: String,
    },

    /// Connect, run autonomous mode for a while, then switch it off.
    Autonomy {
        /// How long to stay autonomous.
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },

    /// Print the command table.
    Commands,
}

fn build_client(cli: &Cli) -> Result<RoverClient> {
    let mut builder = RoverClientBuilder::new()
        .host(&cli.host)
        .port(cli.port)
        .initial_robot(cli.robot)
        .retry_interval(Duration::from_millis(cli.retry_ms))
        .heartbeat_period(Duration::from_millis(cli.heartbeat_ms));
    if let Some(n) = cli.max_attempts {
        builder = builder.max_connect_attempts(n);
    }

    let mut client = builder.build().context("invalid client settings")?;
    client.set_velocity(cli.velocity);
    Ok(client)
}

// ---------------------------------------------------------------------------
// Event printing
// ---------------------------------------------------------------------------

fn print_event(event: &RoverEvent) {
    match event {
        RoverEvent::Connecting => println!("[link] connecting..."),
        RoverEvent::Connected => println!("[link] connected"),
        RoverEvent::Disconnected => println!("[link] disconnected"),
        RoverEvent::Reply { data } => {
            println!("[rover] {}", String::from_utf8_lossy(data));
        }
        RoverEvent::AutonomyChanged { on } => {
            println!("[auto] {}", if *on { "on" } else { "off" });
        }
        RoverEvent::RobotSelected { robot } => println!("[robot] #{robot}"),
        // Retries, commands and heartbeat lifecycle go to the log.
        _ => {}
    }
}

/// Print events until the channel closes.
fn spawn_event_printer(mut events: broadcast::Receiver<RoverEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    println!("[warning] missed {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Give the printer a moment to flush the last events, then stop it.
async fn finish(printer: tokio::task::JoinHandle<()>) {
    let abort = printer.abort_handle();
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        abort.abort();
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn cmd_run(mut client: RoverClient) -> Result<()> {
    let printer = spawn_event_printer(client.subscribe());
    println!("rovlink console -- type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let action = match console::parse_line(&line) {
            Ok(Some(action)) => action,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        if action == Action::Quit {
            break;
        }
        apply(&mut client, action).await;
    }

    client.disconnect().await.ok();
    drop(client);
    finish(printer).await;
    Ok(())
}

/// Apply one operator action. Failures are reported and the console keeps
/// going; the operator decides whether to reconnect.
async fn apply(client: &mut RoverClient, action: Action) {
    let result = match action {
        Action::Drive(direction) => client.press(direction).await,
        Action::Stop => client.release().await,
        Action::Velocity(raw) => {
            println!("velocity {}", client.set_velocity(raw));
            Ok(())
        }
        Action::Robot(robot) => client.select_robot(robot),
        Action::Autonomy => client.toggle_autonomy().await,
        Action::Connect => {
            let connect = client.spawn_connect();
            tokio::spawn(async move {
                match connect.await {
                    Ok(Ok(ConnectOutcome::AlreadyConnected)) => println!("already connected"),
                    Ok(Ok(ConnectOutcome::AlreadyConnecting)) => println!("already connecting"),
                    Ok(Ok(ConnectOutcome::Connected { .. })) => {}
                    Ok(Err(e)) => println!("connect failed: {e}"),
                    Err(e) => error!(error = %e, "Connect task failed"),
                }
            });
            Ok(())
        }
        Action::Disconnect => client.disconnect().await.map(|outcome| {
            if outcome == rovlink::DisconnectOutcome::WasNotConnected {
                println!("not connected");
            }
        }),
        Action::Status => {
            println!(
                "{} | {} | robot #{} | velocity {} | autonomous {}",
                client.state().await,
                client.session().addr(),
                client.robot(),
                client.velocity(),
                if client.is_autonomous() { "on" } else { "off" },
            );
            Ok(())
        }
        Action::Help => {
            println!("{}", console::HELP);
            Ok(())
        }
        Action::Quit => Ok(()),
    };

    if let Err(e) = result {
        println!("error: {e}");
    }
}

async fn cmd_send(mut client: RoverClient, raw: &str) -> Result<()> {
    let command = Command::parse(raw).with_context(|| format!("not a rover command: {raw}"))?;

    client.connect().await.context("could not connect")?;
    let result = client.send_command(command).await;

    client.disconnect().await.ok();
    result.context("send failed")?;
    println!("sent {command}");
    Ok(())
}

async fn cmd_autonomy(mut client: RoverClient, seconds: u64) -> Result<()> {
    let printer = spawn_event_printer(client.subscribe());

    client.connect().await.context("could not connect")?;
    client.toggle_autonomy().await.context("could not start autonomy")?;

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => println!("interrupted"),
    }

    let stopped = client.toggle_autonomy().await;
    client.disconnect().await.ok();
    drop(client);
    finish(printer).await;

    stopped.context("could not stop autonomy")
}

fn cmd_commands() {
    println!("{:<16} {:<8} example", "button", "wire");
    println!("{}", "-".repeat(36));
    for direction in Direction::ALL {
        let example = Command::drive(direction, Velocity::new(1));
        println!(
            "{:<16} {:<8} {}",
            direction.to_string(),
            format!("{}<v>", command::prefix(direction)),
            example
        );
    }
    println!("{:<16} {:<8} {}", "stop", rovlink::STOP, Command::Stop);
    println!(
        "{:<16} {:<8} {}",
        "autonomy",
        "auto<0|1>",
        Command::heartbeat()
    );
    println!();
    println!(
        "velocity range {}..={} (slider value, truncated)",
        Velocity::MIN,
        Velocity::MAX
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    if matches!(cli.command, Mode::Commands) {
        cmd_commands();
        return Ok(());
    }

    if cli.retry_ms == 0 || cli.heartbeat_ms == 0 {
        bail!("--retry-ms and --heartbeat-ms must be greater than zero");
    }

    let client = match build_client(&cli) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Could not set up the rover client");
            return Err(e);
        }
    };

    match &cli.command {
        Mode::Run => cmd_run(client).await,
        Mode::Send { command } => cmd_send(client, command).await,
        Mode::Autonomy { seconds } => cmd_autonomy(client, *seconds).await,
        Mode::Commands => unreachable!("commands handled above"),
    }
}
