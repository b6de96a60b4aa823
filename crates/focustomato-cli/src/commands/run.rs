//! Interactive host: one command per stdin line, one snapshot per stdout
//! line.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use focustomato_core::{
    run_ticker, AppSnapshot, Command, Config, FocusHost, SettingsPatch, TargetKind,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

/// A single line typed into the running host.
#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: LineCommand,
}

#[derive(Subcommand)]
enum LineCommand {
    /// Start or resume the timer
    Start,
    /// Pause the timer
    Pause,
    /// Reset the current phase
    Reset,
    /// End the current break
    SkipBreak,
    /// Change one timer setting
    Set { field: SettingField, value: String },
    /// Raise or lower the barrier
    Barrier {
        #[command(subcommand)]
        action: BarrierAction,
    },
    /// Spend an emergency unlock
    Unlock,
    /// Log a blocked access attempt
    Attempt { kind: TargetKind, target: String },
    /// Report an access; blocked and logged if it hits the blocklist
    Access { kind: TargetKind, target: String },
    /// Empty the attempt log
    ClearAttempts,
    /// Print the current snapshot
    Status,
    /// Stop the host
    Quit,
}

#[derive(Subcommand)]
enum BarrierAction {
    /// Activate for --minutes, the configured default, or open-ended
    On {
        #[arg(long)]
        minutes: Option<u32>,
        /// No end time
        #[arg(long, conflicts_with = "minutes")]
        open: bool,
    },
    /// Deactivate
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum SettingField {
    FocusMinutes,
    BreakMinutes,
    LongBreakMinutes,
    LongBreakInterval,
    AutoStartBreaks,
    AutoStartNextFocus,
}

impl SettingField {
    fn patch(self, value: &str) -> Result<SettingsPatch, String> {
        let minutes = || {
            value
                .parse::<u32>()
                .map_err(|e| format!("invalid number {value:?}: {e}"))
        };
        let flag = || {
            value
                .parse::<bool>()
                .map_err(|e| format!("invalid boolean {value:?}: {e}"))
        };
        let mut patch = SettingsPatch::default();
        match self {
            SettingField::FocusMinutes => patch.focus_minutes = Some(minutes()?),
            SettingField::BreakMinutes => patch.break_minutes = Some(minutes()?),
            SettingField::LongBreakMinutes => patch.long_break_minutes = Some(minutes()?),
            SettingField::LongBreakInterval => patch.long_break_interval = Some(minutes()?),
            SettingField::AutoStartBreaks => patch.auto_start_breaks = Some(flag()?),
            SettingField::AutoStartNextFocus => patch.auto_start_next_focus = Some(flag()?),
        }
        Ok(patch)
    }
}

enum Step {
    Execute(Command),
    Status,
    Quit,
}

fn interpret(line: LineCommand, default_minutes: u32) -> Result<Step, String> {
    let command = match line {
        LineCommand::Start => Command::Start,
        LineCommand::Pause => Command::Pause,
        LineCommand::Reset => Command::Reset,
        LineCommand::SkipBreak => Command::SkipBreak,
        LineCommand::Set { field, value } => Command::UpdateSettings(field.patch(&value)?),
        LineCommand::Barrier {
            action: BarrierAction::On { minutes, open },
        } => Command::Activate {
            minutes: if open {
                None
            } else {
                Some(minutes.unwrap_or(default_minutes))
            },
        },
        LineCommand::Barrier {
            action: BarrierAction::Off,
        } => Command::Deactivate,
        LineCommand::Unlock => Command::EmergencyUnlock,
        LineCommand::Attempt { kind, target } => Command::RecordAttempt { kind, target },
        LineCommand::Access { kind, target } => Command::ReportAccess { kind, target },
        LineCommand::ClearAttempts => Command::ClearAttempts,
        LineCommand::Status => return Ok(Step::Status),
        LineCommand::Quit => return Ok(Step::Quit),
    };
    Ok(Step::Execute(command))
}

fn print_snapshot(snapshot: &AppSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: {e}"),
    }
}

pub fn run(tick_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(config, Duration::from_millis(tick_ms.max(1))));
    // A pending stdin read cannot be cancelled; don't wait for it after `quit`.
    runtime.shutdown_background();
    result
}

async fn serve(config: Config, period: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let default_minutes = config.barrier.default_minutes;
    let host = Arc::new(Mutex::new(FocusHost::from_config(&config)));
    drop(config);

    let mut snapshots = host.lock().await.subscribe();
    print_snapshot(&snapshots.borrow_and_update());
    let printer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            print_snapshot(&snapshot);
        }
    });

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let ticker = tokio::spawn(run_ticker(Arc::clone(&host), period, async move {
        let _ = stop_rx.await;
    }));

    info!("host ready");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        let parsed = match Line::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprint!("{}", e.render());
                continue;
            }
        };
        match interpret(parsed.command, default_minutes) {
            Ok(Step::Execute(command)) => match host.lock().await.execute(command) {
                Ok(events) => {
                    for event in events {
                        debug!(?event, "command event");
                    }
                }
                Err(e) => eprintln!("error: {e}"),
            },
            Ok(Step::Status) => print_snapshot(&host.lock().await.snapshot()),
            Ok(Step::Quit) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }

    let _ = stop_tx.send(());
    ticker.await?;
    // Dropping the last handle closes the snapshot channel and ends the printer.
    drop(host);
    printer.await?;
    info!("host stopped");
    Ok(())
}
