//! `issuelog` - CLI for the persisted error and platform-issue logs
//!
//! Shows, summarizes, copies, exports, and clears either store, and records
//! new entries from scripts.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use issuelog::cli::{
    context_from_pairs, ClearCommand, Cli, Command, ConfigCommand, ExportCommand, LogCommand,
    LogKind, ReportCommand, ShowCommand,
};
use issuelog::viewer::ViewEntry;
use issuelog::{
    init_logging, Config, Diagnostics, LogStore, LogViewer, NewLogEntry, NewPlatformIssue,
    SystemClipboard,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    let diagnostics = || open_diagnostics(&config);

    match cli.command {
        Command::Show(cmd) => handle_show(&diagnostics()?, &cmd, config.viewer.color),
        Command::Summary(cmd) => print!("{}", summary(&diagnostics()?, cmd.selector.log)),
        Command::Copy(cmd) => {
            let diagnostics = diagnostics()?;
            let note = match cmd.selector.log {
                LogKind::General => viewer(diagnostics.general()).copy_summary(),
                LogKind::Platform => viewer(diagnostics.platform()).copy_summary(),
            };
            println!("{note}");
        }
        Command::Export(cmd) => handle_export(&diagnostics()?, &cmd)?,
        Command::Clear(cmd) => handle_clear(&diagnostics()?, &cmd),
        Command::Count(cmd) => {
            let diagnostics = diagnostics()?;
            let count = match cmd.selector.log {
                LogKind::General => diagnostics.general().len(),
                LogKind::Platform => diagnostics.platform().issue_count(),
            };
            println!("{count}");
        }
        Command::Log(cmd) => handle_log(&diagnostics()?, cmd),
        Command::Report(cmd) => handle_report(&diagnostics()?, cmd),
        Command::Config(cmd) => handle_config(&config, cmd)?,
    }

    Ok(())
}

/// Open both stores and route panics and failed tasks into the general log.
fn open_diagnostics(config: &Config) -> anyhow::Result<Diagnostics> {
    let diagnostics = Diagnostics::open(config).context("opening log storage")?;
    // The installed hook holds its own handle on the store
    let _capture = diagnostics.attach_global_capture(&config.capture);
    Ok(diagnostics)
}

fn viewer<E: ViewEntry>(store: &Arc<LogStore<E>>) -> LogViewer<E> {
    LogViewer::new(Arc::clone(store), Box::new(SystemClipboard))
}

fn summary(diagnostics: &Diagnostics, log: LogKind) -> String {
    match log {
        LogKind::General => diagnostics.general().summarize(),
        LogKind::Platform => diagnostics.platform().summarize(),
    }
}

fn handle_show(diagnostics: &Diagnostics, cmd: &ShowCommand, color: bool) {
    let color = color && !cmd.no_color;
    match cmd.selector.log {
        LogKind::General => print!("{}", viewer(diagnostics.general()).render(color)),
        LogKind::Platform => print!("{}", viewer(diagnostics.platform()).render(color)),
    }
}

fn handle_export(diagnostics: &Diagnostics, cmd: &ExportCommand) -> anyhow::Result<()> {
    let json = match cmd.selector.log {
        LogKind::General => diagnostics.general().export_as_json(),
        LogKind::Platform => diagnostics.platform().export_as_json(),
    };
    match &cmd.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing export to {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn handle_clear(diagnostics: &Diagnostics, cmd: &ClearCommand) {
    if !cmd.yes {
        println!("This will remove every entry from the {:?} log.", cmd.selector.log);
        println!("Use --yes to confirm.");
        return;
    }
    let note = match cmd.selector.log {
        LogKind::General => viewer(diagnostics.general()).clear(),
        LogKind::Platform => viewer(diagnostics.platform()).clear(),
    };
    println!("{note}");
}

fn handle_log(diagnostics: &Diagnostics, cmd: LogCommand) {
    diagnostics.general().append(NewLogEntry {
        message: cmd.message,
        stack: cmd.stack,
        severity: cmd.severity.map(Into::into),
        context: context_from_pairs(cmd.context),
    });
    println!("Recorded ({} entries)", diagnostics.general().len());
}

fn handle_report(diagnostics: &Diagnostics, cmd: ReportCommand) {
    diagnostics.platform().append(NewPlatformIssue {
        message: cmd.message,
        category: cmd.category.into(),
        severity: cmd.severity.map(Into::into),
        stack: cmd.stack,
        context: context_from_pairs(cmd.context),
    });
    println!("Recorded ({} issues)", diagnostics.platform().issue_count());
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!("  Slot directory:     {}", config.slots_directory().display());
                println!();
                println!("[Capture]");
                println!("  Panics:             {}", config.capture.panics);
                println!("  Rejections:         {}", config.capture.rejections);
                println!();
                println!("[Environment]");
                println!(
                    "  Location:           {}",
                    config.environment.location.as_deref().unwrap_or("(working directory)")
                );
                println!(
                    "  Agent:              {}",
                    config.environment.agent.as_deref().unwrap_or("(built-in)")
                );
                println!();
                println!("[Viewer]");
                println!("  Color:              {}", config.viewer.color);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
