use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::bridge::PersistenceBridge;
use crate::io::config_io;
use crate::io::recovery;
use crate::logging;
use crate::model::config::Config;
use crate::ops::store::Toggle;
use crate::session::Session;

type CmdResult = Result<(), Box<dyn Error>>;

/// How long `watch` blocks before checking the channel again
const WATCH_TICK: Duration = Duration::from_millis(500);

/// Resolved settings for one invocation
struct Context {
    config_path: PathBuf,
    config: Config,
    data_dir: PathBuf,
    json: bool,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(config_io::config_path);

    let (config, config_problem) = match config_io::read_config(&config_path) {
        Ok((config, _)) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    logging::init_logging(&config.log.level);
    if let Some(e) = &config_problem {
        warn!(error = %e, "using default configuration");
        eprintln!("warning: {} (using defaults)", e);
    }

    let data_dir = cli
        .data_dir
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| config.storage.dir.clone())
        .unwrap_or_else(config_io::default_data_dir);

    let ctx = Context {
        config_path,
        config,
        data_dir,
        json: cli.json,
    };

    match cli.command {
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Toggle(args) => cmd_toggle(&ctx, args),
        Commands::Delete(args) => cmd_delete(&ctx, args),
        Commands::Clear => cmd_clear(&ctx),
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Watch(args) => cmd_watch(&ctx, args),
        Commands::Recovery(args) => cmd_recovery(&ctx, args),
        Commands::Config(args) => cmd_config(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_bridge(ctx: &Context) -> Result<PersistenceBridge, Box<dyn Error>> {
    Ok(PersistenceBridge::open(&ctx.data_dir, &ctx.config.storage.key)?)
}

fn open_session(ctx: &Context) -> Result<Session, Box<dyn Error>> {
    Ok(Session::open(open_bridge(ctx)?))
}

/// Report save problems on stderr. They never fail the command.
fn report_warnings(session: &mut Session) {
    for warning in session.take_warnings() {
        eprintln!("warning: {}", warning.message);
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_projection(ctx: &Context, session: &Session) -> CmdResult {
    let projection = session.projection();
    if ctx.json {
        print_json(&projection_to_json(&projection))
    } else {
        for line in format_projection(&projection) {
            println!("{}", line);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    let added = session.add(&args.text.join(" "));
    report_warnings(&mut session);

    // Blank text is silently ignored
    if let Some(task) = added {
        if ctx.json {
            print_json(&task)?;
        } else {
            println!("{}", format_task_line(&task));
        }
    }
    Ok(())
}

fn cmd_toggle(ctx: &Context, args: IdArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    let outcome = session.toggle(args.id);
    report_warnings(&mut session);

    let task = session.store().get(args.id).cloned();
    if ctx.json {
        return print_json(&ToggleJson {
            found: outcome != Toggle::NotFound,
            task,
        });
    }
    match task {
        Some(task) => println!("{}", format_task_line(&task)),
        None => eprintln!("note: no task with id {}", args.id),
    }
    Ok(())
}

fn cmd_delete(ctx: &Context, args: IdArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    let removed = session.delete(args.id);
    report_warnings(&mut session);

    if ctx.json {
        print_json(&DeleteJson { removed })
    } else {
        if removed {
            println!("deleted {}", args.id);
        }
        Ok(())
    }
}

fn cmd_clear(ctx: &Context) -> CmdResult {
    let mut session = open_session(ctx)?;
    let removed = session.clear_completed();
    report_warnings(&mut session);

    if ctx.json {
        print_json(&ClearJson { removed })
    } else {
        println!(
            "cleared {} completed task{}",
            removed,
            if removed == 1 { "" } else { "s" }
        );
        Ok(())
    }
}

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let mut session = open_session(ctx)?;
    session.set_filter(args.filter);
    print_projection(ctx, &session)
}

/// Print the list, then reprint it whenever another process saves.
/// Runs until interrupted.
fn cmd_watch(ctx: &Context, args: ListArgs) -> CmdResult {
    // Subscribe before the first load so no sibling write falls in between
    let bridge = open_bridge(ctx)?;
    let watcher = bridge.subscribe()?;
    let mut session = Session::open(bridge);
    session.set_filter(args.filter);

    print_projection(ctx, &session)?;
    loop {
        if watcher.recv_timeout(WATCH_TICK).is_none() {
            continue;
        }
        session.handle_external_change();
        if !ctx.json {
            println!();
        }
        print_projection(ctx, &session)?;
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

fn cmd_recovery(ctx: &Context, args: RecoveryCmd) -> CmdResult {
    if let Some(RecoveryAction::Prune(prune)) = args.action {
        let before = match prune.days {
            Some(days) => Some(prune_cutoff(days)?),
            None => None,
        };
        let removed = recovery::prune_recovery(&ctx.data_dir, before, prune.all)?;
        if ctx.json {
            return print_json(&serde_json::json!({ "removed": removed }));
        }
        println!(
            "pruned {} entr{}",
            removed,
            if removed == 1 { "y" } else { "ies" }
        );
        return Ok(());
    }

    let entries = recovery::read_recovery_entries(&ctx.data_dir, args.limit);
    if ctx.json {
        let values: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
        return print_json(&values);
    }
    if entries.is_empty() {
        println!("recovery log is empty");
        return Ok(());
    }
    for entry in &entries {
        print!("{}", entry.to_display_markdown());
    }
    Ok(())
}

/// Timestamp `days` ago, or an error when that is before the calendar range
fn prune_cutoff(days: i64) -> Result<chrono::DateTime<chrono::Utc>, Box<dyn Error>> {
    chrono::Duration::try_days(days)
        .and_then(|age| chrono::Utc::now().checked_sub_signed(age))
        .ok_or_else(|| format!("invalid --days {}: too far in the past", days).into())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(ctx: &Context, args: ConfigCmd) -> CmdResult {
    match args.action {
        ConfigAction::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
        ConfigAction::Show => {
            if ctx.json {
                return print_json(&serde_json::json!({
                    "config_path": ctx.config_path,
                    "data_dir": ctx.data_dir,
                    "key": ctx.config.storage.key,
                    "log_level": ctx.config.log.level,
                }));
            }
            println!("config:    {}", ctx.config_path.display());
            println!("data dir:  {}", ctx.data_dir.display());
            println!("slot key:  {}", ctx.config.storage.key);
            println!("log level: {}", ctx.config.log.level);
            Ok(())
        }
        ConfigAction::Set(set) => {
            let (_, mut doc) = config_io::read_config(&ctx.config_path)?;
            config_io::set_value(&mut doc, &set.key, &set.value)?;
            config_io::write_config(&ctx.config_path, &doc)?;
            println!("{} = {:?}", set.key, set.value);
            Ok(())
        }
    }
}

