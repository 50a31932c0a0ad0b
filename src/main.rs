use anyhow::Result;
use argh::FromArgs;
use dev_console::{Console, ConsoleConfig};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Developer console: run built-in commands or evaluate snippets.
struct Args {
    #[argh(option, default = "50", from_str_fn(parse_capacity))]
    /// maximum number of output lines kept (at least 1)
    max_output_lines: usize,

    #[argh(option, default = "25", from_str_fn(parse_capacity))]
    /// maximum number of commands kept in the command history (at least 1)
    max_command_history: usize,

    #[argh(option)]
    /// snippet namespace to enable; repeat for several (all when omitted)
    namespace: Vec<String>,

    #[argh(switch)]
    /// report lines that match no command as errors instead of evaluating them
    no_fallback: bool,

    #[argh(option, short = 'c')]
    /// evaluate this line and exit instead of starting the prompt; repeatable
    command: Vec<String>,

    #[argh(switch, short = 'v')]
    /// log at info level
    verbose: bool,
}

/// History sizes must keep at least the latest entry, or nothing would ever be shown.
fn parse_capacity(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("expected a positive number: {}", e)),
    }
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    // Logs go to stderr so they never mix with console output
    let level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = ConsoleConfig::default()
        .max_output_lines(args.max_output_lines)
        .max_command_history(args.max_command_history)
        .fallback(!args.no_fallback);
    if !args.namespace.is_empty() {
        config = config.namespaces(args.namespace);
    }
    tracing::info!(?config, "starting console");

    let mut console = Console::new(config);

    if args.command.is_empty() {
        console.repl()?;
        return Ok(());
    }

    for line in &args.command {
        for text in console.evaluate_collect(line) {
            println!("{}", text);
        }
        if console.should_exit() {
            break;
        }
    }
    Ok(())
}
