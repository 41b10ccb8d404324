use clap::Parser;
use jsonql::output::render;
use jsonql::{EngineConfig, GroupColumnPolicy, Jql, OutputFormat, QueryError};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run SQL-like queries over a JSON array of flat objects
#[derive(Parser, Debug)]
#[command(name = "jsonql")]
#[command(about = "SQL-like queries over JSON record collections", long_about = None)]
struct Args {
    /// JSON file holding an array of flat objects
    #[arg(short, long)]
    data: PathBuf,

    /// Query to run once; starts an interactive session when omitted
    query: Option<String>,

    /// Output format (table or json)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Non-grouped select columns in GROUP BY mode (first or omit)
    #[arg(long)]
    group_columns: Option<GroupColumnPolicy>,

    /// Config file (defaults to ./jsonql.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    /// CLI flags override everything else.
    fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(format) = self.format {
            config.output_format = format;
        }
        if let Some(policy) = self.group_columns {
            config.group_columns = policy;
        }
        config
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match EngineConfig::load(args.config.as_deref()) {
        Ok(config) => args.apply(config),
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: EngineConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&args.data).map_err(QueryError::from)?;
    let jql = Jql::from_json(&text)?.with_options(config.execution_options());
    tracing::debug!(records = jql.data().len(), path = %args.data.display(), "dataset loaded");

    match &args.query {
        Some(query) => {
            let result = jql.query(query)?;
            print!("{}", render(&result, config.output_format)?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            repl(&jql, config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn repl(jql: &Jql, config: EngineConfig) -> Result<(), ReadlineError> {
    let mut rl = DefaultEditor::new()?;
    let mut format = config.output_format;

    if let Some(ref path) = config.history_file {
        let _ = rl.load_history(path); // Ignore error if file doesn't exist
    }

    println!("jsonql {} - {} records loaded", env!("CARGO_PKG_VERSION"), jql.data().len());
    println!("Type \\? for help, \\q to quit.\n");

    loop {
        let line = match rl.readline("jsonql> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                save_history(&mut rl, &config);
                return Err(err);
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        if input.starts_with('\\') {
            match input {
                "\\q" | "\\quit" => break,
                "\\fields" => {
                    match jql.data().records().first() {
                        Some(record) => println!("{}", record.field_names().collect::<Vec<_>>().join(", ")),
                        None => println!("(no records)"),
                    }
                }
                "\\?" | "\\h" | "\\help" => print_help(),
                _ if input.starts_with("\\format") => {
                    let arg = input.trim_start_matches("\\format").trim();
                    if arg.is_empty() {
                        println!("Output format: {format}");
                    } else {
                        match arg.parse::<OutputFormat>() {
                            Ok(new_format) => {
                                format = new_format;
                                println!("Output format: {format}");
                            }
                            Err(e) => eprintln!("Error: {e}"),
                        }
                    }
                }
                _ => println!("Unknown meta-command: {input}. Use \\? for help."),
            }
            continue;
        }

        match jql.query(input).and_then(|result| render(&result, format)) {
            Ok(text) => print!("{text}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    save_history(&mut rl, &config);
    Ok(())
}

fn save_history(rl: &mut DefaultEditor, config: &EngineConfig) {
    if let Some(ref path) = config.history_file {
        if let Err(e) = rl.save_history(path) {
            tracing::warn!(error = %e, "could not save history");
        }
    }
}

fn print_help() {
    println!("Meta-commands:");
    println!("  \\q, \\quit             - Quit");
    println!("  \\fields               - List field names of the first record");
    println!("  \\format [table|json]  - Show or set the output format");
    println!("  \\?, \\h, \\help         - Show this help");
    println!("\nQueries: SELECT ... [WHERE ...] [GROUP BY ...] [ORDER BY ...] [LIMIT n [OFFSET m]]");
}
