//! Command-line front end for the intent service.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use intentwise::config::{self, StorageBackend};
use intentwise::logging::{self, LogOptions};
use intentwise::service::{ChatTurn, JsonFileSchemaProvider, KnowledgeSchemaProvider};
use intentwise::{CategorySchema, IntentService};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = parse_args(std::env::args().skip(1).collect())?;
    init_logging();

    let mut config = config::load_or_default().map_err(|err| err.to_string())?;
    if let Some(dir) = cli.store_dir {
        config.storage.dir = Some(dir);
    }
    if cli.sqlite {
        config.storage.backend = StorageBackend::Sqlite;
    }
    if matches!(cli.command, Command::InitConfig) {
        let path = config::save(&config).map_err(|err| err.to_string())?;
        println!("wrote {}", path.display());
        return Ok(());
    }
    let service = IntentService::open_configured(config).map_err(|err| err.to_string())?;

    let outcome = execute(&service, cli.command);
    let shutdown = service.shutdown().map_err(|err| err.to_string());
    outcome.and(shutdown)
}

fn init_logging() {
    let options = match LogOptions::with_app_logs() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("File logging disabled: {err}");
            LogOptions::console_only("warn")
        }
    };
    if let Err(err) = logging::init(&options) {
        eprintln!("Logging disabled: {err}");
    }
}

fn execute(service: &IntentService, command: Command) -> Result<(), String> {
    match command {
        Command::Train { schema } => {
            let schema = load_schema(schema)?;
            let result = service.train(&schema).map_err(|err| err.to_string())?;
            println!(
                "trained on {} examples ({} train / {} test)",
                result.sample_count, result.train_count, result.test_count
            );
            println!("accuracy: {:.4}", result.accuracy);
            for report in &result.per_category {
                println!(
                    "{:<20} precision={:.3}  recall={:.3}  f1={:.3}  support={}",
                    report.category, report.precision, report.recall, report.f1, report.support
                );
            }
        }
        Command::Predict { text } => {
            let prediction = service.predict(&text);
            print_json(&prediction)?;
        }
        Command::Feedback {
            text,
            category,
            satisfaction,
        } => {
            let outcome = service
                .submit_feedback(&text, &category, satisfaction)
                .map_err(|err| err.to_string())?;
            print_json(&outcome)?;
        }
        Command::Status => print_json(&service.status())?,
        Command::Metrics => match service.last_metrics() {
            Some(metrics) => print_json(&metrics)?,
            None => println!("no training metrics recorded"),
        },
        Command::InitConfig => {}
        Command::Chat { schema } => chat(service, &load_schema(schema)?)?,
    }
    Ok(())
}

fn chat(service: &IntentService, schema: &CategorySchema) -> Result<(), String> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut history: Vec<ChatTurn> = Vec::new();
    loop {
        print!("> ");
        stdout.flush().map_err(|err| err.to_string())?;
        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|err| err.to_string())?;
        if read == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "/quit" | "/exit") {
            break;
        }
        let reply = service.respond(line, schema, &history);
        println!(
            "[{} {:.2} {}] {}",
            reply.prediction.category,
            reply.prediction.confidence,
            reply.prediction.band.as_str(),
            reply.text
        );
        if let Some(follow_up) = &reply.follow_up {
            println!("  {follow_up}");
        }
        history.push(ChatTurn::user(line));
        history.push(ChatTurn::assistant(reply.text));
    }
    Ok(())
}

fn load_schema(path: PathBuf) -> Result<CategorySchema, String> {
    JsonFileSchemaProvider::new(path)
        .schema()
        .map_err(|err| err.to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{text}");
    Ok(())
}

#[derive(Debug)]
enum Command {
    Train { schema: PathBuf },
    Predict { text: String },
    Feedback {
        text: String,
        category: String,
        satisfaction: Option<f32>,
    },
    Status,
    Metrics,
    Chat { schema: PathBuf },
    InitConfig,
}

#[derive(Debug)]
struct CliOptions {
    store_dir: Option<PathBuf>,
    sqlite: bool,
    command: Command,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut store_dir: Option<PathBuf> = None;
    let mut sqlite = false;
    let mut command: Option<String> = None;
    let mut schema: Option<PathBuf> = None;
    let mut text: Option<String> = None;
    let mut category: Option<String> = None;
    let mut satisfaction: Option<f32> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--store" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--store requires a value".to_string())?;
                store_dir = Some(PathBuf::from(value));
            }
            "--sqlite" => {
                sqlite = true;
            }
            "--schema" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--schema requires a value".to_string())?;
                schema = Some(PathBuf::from(value));
            }
            "--text" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--text requires a value".to_string())?;
                text = Some(value.clone());
            }
            "--category" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--category requires a value".to_string())?;
                category = Some(value.clone());
            }
            "--satisfaction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--satisfaction requires a value".to_string())?;
                satisfaction = Some(
                    value
                        .parse::<f32>()
                        .map_err(|_| format!("Invalid --satisfaction value: {value}"))?,
                );
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            value => {
                if command.is_none() {
                    command = Some(value.to_string());
                } else {
                    positional.push(value.to_string());
                }
            }
        }
        idx += 1;
    }

    let command = match command.as_deref() {
        Some("train") => Command::Train {
            schema: schema.ok_or_else(|| "train requires --schema <file>".to_string())?,
        },
        Some("predict") => {
            let text = text.unwrap_or_else(|| positional.join(" "));
            if text.trim().is_empty() {
                return Err("predict requires text".to_string());
            }
            Command::Predict { text }
        }
        Some("feedback") => Command::Feedback {
            text: text.ok_or_else(|| "feedback requires --text <text>".to_string())?,
            category: category.ok_or_else(|| "feedback requires --category <name>".to_string())?,
            satisfaction,
        },
        Some("status") => Command::Status,
        Some("metrics") => Command::Metrics,
        Some("init-config") => Command::InitConfig,
        Some("chat") => Command::Chat {
            schema: schema.ok_or_else(|| "chat requires --schema <file>".to_string())?,
        },
        Some(other) => return Err(format!("Unknown command: {other}\n\n{}", help_text())),
        None => return Err(help_text()),
    };

    Ok(CliOptions {
        store_dir,
        sqlite,
        command,
    })
}

fn help_text() -> String {
    [
        "Usage: intentwise [--store <dir>] [--sqlite] <command> [options]",
        "",
        "Commands:",
        "  train --schema <file>                     Train from a JSON category schema",
        "  predict <text>                            Classify one utterance",
        "  feedback --text <t> --category <c> [--satisfaction <0..1>]",
        "                                            Record a correction",
        "  status                                    Show the live model",
        "  metrics                                   Show the last training report",
        "  init-config                               Write the effective config file",
        "  chat --schema <file>                      Reply to lines read from stdin",
        "",
        "Options:",
        "  --store <dir>    Storage directory (default: <app root>/store)",
        "  --sqlite         Use the SQLite store instead of plain files",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn predict_joins_positional_words() {
        let cli = parse_args(args(&["--sqlite", "predict", "how", "much"])).unwrap();
        assert!(cli.sqlite);
        assert!(matches!(cli.command, Command::Predict { text } if text == "how much"));
    }

    #[test]
    fn feedback_requires_category() {
        let err = parse_args(args(&["feedback", "--text", "hi"])).unwrap_err();
        assert!(err.contains("--category"));
    }

    #[test]
    fn global_store_applies_anywhere() {
        let cli = parse_args(args(&["status", "--store", "/tmp/x"])).unwrap();
        assert_eq!(cli.store_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn init_config_keeps_storage_flags() {
        let cli = parse_args(args(&["--sqlite", "init-config"])).unwrap();
        assert!(cli.sqlite);
        assert!(matches!(cli.command, Command::InitConfig));
        assert!(matches!(
            parse_args(args(&["metrics"])).unwrap().command,
            Command::Metrics
        ));
    }

    #[test]
    fn bad_satisfaction_is_rejected() {
        assert!(parse_args(args(&["feedback", "--satisfaction", "high"])).is_err());
    }
}
