use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use ts_core::ask::{run_ask, AskOptions};
use ts_core::config::Config;

fn print_help() {
    println!("thinkstream: stream answers from a remote agent");
    println!();
    println!("Usage:");
    println!("  thinkstream [options] \"question\"");
    println!("  echo \"question\" | thinkstream [options]");
    println!();
    println!("Options:");
    println!("  --agent <id>          Agent from config (default: first configured)");
    println!("  --session <id>        Continue an existing session");
    println!("  --reasoning on|off    Save the reasoning preference for the agent");
    println!("  --audio <file>        Ask by voice (wav, mp3, ogg, webm, m4a, flac)");
    println!("  --verbose             Debug logging to stderr (or set RUST_LOG)");
    println!("  --version             Print version");
    println!("  --help                Print this help");
}

#[derive(Debug, Default, PartialEq)]
struct Cli {
    help: bool,
    version: bool,
    verbose: bool,
    agent: Option<String>,
    session: Option<String>,
    reasoning: Option<bool>,
    audio: Option<PathBuf>,
    question: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut cli = Cli::default();
    let mut words = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--help" | "-h" => cli.help = true,
            "--version" | "-V" => cli.version = true,
            "--verbose" | "-v" => cli.verbose = true,
            "--agent" => cli.agent = Some(value("--agent")?),
            "--session" => cli.session = Some(value("--session")?),
            "--audio" => cli.audio = Some(PathBuf::from(value("--audio")?)),
            "--reasoning" => {
                cli.reasoning = Some(match value("--reasoning")?.as_str() {
                    "on" => true,
                    "off" => false,
                    other => return Err(format!("--reasoning expects on|off, got '{other}'")),
                })
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("unknown option '{flag}'"))
            }
            word => words.push(word.to_string()),
        }
    }

    if !words.is_empty() {
        cli.question = Some(words.join(" "));
    }
    Ok(cli)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("hint: thinkstream --help");
            std::process::exit(2);
        }
    };

    if cli.help {
        print_help();
        return;
    }

    if cli.version {
        println!("thinkstream {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    init_logging(cli.verbose);
    let config = Config::load_or_default();

    // Question from args, else piped stdin
    let question = cli.question.or_else(|| {
        if io::stdin().is_terminal() {
            return None;
        }
        let mut buf = String::new();
        match io::stdin().read_to_string(&mut buf) {
            Ok(_) if !buf.trim().is_empty() => Some(buf.trim().to_string()),
            _ => None,
        }
    });

    let opts = AskOptions {
        question,
        agent: cli.agent,
        session: cli.session,
        reasoning: cli.reasoning,
        audio: cli.audio,
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(run_ask(&config, opts));
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, String> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_args(&args)
    }

    #[test]
    fn question_words_are_joined() {
        let cli = parse(&["what", "is", "rust?"]).unwrap();
        assert_eq!(cli.question.as_deref(), Some("what is rust?"));
    }

    #[test]
    fn options_with_values() {
        let cli = parse(&[
            "--agent", "gemini", "--session", "s1", "--reasoning", "on", "--audio", "q.wav",
            "--verbose",
        ])
        .unwrap();
        assert_eq!(cli.agent.as_deref(), Some("gemini"));
        assert_eq!(cli.session.as_deref(), Some("s1"));
        assert_eq!(cli.reasoning, Some(true));
        assert_eq!(cli.audio, Some(PathBuf::from("q.wav")));
        assert!(cli.verbose);
        assert_eq!(cli.question, None);
    }

    #[test]
    fn reasoning_off() {
        assert_eq!(parse(&["--reasoning", "off", "hi"]).unwrap().reasoning, Some(false));
    }

    #[test]
    fn bad_arguments() {
        assert!(parse(&["--reasoning", "maybe"]).is_err());
        assert!(parse(&["--agent"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
    }

    #[test]
    fn help_and_version() {
        assert!(parse(&["-h"]).unwrap().help);
        assert!(parse(&["--version"]).unwrap().version);
    }
}
