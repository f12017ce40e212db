#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::assigning_clones,
    clippy::bool_to_int_with_if,
    clippy::case_sensitive_file_extension_comparisons,
    clippy::cast_possible_wrap,
    clippy::doc_markdown,
    clippy::field_reassign_with_default,
    clippy::float_cmp,
    clippy::implicit_clone,
    clippy::items_after_statements,
    clippy::map_unwrap_or,
    clippy::manual_let_else,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::needless_raw_string_hashes,
    clippy::redundant_closure_for_method_calls,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unused_self,
    clippy::cast_precision_loss,
    clippy::unnecessary_cast,
    clippy::unnecessary_lazy_evaluations,
    clippy::unnecessary_literal_bound,
    clippy::unnecessary_map_or,
    clippy::unnecessary_wraps,
    dead_code
)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use dentabot::bot::{Activity, ParticipantId, ReplySink, WelcomeGreeter};
use dentabot::{gateway, Config, DentaBot};
use std::io::Write;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const CLI_USER_ID: &str = "cli-user";
const CLI_CONVERSATION_ID: &str = "cli";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// `DentaBot` - virtual assistant for Contoso Dentistry.
#[derive(Parser, Debug)]
#[command(name = "dentabot")]
#[command(version)]
#[command(about = "Contoso Dentistry virtual assistant.", long_about = None)]
struct Cli {
    /// Path to config.toml (default: $DENTABOT_CONFIG or ~/.dentabot/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway that chat channels post activities to
    #[command(long_about = "\
Start the HTTP gateway that chat channels post activities to.

Serves POST /api/messages and GET /health. Bind address defaults to \
the values in your config file (gateway.host / gateway.port).

Examples:
  dentabot serve                  # use config defaults
  dentabot serve -p 8080          # listen on port 8080
  dentabot serve --host 0.0.0.0   # bind to all interfaces")]
    Serve {
        /// Port to listen on (0 = random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Route one message through the bot and print the reply
    #[command(long_about = "\
Route one message through the bot and print the reply.

Calls the configured LUIS, QnA Maker and scheduler services exactly \
as a chat message arriving through the gateway would.

Examples:
  dentabot ask -m \"what slots are free?\"
  dentabot ask -m \"book me for 3pm tomorrow\"")]
    Ask {
        /// Message text
        #[arg(short, long)]
        message: String,
    },

    /// Print the greetings produced when participants join
    Greet {
        /// Ids of the participants that joined
        #[arg(required = true)]
        participants: Vec<String>,

        /// The bot's own participant id (never greeted)
        #[arg(long, default_value = "dentabot")]
        self_id: String,
    },

    /// Show configuration status (secrets masked)
    Status,

    #[command(long_about = "\
Generate shell completion scripts for `dentabot`.

The script is printed to stdout so it can be sourced directly:

Examples:
  source <(dentabot completions bash)
  dentabot completions zsh > ~/.zfunc/_dentabot
  dentabot completions fish > ~/.config/fish/completions/dentabot.fish")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Prints bot replies to stdout.
struct StdoutSink;

#[async_trait]
impl ReplySink for StdoutSink {
    async fn send(&self, activity: Activity) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", activity.text.as_deref().unwrap_or_default())?;
        stdout.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        if path.trim().is_empty() {
            bail!("--config cannot be empty");
        }
    }

    // Completions must remain stdout-only and should not load config or initialize logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut stdout = std::io::stdout().lock();
        write_shell_completion(*shell, &mut stdout)?;
        return Ok(());
    }

    // Logs go to stderr so `ask` and `greet` output stays pipeable.
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Completions { .. } => unreachable!(),

        Commands::Serve { port, host } => {
            let config = Config::load(config_path).await?;
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            if port == 0 {
                info!("Starting DentaBot gateway on {host} (random port)");
            } else {
                info!("Starting DentaBot gateway on {host}:{port}");
            }
            gateway::run_gateway(&host, port, config).await
        }

        Commands::Ask { message } => {
            let config = Config::load(config_path).await?;
            let bot = DentaBot::from_config(&config)?;
            let activity = Activity::message(
                CLI_USER_ID,
                "dentabot",
                CLI_CONVERSATION_ID,
                &message,
            );
            let sent = bot.on_activity(&activity, &StdoutSink).await?;
            if sent == 0 {
                bail!("message is empty");
            }
            Ok(())
        }

        Commands::Greet {
            participants,
            self_id,
        } => {
            let config = Config::load_unvalidated(config_path).await?;
            let greeter = WelcomeGreeter::from_config(&config.bot);
            let joined: Vec<ParticipantId> =
                participants.iter().map(|p| ParticipantId::new(p)).collect();
            for reply in greeter.on_participants_added(&joined, &ParticipantId::new(&self_id)) {
                println!("{}", reply.text);
            }
            Ok(())
        }

        Commands::Status => {
            let config = Config::load_unvalidated(config_path).await?;
            println!("DentaBot Status");
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!(
                "Gateway:     {}:{}{}",
                config.gateway.host,
                config.gateway.port,
                if config.gateway.bearer_token.is_some() {
                    " (bearer token required)"
                } else {
                    ""
                }
            );
            println!(
                "Timeouts:    collaborators {}s, requests {}s",
                config.bot.collaborator_timeout_secs, config.gateway.request_timeout_secs
            );
            match config.validate() {
                Ok(()) => println!("Validation:  ok"),
                Err(e) => println!("Validation:  {e}"),
            }
            println!();
            print!("{}", config.masked()?);
            Ok(())
        }
    }
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_has_no_flag_conflicts() {
        Cli::command().debug_assert();
    }

    #[test]
    fn completions_cli_parses_supported_shells() {
        for shell in ["bash", "fish", "zsh", "powershell", "elvish"] {
            let cli = Cli::try_parse_from(["dentabot", "completions", shell])
                .expect("completions invocation should parse");
            match cli.command {
                Commands::Completions { .. } => {}
                other => panic!("expected completions command, got {other:?}"),
            }
        }
    }

    #[test]
    fn completion_generation_mentions_binary_name() {
        let mut output = Vec::new();
        write_shell_completion(CompletionShell::Bash, &mut output)
            .expect("completion generation should succeed");
        let script = String::from_utf8(output).expect("completion output should be valid utf-8");
        assert!(script.contains("dentabot"));
    }

    #[test]
    fn global_config_flag_applies_to_subcommands() {
        let cli = Cli::try_parse_from(["dentabot", "status", "--config", "/tmp/bot.toml"])
            .expect("status should parse");
        assert_eq!(cli.config.as_deref(), Some("/tmp/bot.toml"));
    }

    #[test]
    fn ask_requires_message() {
        assert!(Cli::try_parse_from(["dentabot", "ask"]).is_err());
        let cli = Cli::try_parse_from(["dentabot", "ask", "-m", "free slots?"]).unwrap();
        match cli.command {
            Commands::Ask { message } => assert_eq!(message, "free slots?"),
            other => panic!("expected ask command, got {other:?}"),
        }
    }

    #[test]
    fn greet_defaults_self_id() {
        let cli = Cli::try_parse_from(["dentabot", "greet", "alice", "bob"]).unwrap();
        match cli.command {
            Commands::Greet {
                participants,
                self_id,
            } => {
                assert_eq!(participants, vec!["alice", "bob"]);
                assert_eq!(self_id, "dentabot");
            }
            other => panic!("expected greet command, got {other:?}"),
        }
    }

    #[test]
    fn serve_accepts_host_and_port() {
        let cli =
            Cli::try_parse_from(["dentabot", "serve", "-p", "8080", "--host", "0.0.0.0"]).unwrap();
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(8080));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            other => panic!("expected serve command, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stdout_sink_accepts_replies() {
        let sink = StdoutSink;
        assert_eq!(sink.name(), "stdout");
        sink.send(Activity::message("bot", "user", "c", "hello"))
            .await
            .unwrap();
    }
}
