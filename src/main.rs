use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::sync::Arc;
use totpgen::application::refresh;
use totpgen::infrastructure::config::Config;
use totpgen::infrastructure::keychain::KeychainBackend;
use totpgen::infrastructure::memory::MemoryBackend;
use totpgen::{DisplayFrame, SecretBackend, SystemClock, TOTPApplication};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP_TEXT: &str = "\
Adding sites

To add sites, enter both a unique name to remember the site, i.e. 'CRM Production',
and the secret provided by the site. This will often be presented as a code under
the QR code or the code will be available via a link.";

const BAR_WIDTH: usize = 30;

#[derive(Parser, Debug)]
#[command(name = "totpgen", version, about = "TOTP Generator")]
struct Cli {
    /// Keep sites in memory only instead of the OS keyring.
    #[arg(long, env = "TOTPGEN_EPHEMERAL")]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all registered sites
    List,
    /// Add new TOTP secret for a site (read from stdin when omitted)
    Add {
        site_name: String,
        secret: Option<String>,
    },
    /// Delete TOTP secret for a site
    #[command(alias = "delete")]
    Remove { site_name: String },
    /// Print the current code for a site
    Code { site_name: String },
    /// Check a code against a site, tolerating clock skew
    Verify { site_name: String, code: String },
    /// Continuously display the code for a site with a countdown
    Watch { site_name: Option<String> },
    /// How to add sites
    Guide,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    let backend: Arc<dyn SecretBackend> = if cli.ephemeral {
        Arc::new(MemoryBackend::new())
    } else {
        Arc::new(KeychainBackend::new())
    };
    let app = Arc::new(TOTPApplication::new(
        backend,
        config.service.clone(),
        config.user.clone(),
        config.otp,
    )?);
    app.load().await;

    match cli.command {
        Command::List => {
            let sites = app.list_sites().await;
            if sites.is_empty() {
                println!("No sites yet. Run `totpgen guide` to see how to add one.");
            }
            for site in sites {
                println!("{}", site);
            }
        }
        Command::Add { site_name, secret } => {
            let secret = match secret {
                Some(secret) => secret,
                None => {
                    eprint!("Secret for {}: ", site_name);
                    std::io::stderr().flush()?;
                    read_secret(std::io::stdin().lock())?
                }
            };
            app.add_secret(&site_name, &secret).await?;
            println!("Added {}", site_name);
        }
        Command::Remove { site_name } => {
            app.delete_secret(&site_name).await?;
            println!("Deleted {}", site_name);
        }
        Command::Code { site_name } => {
            let now = Utc::now();
            let code = app.code_for_site(&site_name, now).await?;
            println!(
                "Code: {} ({}s remaining)",
                code,
                app.totp().remaining_seconds(now)
            );
        }
        Command::Verify { site_name, code } => {
            if app.verify_code(&site_name, &code, Utc::now()).await? {
                println!("Code is valid");
            } else {
                anyhow::bail!("Code is not valid for {}", site_name);
            }
        }
        Command::Watch { site_name } => watch(app, &config, site_name).await?,
        Command::Guide => println!("{}", HELP_TEXT),
    }

    Ok(())
}

async fn watch(app: Arc<TOTPApplication>, config: &Config, site_name: Option<String>) -> Result<()> {
    if let Some(site_name) = site_name {
        if !app.list_sites().await.contains(&site_name) {
            anyhow::bail!("No secret found for site: {}", site_name);
        }
        app.select(&site_name).await;
        println!("TOTP Generator for {}", site_name);
    }

    let handle = refresh::spawn(app, config.refresh_interval(), Arc::new(SystemClock));
    let mut frames = handle.subscribe();
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                write!(stdout, "\r{}", render(&frame))?;
                stdout.flush()?;
            }
        }
    }

    writeln!(stdout)?;
    handle.shutdown().await;
    Ok(())
}

fn read_secret(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read secret from stdin")?;
    let secret = line.trim().to_string();
    if secret.is_empty() {
        anyhow::bail!("No secret given");
    }
    Ok(secret)
}

fn render(frame: &DisplayFrame) -> String {
    match frame.fraction_remaining() {
        Some(remaining) => {
            let filled = ((remaining * BAR_WIDTH as f64).ceil() as usize).min(BAR_WIDTH);
            format!(
                "{:>9} [{}{}]",
                frame.text(),
                "#".repeat(filled),
                " ".repeat(BAR_WIDTH - filled)
            )
        }
        None => format!("{:>9} {}", frame.text(), " ".repeat(BAR_WIDTH + 2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_secret_from_first_line() {
        let input = b"  JBSW Y3DP EHPK 3PXP \nignored\n";
        assert_eq!(read_secret(&input[..]).unwrap(), "JBSW Y3DP EHPK 3PXP");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(read_secret(&b""[..]).is_err());
        assert!(read_secret(&b"   \n"[..]).is_err());
    }

    #[test]
    fn add_secret_argument_is_optional() {
        let cli = Cli::try_parse_from(["totpgen", "add", "CRM Production"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Add { ref site_name, secret: None } if site_name == "CRM Production"
        ));

        let cli = Cli::try_parse_from(["totpgen", "add", "Mail", "JBSWY3DPEHPK3PXP"]).unwrap();
        assert!(matches!(cli.command, Command::Add { secret: Some(_), .. }));
    }
}
