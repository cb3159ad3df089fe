use crate::config::Config;
use crate::directory::{DirectoryError, DirectorySource};
use crate::lookup;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::time::Duration;

pub struct Application {
    config: Config,
    source: DirectorySource,
}

impl Application {
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        let source = load_directory(&config)?;
        Ok(Self { config, source })
    }

    pub async fn run(mut self) -> Result<()> {
        log::info!("Starting nameplate with {} contacts", self.source.len());

        let mut rl = DefaultEditor::new()?;
        println!("Welcome to nameplate! Type 'help' for commands.");
        let prompt = ">> ";

        loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    if input == "exit" || input == "quit" {
                        break;
                    }
                    if let Err(err) = self.process_input(input).await {
                        log::error!("Failed to process command: {:?}", err);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    println!("Error: {:?}", err);
                    break;
                }
            }
        }
        Ok(())
    }

    async fn process_input(&mut self, input: &str) -> Result<()> {
        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };

        match command {
            "resolve" => {
                if rest.is_empty() {
                    println!("Usage: resolve <address>");
                    return Ok(());
                }
                self.resolve(rest).await
            }
            "contacts" => {
                if self.source.is_empty() {
                    println!("No contacts loaded.");
                    return Ok(());
                }
                for contact in self.source.contacts() {
                    let name = contact.display_name.as_deref().unwrap_or("(unnamed)");
                    println!("{} - {}", contact.address, name);
                }
                Ok(())
            }
            "reload" => {
                self.source = load_directory(&self.config)?;
                println!("Loaded {} contacts.", self.source.len());
                Ok(())
            }
            "help" => {
                println!("Available commands:");
                println!("  resolve <address> - Resolve an address to a display name");
                println!("  contacts - List loaded contacts");
                println!("  reload - Reload the contacts file");
                println!("  help - Show this help");
                println!("  exit - Exit the application");
                Ok(())
            }
            _ => {
                println!("Unknown command. Type 'help' for available commands.");
                Ok(())
            }
        }
    }

    async fn resolve(&self, address: &str) -> Result<()> {
        let resolved = match self.config.lookup.timeout_seconds {
            Some(secs) => {
                lookup::resolve_with_timeout(&self.source, address, Duration::from_secs(secs))
                    .await?
            }
            None => lookup::resolve_display_name(&self.source, address).await?,
        };
        match resolved {
            Some(name) => println!("{} -> {}", address, name),
            None => println!("No display name found for {}", address),
        }
        Ok(())
    }
}

fn load_directory(config: &Config) -> Result<DirectorySource> {
    let path = config.contacts_path()?;
    match DirectorySource::from_file(&path) {
        Ok(source) => Ok(source),
        Err(DirectoryError::NotFound(path)) => {
            log::warn!("No contacts file at {}; starting empty", path.display());
            Ok(DirectorySource::new(Vec::new()))
        }
        Err(err) => Err(err.into()),
    }
}
