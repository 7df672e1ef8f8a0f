use log::info;
use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };

use crate::backend::ChatBackend;
use crate::cli::Args;
use crate::conversation::{ ConversationManager, SendOutcome };
use crate::docs;
use crate::models::chat::{ Message, ROLE_ASSISTANT };

const HELP: &str = "Commands: :new (start a new chat), :load <id> (resume a session), :quit";

/// Line-oriented front end over the conversation manager. Each line is one
/// query; commands are prefixed with ':'.
pub struct Console {
    manager: ConversationManager,
    docs_base_url: String,
}

impl Console {
    pub fn new(args: &Args, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            manager: ConversationManager::new(backend),
            docs_base_url: args.docs_base_url.clone(),
        }
    }

    pub async fn run(&mut self, args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
        println!("Ask-AI console. {}", HELP);

        if let Some(id) = &args.conversation_id {
            self.load(id).await;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let line = match lines.next_line().await? {
                Some(line) => line,
                None => {
                    break;
                } // stdin closed
            };

            match line.trim() {
                ":quit" | ":exit" => {
                    break;
                }
                ":help" => println!("{}", HELP),
                ":new" => {
                    self.manager.new_chat();
                    println!("Started a new chat.");
                }
                cmd if cmd == ":load" || cmd.starts_with(":load ") => {
                    match cmd.strip_prefix(":load").map(str::trim) {
                        Some(id) if !id.is_empty() => self.load(id).await,
                        _ => println!("Usage: :load <conversation-id>"),
                    }
                }
                cmd if cmd.starts_with(':') => {
                    println!("Unknown command '{}'. {}", cmd, HELP);
                }
                input => self.send(input).await,
            }
        }

        info!("Console session ended");
        Ok(())
    }

    async fn send(&mut self, input: &str) {
        match self.manager.send_query(input).await {
            SendOutcome::Completed => {
                if let Some(msg) = self.manager.messages().last() {
                    self.print_assistant(msg);
                }
            }
            SendOutcome::RejectedEmpty => {}
            SendOutcome::RejectedBusy => println!("Still waiting on the previous question."),
        }
    }

    async fn load(&mut self, id: &str) {
        match self.manager.load_session(id).await {
            Ok(count) => {
                println!("Loaded conversation {} ({} messages).", id, count);
                for msg in self.manager.messages() {
                    if msg.role == ROLE_ASSISTANT {
                        self.print_assistant(msg);
                    } else {
                        println!("you: {}", msg.content);
                    }
                }
            }
            Err(e) => println!("Could not load conversation {}: {}", id, e),
        }
    }

    fn print_assistant(&self, msg: &Message) {
        println!("{}", msg.content);
        if msg.sources.is_empty() {
            return;
        }
        println!("Sources:");
        for source in &msg.sources {
            let name = source.source.as_deref().unwrap_or("(unnamed document)");
            let page = source.page.map(|p| format!(" (Page {})", p)).unwrap_or_default();
            match docs::document_url(&self.docs_base_url, source) {
                Ok(url) => println!("  - {}{} <{}>", name, page, url),
                Err(_) => println!("  - {}{}", name, page),
            }
        }
    }
}
