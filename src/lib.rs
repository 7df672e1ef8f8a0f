pub mod backend;
pub mod cli;
pub mod console;
pub mod conversation;
pub mod docs;
pub mod models;

use backend::create_backend;
use cli::Args;
use console::Console;
use log::info;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Backend Base URL: {}", args.base_url);
    info!("Docs Base URL: {}", args.docs_base_url);
    info!("Request Timeout: {}s", args.timeout_secs);
    info!("API Key Set: {}", args.api_key.is_some());
    if let Some(id) = &args.conversation_id {
        info!("Resuming Conversation: {}", id);
    }
    info!("-------------------------");

    let backend = create_backend(&args)?;
    let mut console = Console::new(&args, backend);
    console.run(&args).await?;

    Ok(())
}
