use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the Ask-AI backend (e.g., https://admin.example.org)
    #[arg(long, env = "ASKAI_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Optional bearer token for the backend API.
    #[arg(long, env = "ASKAI_API_KEY")]
    pub api_key: Option<String>,

    /// Request timeout in seconds for backend calls.
    #[arg(long, env = "ASKAI_TIMEOUT_SECS", default_value = "60")]
    pub timeout_secs: u64,

    // --- Document Viewer Args ---
    /// Base URL the document viewer serves cited files from.
    #[arg(long, env = "ASKAI_DOCS_BASE_URL", default_value = "http://127.0.0.1:8000/documents")]
    pub docs_base_url: String,

    // --- Session Args ---
    /// Resume an existing conversation by id instead of starting fresh.
    #[arg(long, env = "ASKAI_CONVERSATION_ID")]
    pub conversation_id: Option<String>,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
