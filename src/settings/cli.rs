use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "tickit", about = "Ticket and schedule backend")]
pub struct Cli {
    /// Path to a settings TOML file
    #[arg(long)]
    pub settings: Option<String>,
}
