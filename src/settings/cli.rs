use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "authgate", version, about = "Client-side session tooling")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and store the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value_t = false)]
        remember_me: bool,
    },
    /// Print the signed-in user.
    Whoami,
    /// End the session and wipe every token tier.
    Logout,
    /// Authorized GET against the API.
    Get { path: String },
    /// Show what the route guard decides for a path.
    Check { path: String },
}
