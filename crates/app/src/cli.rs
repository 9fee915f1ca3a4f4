//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tether session client.
#[derive(Parser, Debug, Clone)]
#[command(name = "tether")]
#[command(version)]
#[command(about = "Log in to a backend app and call its functions", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./tether.toml if present)
    #[arg(short, long, env = "TETHER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Backend app identifier
    #[arg(long = "app-id", global = true)]
    pub client_app_id: Option<String>,

    /// User registry file
    #[arg(long, global = true)]
    pub storage_path: Option<PathBuf>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in and make the user active
    Login(LoginArgs),
    /// Log out the active user, or the given one
    Logout {
        /// User to log out
        #[arg(long)]
        user: Option<String>,
    },
    /// Show the active user
    Whoami {
        /// Also fetch the profile from the backend
        #[arg(long)]
        profile: bool,
    },
    /// List known users
    Users,
    /// Make another logged-in user active
    Switch {
        /// User to activate
        user: String,
    },
    /// Forget a user (the active one if none is given)
    Remove {
        /// User to remove
        user: Option<String>,
    },
    /// Refresh the active user's access token
    Refresh,
    /// Call a backend function
    Call(CallArgs),
    /// Stream results pushed by a backend function
    Watch(CallArgs),
}

/// Login provider selection.
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[command(subcommand)]
    pub provider: LoginProvider,
}

/// Supported login providers.
#[derive(Subcommand, Debug, Clone)]
pub enum LoginProvider {
    /// Anonymous login (reuses an existing anonymous session)
    Anonymous,
    /// Username and password
    UserPassword {
        /// Username
        #[arg(long)]
        username: String,
        /// Password
        #[arg(long, env = "TETHER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// API key
    ApiKey {
        /// The key
        #[arg(long, env = "TETHER_API_KEY", hide_env_values = true)]
        key: String,
        /// Treat the key as a server key
        #[arg(long)]
        server: bool,
    },
    /// Custom JWT issued by a third party
    Custom {
        /// The token
        #[arg(long, env = "TETHER_CUSTOM_TOKEN", hide_env_values = true)]
        token: String,
    },
}

/// A function invocation.
#[derive(Args, Debug, Clone)]
pub struct CallArgs {
    /// Function name
    pub name: String,
    /// Arguments, each a JSON value
    pub args: Vec<String>,
    /// Target a named service instead of the app
    #[arg(long)]
    pub service: Option<String>,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_call_parses_arguments() {
        let cli = Cli::try_parse_from(["tether", "--app-id", "a", "call", "add", "1", "2"])
            .expect("valid command line");
        let Command::Call(call) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(call.name, "add");
        assert_eq!(call.args, vec!["1", "2"]);
        assert_eq!(cli.client_app_id.as_deref(), Some("a"));
    }
}
