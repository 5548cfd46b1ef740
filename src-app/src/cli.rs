use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use portal_core::{Role, UserFormData};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "PKCE demo portal", long_about = None)]
pub struct Cli {
    /// JSON config file; PORTAL_* environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render the view for a location path
    ///
    /// The tab channel lives inside this process only. Separate `portal`
    /// processes never see each other, so the single-tab gate always renders
    /// here after the election window. Use `tab --peers` to exercise blocking.
    Open {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Show the dashboard for the signed-in user
    Dashboard,

    /// Show who is signed in and their roles
    Whoami,

    /// Start the interactive sign-in redirect
    Login,

    /// Sign out of this app, or of the identity provider with --global
    Logout {
        #[arg(long)]
        global: bool,
    },

    /// Manage user accounts (admin only)
    Users {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Join the tab election alongside simulated peer tabs until Ctrl-C
    ///
    /// Peers are simulated inside this process. The tab channel does not
    /// cross process boundaries, so a second `portal` process is not a peer.
    Tab {
        /// Number of extra tabs opened after this one
        #[arg(short, long, default_value = "1")]
        peers: usize,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    List,
    Register(RegisterArgs),
    Delete { id: i64 },
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub confirm_password: String,
    #[arg(long, default_value = "")]
    pub first_name: String,
    #[arg(long, default_value = "")]
    pub last_name: String,
    #[arg(long, default_value = "basic")]
    pub role: Role,
}

impl From<RegisterArgs> for UserFormData {
    fn from(args: RegisterArgs) -> Self {
        Self {
            username: args.username,
            email: args.email,
            password: args.password,
            confirm_password: args.confirm_password,
            first_name: args.first_name,
            last_name: args.last_name,
            role: args.role,
        }
    }
}
