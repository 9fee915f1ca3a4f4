//! Command execution.

use serde_json::{Value, json};
use tether_application::{AppClient, SessionError};
use tether_domain::{AuthUser, Credential, UserId};

use crate::cli::{CallArgs, Command, LoginProvider};

/// Errors surfaced to the terminal.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The session layer failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A function argument is not valid JSON.
    #[error("argument {index} is not valid JSON: {source}")]
    InvalidArgument {
        /// Position of the argument.
        index: usize,
        /// Parse failure.
        source: serde_json::Error,
    },
}

impl CommandError {
    /// Returns true if logging in again would help.
    pub const fn needs_login(&self) -> bool {
        match self {
            Self::Session(error) => error.needs_login(),
            Self::InvalidArgument { .. } => false,
        }
    }
}

/// Runs one command and returns the JSON document to print.
///
/// # Errors
///
/// Returns the first failure of the underlying session operation.
pub async fn run(client: &AppClient, command: Command) -> Result<Value, CommandError> {
    let auth = client.auth();
    let output = match command {
        Command::Login(args) => {
            let user = auth.login(credential(args.provider)).await?;
            user_json(&user)
        }
        Command::Logout { user: Some(user) } => {
            auth.logout_user(&UserId::new(user)).await?;
            json!({ "logged_out": true })
        }
        Command::Logout { user: None } => {
            auth.logout().await?;
            json!({ "logged_out": true })
        }
        Command::Whoami { profile } => {
            let user = auth
                .active_user()
                .ok_or(SessionError::MustAuthenticateFirst)?;
            let mut output = user_json(&user);
            if profile && let Some(object) = output.as_object_mut() {
                object.insert("profile".to_string(), auth.profile().await?);
            }
            output
        }
        Command::Users => {
            let active = auth.active_user().map(|u| u.id);
            Value::Array(
                auth.list_users()
                    .iter()
                    .map(|user| {
                        let mut entry = user_json(user);
                        if let Some(object) = entry.as_object_mut() {
                            object.insert(
                                "active".to_string(),
                                json!(active.as_ref() == Some(&user.id)),
                            );
                        }
                        entry
                    })
                    .collect(),
            )
        }
        Command::Switch { user } => user_json(&auth.switch_active_user(&UserId::new(user)).await?),
        Command::Remove { user: Some(user) } => {
            auth.remove_user(&UserId::new(user)).await?;
            json!({ "removed": true })
        }
        Command::Remove { user: None } => {
            auth.remove_active_user().await?;
            json!({ "removed": true })
        }
        Command::Refresh => {
            let credentials = auth.refresh_access_token().await?;
            json!({ "user_id": credentials.user_id, "refreshed": true })
        }
        Command::Call(call) => {
            let arguments = parse_arguments(&call.args)?;
            match &call.service {
                Some(service) => {
                    client
                        .general_service_client(service)
                        .call_function(&call.name, arguments)
                        .await?
                }
                None => client.call_function(&call.name, arguments).await?,
            }
        }
        Command::Watch(call) => return watch(client, call).await,
    };
    Ok(output)
}

async fn watch(client: &AppClient, call: CallArgs) -> Result<Value, CommandError> {
    let arguments = parse_arguments(&call.args)?;
    let core = match &call.service {
        Some(service) => client.general_service_client(service),
        None => client.function_client().clone(),
    };
    let mut stream = core.stream_function(&call.name, arguments).await?;

    let mut received = 0_u64;
    while let Some(event) = stream.next_event().await {
        let event = event.map_err(SessionError::from)?;
        received += 1;
        println!(
            "{}",
            json!({ "event": event.event_name, "data": event.data })
        );
    }
    Ok(json!({ "events": received }))
}

fn credential(provider: LoginProvider) -> Credential {
    match provider {
        LoginProvider::Anonymous => Credential::Anonymous,
        LoginProvider::UserPassword { username, password } => {
            Credential::user_password(username, password)
        }
        LoginProvider::ApiKey { key, server: true } => Credential::ServerApiKey { key },
        LoginProvider::ApiKey { key, server: false } => Credential::UserApiKey { key },
        LoginProvider::Custom { token } => Credential::Custom { token },
    }
}

fn parse_arguments(raw: &[String]) -> Result<Vec<Value>, CommandError> {
    raw.iter()
        .enumerate()
        .map(|(index, arg)| {
            serde_json::from_str(arg).map_err(|source| CommandError::InvalidArgument { index, source })
        })
        .collect()
}

fn user_json(user: &AuthUser) -> Value {
    json!({
        "user_id": user.id,
        "device_id": user.device_id,
        "provider": user.provider,
        "logged_in": user.logged_in,
        "last_auth_activity": user.last_auth_activity,
    })
}
