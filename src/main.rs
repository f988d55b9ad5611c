use authgate::application_impl::GuardDecision;
use authgate::client::AuthClient;
use authgate::logger::*;
use authgate::settings::*;
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let client = AuthClient::try_new(&project_settings).await?;

    match cli.command.unwrap_or(Command::Whoami) {
        Command::Login {
            email,
            password,
            remember_me,
        } => {
            let user = client.login(&email, &password, remember_me).await?;
            println!("signed in as {} <{}> ({})", user.name, user.email, user.role);
        }
        Command::Whoami => match client.validator().validate_session().await.user() {
            Some(user) => {
                let info = client.validator().session_info().await;
                println!("{} <{}>", user.name, user.email);
                println!("  id:   {}", user.id);
                println!("  role: {}", user.role);
                if let Some(permissions) = info.permissions {
                    let permissions: Vec<_> = permissions.into_iter().collect();
                    println!("  permissions: {}", permissions.join(", "));
                }
            }
            None => {
                // an expired access token can still be renewed
                if client.tokens().get_refresh_token().await.is_some() {
                    client.http().refresh().await?;
                    if let Some(user) = client.refresh_user().await {
                        println!("{} <{}> ({}, session renewed)", user.name, user.email, user.role);
                        return Ok(());
                    }
                }
                println!("not signed in");
            }
        },
        Command::Logout => {
            client.logout().await;
            println!("signed out");
        }
        Command::Get { path } => {
            let response = client.http().get::<Value>(&path).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Check { path } => match client.check_route(&path).await {
            GuardDecision::Allow => println!("{}: allowed", path),
            GuardDecision::Deny {
                redirect_to,
                reason,
            } => println!("{}: redirect to {} ({})", path, redirect_to, reason),
        },
    }

    Ok(())
}
