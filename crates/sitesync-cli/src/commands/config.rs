use std::env;

use sitesync_core::util::{is_http_url, trim_trailing_slash};

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values passed to `config init`
#[derive(Debug, Default)]
pub struct ConfigInitArgs {
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
    pub auto_sync_interval: Option<u64>,
    pub no_activate: bool,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            endpoint,
            auth_token,
            auto_sync_interval,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ConfigInitArgs {
                endpoint,
                auth_token,
                auto_sync_interval,
                no_activate,
            },
        ),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(profile_name: Option<&str>, args: ConfigInitArgs) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = apply_config_init(&mut config, profile_name, args, |key| {
        env::var(key).ok()
    })?;

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let ready = config
        .profile(&profile_name)
        .and_then(CliProfile::endpoint)
        .is_some();
    if ready {
        println!("Sync profile '{profile_name}' is ready. Run `sitesync sync` or `sitesync watch`.");
    } else {
        println!("Profile '{profile_name}' is missing: endpoint");
    }
    Ok(())
}

/// Merge explicit values, then environment values, over the stored profile.
///
/// Returns the name of the profile that was written.
pub fn apply_config_init(
    config: &mut CliProfilesConfig,
    profile_name: Option<&str>,
    args: ConfigInitArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let endpoint = normalize_text_option(args.endpoint)
        .or_else(|| normalize_text_option(env("SITESYNC_ENDPOINT")))
        .or_else(|| existing.endpoint());
    let auth_token = normalize_text_option(args.auth_token)
        .or_else(|| normalize_text_option(env("SITESYNC_AUTH_TOKEN")))
        .or_else(|| existing.auth_token());

    if let Some(url) = endpoint.as_deref() {
        if !is_http_url(url) {
            return Err(CliError::Config(
                "endpoint must include http:// or https://".to_string(),
            ));
        }
    }

    let profile = config.profile_mut_or_default(&profile_name);
    profile.endpoint = endpoint.as_deref().map(trim_trailing_slash);
    profile.auth_token = auth_token;
    if let Some(secs) = args.auto_sync_interval {
        profile.auto_sync_interval_secs = (secs > 0).then_some(secs);
    }

    if !args.no_activate {
        config.active_profile = Some(profile_name.clone());
    }
    Ok(profile_name)
}

fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let Some(resolved) = config.resolve_sync(Some(&profile_name)) else {
        println!("Profile '{profile_name}' has no sync endpoint configured.");
        return Ok(());
    };

    println!("profile:   {}", resolved.profile_name);
    println!("endpoint:  {}", resolved.transport.endpoint);
    println!(
        "token:     {}",
        if resolved.transport.auth_token.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!(
        "interval:  {}",
        resolved
            .engine
            .auto_sync_interval
            .map_or_else(|| "disabled".to_string(), |every| format!("{}s", every.as_secs()))
    );
    Ok(())
}
