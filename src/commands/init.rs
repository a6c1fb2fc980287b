use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::{data_dir, ensure_directories, env_file_path};
use crate::error::{Error, Result};

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

pub fn run(api_key: Option<String>, service_account: Option<PathBuf>, force: bool) -> Result<()> {
    ensure_directories()?;

    let env_file = env_file_path();

    if env_file.exists() && !force {
        println!("Config already exists at {}", env_file.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    let api_key = match api_key {
        Some(key) => key.trim().to_string(),
        None => prompt("Enter your YouTube Data API key: ")?,
    };
    if api_key.is_empty() {
        return Err(Error::ApiKeyMissing);
    }

    let service_account = match service_account {
        Some(path) => path,
        None => PathBuf::from(prompt("Path to Google service account JSON key: ")?),
    };
    if service_account.as_os_str().is_empty() {
        return Err(Error::ServiceAccountMissing);
    }
    let service_account = service_account.canonicalize().map_err(|e| {
        Error::Config(format!(
            "Cannot read service account file {}: {}",
            service_account.display(),
            e
        ))
    })?;

    std::fs::write(&env_file, env_contents(&api_key, &service_account))?;

    println!("Config saved to {}", env_file.display());
    println!("Data directory: {}", data_dir().display());
    println!("Remember to share your spreadsheet with the service account email.");

    Ok(())
}

fn env_contents(api_key: &str, service_account: &std::path::Path) -> String {
    format!(
        "YOUTUBE_API_KEY={}\nGOOGLE_SERVICE_ACCOUNT_FILE={}\n",
        api_key,
        service_account.display()
    )
}
