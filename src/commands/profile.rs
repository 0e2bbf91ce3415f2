use colored::*;
use eyre::Result;

use super::session;
use crate::config::Config;
use crate::services::http::HttpServices;

pub fn run(name: &str, persona: Option<&str>, no_images: bool, config: &Config) -> Result<()> {
    let services = HttpServices::new(&config.services);
    let mut session = session(config, persona);
    let persona = session.persona().to_string();

    match session
        .profiles_mut()
        .get_summary(&services, &persona, name, !no_images)
    {
        Some(summary) => {
            println!("{}", summary.trim_end());
            Ok(())
        }
        None => {
            eprintln!("{} No profile found for {}", "✗".red(), name);
            std::process::exit(1);
        }
    }
}
