use clap::Subcommand;
use focustomato_core::{BarrierEngine, Config, TargetKind};

#[derive(Subcommand)]
pub enum BlocklistAction {
    /// List blocked apps and websites as JSON
    List,
    /// Block an application by process name
    AddApp {
        /// Display name
        name: String,
        /// Executable name (e.g. "Steam.exe")
        process_name: String,
    },
    /// Block a website and its subdomains
    AddWebsite {
        /// Display name
        name: String,
        /// URL or domain (e.g. "bilibili.com")
        url: String,
    },
    /// Remove an entry by id
    Remove {
        /// "app" or "website"
        kind: TargetKind,
        id: String,
    },
    /// Enable or disable an entry by id
    Toggle {
        /// "app" or "website"
        kind: TargetKind,
        id: String,
    },
}

pub fn run(action: BlocklistAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let mut barrier = config.barrier_engine();

    match action {
        BlocklistAction::List => {
            let list = serde_json::json!({
                "apps": barrier.blocked_apps().collect::<Vec<_>>(),
                "websites": barrier.blocked_websites().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&list)?);
            return Ok(());
        }
        BlocklistAction::AddApp { name, process_name } => {
            let id = barrier.add_blocked_app(&name, &process_name);
            println!("{id}");
        }
        BlocklistAction::AddWebsite { name, url } => {
            if focustomato_core::barrier::host_of(&url).is_none() {
                return Err(format!("not a valid URL or domain: {url}").into());
            }
            let id = barrier.add_blocked_website(&name, &url);
            println!("{id}");
        }
        BlocklistAction::Remove { kind, id } => {
            let removed = match kind {
                TargetKind::App => barrier.remove_blocked_app(&id),
                TargetKind::Website => barrier.remove_blocked_website(&id),
            };
            if !removed {
                return Err(missing(kind, &id));
            }
            println!("removed");
        }
        BlocklistAction::Toggle { kind, id } => {
            let state = match kind {
                TargetKind::App => barrier.toggle_app_block(&id),
                TargetKind::Website => barrier.toggle_website_block(&id),
            };
            match state {
                Some(true) => println!("enabled"),
                Some(false) => println!("disabled"),
                None => return Err(missing(kind, &id)),
            }
        }
    }

    save(&mut config, &barrier)
}

fn save(config: &mut Config, barrier: &BarrierEngine) -> Result<(), Box<dyn std::error::Error>> {
    config.store_blocklist(barrier);
    config.save()?;
    Ok(())
}

fn missing(kind: TargetKind, id: &str) -> Box<dyn std::error::Error> {
    format!("no {kind} entry with id {id}").into()
}
