use clap::Subcommand;
use quarterlog_core::{Config, FsSessionStore, SessionStore};

#[derive(Subcommand)]
pub enum FoldersAction {
    /// List project folders
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a project folder (name is sanitized)
    Create {
        /// Folder name
        name: String,
    },
}

pub fn store(config: &Config) -> FsSessionStore {
    FsSessionStore::new(&config.storage.sessions_dir)
}

pub fn run(action: FoldersAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = store(&config);

    match action {
        FoldersAction::List { json } => {
            let folders = store.list_folders()?;
            if json {
                let rows: Vec<_> = folders
                    .iter()
                    .map(|name| {
                        let sessions = store.count_session_files(name)?;
                        Ok(serde_json::json!({ "name": name, "sessions": sessions }))
                    })
                    .collect::<Result<_, quarterlog_core::StorageError>>()?;
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if folders.is_empty() {
                println!("No folders yet. Create one with `quarterlog folders create <name>`.");
            } else {
                for name in folders {
                    let sessions = store.count_session_files(&name)?;
                    println!("{name}\t{sessions} session(s)");
                }
            }
        }
        FoldersAction::Create { name } => {
            if name.trim().is_empty() {
                return Err("folder name must not be empty".into());
            }
            let created = store.create_folder(&name)?;
            println!("{created}");
        }
    }
    Ok(())
}
