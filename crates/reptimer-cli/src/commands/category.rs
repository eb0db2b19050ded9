use clap::Subcommand;
use reptimer_core::Config;

use super::{category_id, open, CmdResult};

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a category
    Create {
        /// Category name
        name: String,
    },
    /// Rename a category
    Rename {
        /// Category id or name
        category: String,
        /// New name
        name: String,
    },
    /// Remove a category and all of its sessions
    Remove {
        /// Category id or name
        category: String,
    },
}

pub async fn run(action: CategoryAction) -> CmdResult {
    let config = Config::load()?;
    let mut controller = open(&config).await?;

    match action {
        CategoryAction::List { json } => {
            let categories = controller.store().categories();
            if json {
                println!("{}", serde_json::to_string_pretty(categories)?);
            } else if categories.is_empty() {
                println!("No categories.");
            } else {
                for c in categories {
                    println!("{}  {}  ({} sessions)", c.id, c.name, c.sessions.len());
                }
            }
        }
        CategoryAction::Create { name } => match controller.create_category(&name).await? {
            Some(id) => println!("Category created: {id}"),
            None => return Err("category name must not be empty".into()),
        },
        CategoryAction::Rename { category, name } => {
            let id = category_id(&controller, &category)?;
            if name.trim().is_empty() {
                return Err("category name must not be empty".into());
            }
            controller.rename_category(&id, &name).await?;
            println!("Category renamed: {id}");
        }
        CategoryAction::Remove { category } => {
            let id = category_id(&controller, &category)?;
            controller.remove_category(&id).await?;
            println!("Category removed: {id}");
        }
    }
    Ok(())
}
