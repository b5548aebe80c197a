use anyhow::Result;

use crate::commands::AppContext;
use crate::store::FolderStore;

pub fn add(ctx: &AppContext, name: &str, folder_id: &str) -> Result<()> {
    let id = ctx.db.save_folder(name, folder_id)?;
    println!("Watching {name} ({folder_id}) as {id}");
    Ok(())
}

pub fn list(ctx: &AppContext) -> Result<()> {
    let folders = ctx.db.list_folders()?;
    for folder in &folders {
        println!(
            "{}  {:<8} {}  ({})",
            folder.id,
            if folder.enabled { "enabled" } else { "disabled" },
            folder.name,
            folder.folder_id,
        );
    }
    println!("{} folder(s)", folders.len());
    Ok(())
}

pub fn set_enabled(ctx: &AppContext, id: &str, enabled: bool) -> Result<()> {
    ctx.db.set_folder_enabled(id, enabled)?;
    println!("{id}: {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub fn remove(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.db.delete_folder(id)?;
    println!("Removed {id}");
    Ok(())
}
