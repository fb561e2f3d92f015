use tracing::{info, instrument};

use crate::service::{FileService, TaskService};

#[instrument(skip(service))]
pub fn cmd_login(service: &FileService, handle: &str) -> anyhow::Result<()> {
    info!("command login");
    let principal = service.sign_in(handle)?;
    println!("Signed in as {}.", principal.id);
    Ok(())
}

#[instrument(skip(service))]
pub fn cmd_logout(service: &FileService) -> anyhow::Result<()> {
    info!("command logout");
    match service.sign_out()? {
        Some(principal) => println!("Signed out {}.", principal.id),
        None => println!("Not signed in."),
    }
    Ok(())
}

#[instrument(skip(service))]
pub fn cmd_whoami<S: TaskService>(service: &S) -> anyhow::Result<()> {
    match service.current_principal()? {
        Some(principal) => println!("{}", principal.id),
        None => println!("Not signed in."),
    }
    Ok(())
}
