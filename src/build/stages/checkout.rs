// ABOUTME: Deploy key installation, repository checkouts and permission fixes.
// ABOUTME: Checkouts clone into a scratch directory and replace the destination wholesale.

use super::StageContext;
use crate::config::CheckoutEntry;
use crate::remote::{RemoteCommand, RemoteError};

/// Scratch directory each checkout is cloned into first.
pub const SCRATCH_DIR: &str = "/tmp/djangostack-checkout";

const ROOT_SSH_DIR: &str = "/root/.ssh";
const KNOWN_HOSTS: &str = "/root/.ssh/known_hosts";

/// Install the deploy key pair for root and trust the checkout host.
pub async fn setup_access_credentials(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let options = cx.config.options();
    let private_key = cx.config.local_path(&options.deploy_key_name);
    let public_key = cx
        .config
        .local_path(&format!("{}.pub", options.deploy_key_name));

    cx.env
        .run(&RemoteCommand::new("mkdir").args(["-p", ROOT_SSH_DIR]).sudo())
        .await?;
    cx.env
        .run(&RemoteCommand::new("chmod").args(["700", ROOT_SSH_DIR]).sudo())
        .await?;

    cx.env.upload(&private_key, "~/id_rsa", false).await?;
    cx.env.upload(&public_key, "~/id_rsa.pub", false).await?;
    cx.env
        .run(
            &RemoteCommand::new("mv")
                .args(["~/id_rsa", "~/id_rsa.pub", "/root/.ssh/"])
                .sudo(),
        )
        .await?;
    cx.env
        .run(
            &RemoteCommand::new("chmod")
                .args(["600", "/root/.ssh/id_rsa"])
                .sudo(),
        )
        .await?;

    let entry = options.known_hosts_entry.as_str();
    let known = cx
        .env
        .exec(
            &RemoteCommand::new("grep")
                .args(["-qxF", entry, KNOWN_HOSTS])
                .sudo(),
        )
        .await?;
    if !known.success() {
        cx.env
            .run(
                &RemoteCommand::new("tee")
                    .args(["-a", KNOWN_HOSTS])
                    .pipe_from(RemoteCommand::new("printf").args(["%s\\n", entry]))
                    .stdout_to("/dev/null")
                    .sudo(),
            )
            .await?;
    }

    Ok(())
}

/// The commands that replace one checkout's destination, in order.
///
/// The destination is emptied completely, SCM metadata and ignore file
/// included, and the fresh clone is copied across with its dotfiles.
pub fn checkout_commands(
    client: &str,
    entry: &CheckoutEntry,
) -> Result<Vec<RemoteCommand>, RemoteError> {
    if !entry.has_safe_destination() {
        return Err(RemoteError::UnsafeDestination(entry.destination.clone()));
    }
    let destination = entry.destination.trim_end_matches('/');
    let scratch_contents = format!("{}/.", SCRATCH_DIR);
    let destination_dir = format!("{}/", destination);

    Ok(vec![
        RemoteCommand::new("rm").args(["-rf", SCRATCH_DIR]),
        RemoteCommand::new(client).args(["clone", entry.source.as_str(), SCRATCH_DIR]),
        RemoteCommand::new("mkdir").args(["-p", destination]),
        RemoteCommand::new("find").args([
            destination,
            "-mindepth",
            "1",
            "-maxdepth",
            "1",
            "-exec",
            "rm",
            "-rf",
            "{}",
            "+",
        ]),
        RemoteCommand::new("cp").args(["-a", scratch_contents.as_str(), destination_dir.as_str()]),
        RemoteCommand::new("rm").args(["-rf", SCRATCH_DIR]),
    ]
    .into_iter()
    .map(RemoteCommand::sudo)
    .collect())
}

pub async fn checkout_all(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    let client = cx.config.scm().client();
    for entry in cx.config.checkouts() {
        tracing::info!(source = %entry.source, destination = %entry.destination, "checking out");
        for command in checkout_commands(client, entry)? {
            cx.env.run(&command).await?;
        }
    }
    Ok(())
}

/// The mode, ownership and sticky-bit commands for one checkout.
pub fn permission_commands(entry: &CheckoutEntry) -> Vec<RemoteCommand> {
    let mut commands = Vec::new();

    for attrib in &entry.permissions.dir_attribs {
        let path = entry.resolve(&attrib.path);
        let recursive = attrib.recursive.then_some("-R");

        if let Some(mode) = &attrib.mode {
            commands.push(
                RemoteCommand::new("chmod")
                    .args(recursive)
                    .args([mode.as_str(), path.as_str()]),
            );
        }

        let owner = match (&attrib.owner, &attrib.group) {
            (Some(owner), Some(group)) => Some(format!("{}:{}", owner, group)),
            (Some(owner), None) => Some(owner.clone()),
            (None, Some(group)) => Some(format!(":{}", group)),
            (None, None) => None,
        };
        if let Some(owner) = owner {
            commands.push(
                RemoteCommand::new("chown")
                    .args(recursive)
                    .args([owner, path]),
            );
        }
    }

    for uid in &entry.permissions.uids {
        let path = entry.resolve(uid);
        commands.push(RemoteCommand::new("chmod").args(["-R", "u+s", path.as_str()]));
    }
    for gid in &entry.permissions.gids {
        let path = entry.resolve(gid);
        commands.push(RemoteCommand::new("chmod").args(["-R", "g+s", path.as_str()]));
    }

    commands.into_iter().map(RemoteCommand::sudo).collect()
}

pub async fn fix_repository_permissions(cx: &mut StageContext<'_>) -> Result<(), RemoteError> {
    for entry in cx.config.checkouts() {
        for command in permission_commands(entry) {
            cx.env.run(&command).await?;
        }
    }
    Ok(())
}
