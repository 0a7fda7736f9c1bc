// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent remote installation of the editor server and the remote
//! tools (bus daemon + taskspace CLI).
//!
//! Both installs are gated on pure file-existence tests: download the
//! archive if the archive file is missing, unpack if the directory is
//! missing. Safe to re-run across controller restarts.

use swo_core::paths::{arch_tag, EDITOR_VERSION};
use swo_core::RemotePaths;
use swo_transport::{Transport, TransportError};
use tracing::{info, warn};

use crate::error::ControllerError;

/// Version of the remote-tools archive; pinned to this build.
pub const TOOLS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Test a path on the remote host without treating absence as an
/// execution failure.
pub(crate) async fn remote_exists(
    transport: &dyn Transport,
    host: &str,
    test_flag: &str,
    path: &str,
) -> Result<bool, TransportError> {
    let out = transport
        .execute(
            host,
            &format!("if test {test_flag} {path}; then echo present; else echo absent; fi"),
        )
        .await?;
    Ok(out.trim() == "present")
}

/// Probe `uname -m` and map it to a release archive tag.
pub async fn detect_arch(
    transport: &dyn Transport,
    host: &str,
) -> Result<&'static str, ControllerError> {
    let uname = transport.execute(host, "uname -m").await?;
    match arch_tag(&uname) {
        Some(tag) => Ok(tag),
        None => {
            warn!(host, machine = %uname.trim(), "unknown architecture, assuming linux-x64");
            Ok("linux-x64")
        }
    }
}

/// Install the pinned editor-server release under the base directory.
pub async fn ensure_editor(
    transport: &dyn Transport,
    host: &str,
    paths: &RemotePaths,
) -> Result<(), ControllerError> {
    let arch = detect_arch(transport, host).await?;
    let archive = paths.editor_archive();

    if !remote_exists(transport, host, "-f", &archive).await? {
        let url = format!(
            "{base}/openvscode-server-v{EDITOR_VERSION}/openvscode-server-v{EDITOR_VERSION}-{arch}.tar.gz",
            base = crate::env::editor_download_base(),
        );
        info!(host, url, "downloading editor server archive");
        transport
            .execute(
                host,
                &format!(
                    "mkdir -p {base} && curl -fsSL -o {archive} {url}",
                    base = paths.base()
                ),
            )
            .await?;
    }

    let dir = paths.editor_dir();
    if !remote_exists(transport, host, "-d", &dir).await? {
        info!(host, dir, "unpacking editor server");
        transport
            .execute(
                host,
                &format!("mkdir -p {dir} && tar -xzf {archive} -C {dir} --strip-components=1"),
            )
            .await?;
    }

    transport
        .execute(host, &format!("chmod +x {}", paths.editor_binary()))
        .await?;
    Ok(())
}

/// Install the remote tools (swo + swod) and the `bin/swo` wrapper so
/// taskspace processes can invoke the CLI with no environment of
/// their own.
pub async fn ensure_remote_tools(
    transport: &dyn Transport,
    host: &str,
    paths: &RemotePaths,
) -> Result<(), ControllerError> {
    let arch = detect_arch(transport, host).await?;
    let archive = paths.tools_archive(TOOLS_VERSION, arch);

    if !remote_exists(transport, host, "-f", &archive).await? {
        let url = format!(
            "{base}/v{TOOLS_VERSION}/swo-remote-{TOOLS_VERSION}-{arch}.tar.gz",
            base = crate::env::tools_download_base(),
        );
        info!(host, url, "downloading remote tools archive");
        transport
            .execute(
                host,
                &format!(
                    "mkdir -p {base} && curl -fsSL -o {archive} {url}",
                    base = paths.base()
                ),
            )
            .await?;
    }

    let dir = paths.tools_dir();
    if !remote_exists(transport, host, "-d", &dir).await? {
        info!(host, dir, "unpacking remote tools");
        transport
            .execute(
                host,
                &format!("mkdir -p {dir} && tar -xzf {archive} -C {dir}"),
            )
            .await?;
    }

    transport
        .execute(host, &wrapper_script_command(paths))
        .await?;
    Ok(())
}

/// Shell command that writes the `bin/swo` wrapper and marks
/// everything executable.
fn wrapper_script_command(paths: &RemotePaths) -> String {
    format!(
        concat!(
            "mkdir -p {bin} && cat > {wrapper} <<'SWO_WRAPPER'\n",
            "#!/bin/sh\n",
            "BASE_DIR=\"${{BASE_DIR:-{base}}}\" exec {cli} \"$@\"\n",
            "SWO_WRAPPER\n",
            "chmod +x {wrapper} {cli} {daemon}"
        ),
        bin = paths.bin_dir(),
        wrapper = paths.cli_wrapper(),
        base = paths.base(),
        cli = paths.tools_cli(),
        daemon = paths.tools_daemon(),
    )
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
