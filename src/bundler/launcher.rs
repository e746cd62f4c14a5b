//! Launcher scripts written into the workspace's `bin` directory.
//!
//! Both launchers prefer the runtime bundled next to them (`bin/node` or
//! `bin/node.exe`) and fall back to `node` on `PATH`, then execute `bin/run`.

use crate::bundler::error::Result;
use crate::bundler::utils::fs;
use handlebars::Handlebars;
use std::{collections::BTreeMap, path::Path};

const SH_TEMPLATE: &str = r#"#!/usr/bin/env sh
set -e

get_script_dir () {
  SOURCE="$0"
  # resolve $SOURCE until the file is no longer a symlink
  while [ -h "$SOURCE" ]; do
    DIR="$( cd -P "$( dirname "$SOURCE" )" && pwd )"
    SOURCE="$(readlink "$SOURCE")"
    case "$SOURCE" in
      /*) ;;
      *) SOURCE="$DIR/$SOURCE" ;;
    esac
  done
  cd -P "$( dirname "$SOURCE" )" && pwd
}
DIR="$(get_script_dir)"

if [ -x "$DIR/node" ]; then
  NODE="$DIR/node"
else
  NODE=node
fi

{{env_prefix}}_BINPATH="$DIR/{{bin}}" exec "$NODE" "$DIR/run" "$@"
"#;

const CMD_TEMPLATE: &str = r#"@echo off
setlocal enableextensions

set {{env_prefix}}_BINPATH=%~dp0{{bin}}.cmd
if exist "%~dp0node.exe" (
  "%~dp0node.exe" "%~dp0run" %*
) else (
  node "%~dp0run" %*
)
"#;

/// Writes `bin/{bin}` and `bin/{bin}.cmd` into `workspace`.
pub async fn write_bin_scripts(workspace: &Path, bin: &str) -> Result<()> {
    let (sh, cmd) = render(bin)?;
    let dir = workspace.join("bin");
    fs::write_executable(&dir.join(bin), &sh).await?;
    fs::write_executable(&dir.join(format!("{bin}.cmd")), &cmd).await
}

fn render(bin: &str) -> Result<(String, String)> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.register_template_string("sh", SH_TEMPLATE)?;
    handlebars.register_template_string("cmd", CMD_TEMPLATE)?;

    let mut data = BTreeMap::new();
    data.insert("bin", bin.to_string());
    data.insert("env_prefix", env_prefix(bin));

    Ok((handlebars.render("sh", &data)?, handlebars.render("cmd", &data)?))
}

/// Environment variable prefix for `bin`: uppercased, non-alphanumerics as `_`.
fn env_prefix(bin: &str) -> String {
    bin.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::error::Error;

    #[test]
    fn launcher_templates_parse() {
        let (sh, cmd) = render("mycli").expect("renders");
        assert!(sh.starts_with("#!/usr/bin/env sh"), "{sh}");
        assert!(cmd.contains("MYCLI_BINPATH"));

        let mut handlebars = Handlebars::new();
        let err: Error = handlebars
            .register_template_string("broken", "{{#if}}")
            .expect_err("unclosed block")
            .into();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn env_prefix_is_shell_safe() {
        assert_eq!(env_prefix("my-cli"), "MY_CLI");
        assert_eq!(env_prefix("acme"), "ACME");
    }

    #[test]
    fn launchers_prefer_bundled_runtime() {
        let (sh, cmd) = render("my-cli").expect("renders");
        assert!(sh.starts_with("#!/usr/bin/env sh\n"));
        assert!(sh.contains(r#"if [ -x "$DIR/node" ]; then"#));
        assert!(sh.contains(r#"MY_CLI_BINPATH="$DIR/my-cli" exec "$NODE" "$DIR/run" "$@""#));
        assert!(cmd.contains(r#"if exist "%~dp0node.exe""#));
        assert!(cmd.contains("set MY_CLI_BINPATH=%~dp0my-cli.cmd"));
    }

    #[tokio::test]
    async fn scripts_are_written_executable() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_bin_scripts(tmp.path(), "mycli").await.expect("writes");
        assert!(tmp.path().join("bin/mycli").is_file());
        assert!(tmp.path().join("bin/mycli.cmd").is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(tmp.path().join("bin/mycli"))
                .expect("meta")
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }
}
