use anyhow::Result;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const POSTGRES_COMPOSE: &str = r#"services:
  db:
    image: postgres:14
    ports:
      - "5432:5432"
    environment:
      POSTGRES_USER: admin
      POSTGRES_PASSWORD: secret
"#;

const BUSYBOX_COMPOSE: &str = "services:\n  app:\n    image: busybox\n";

/// A services tree, a settings file pointing at it and a fake compose tool
/// that records every invocation.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let workspace = Workspace {
            dir: TempDir::new()?,
        };
        std::fs::create_dir_all(workspace.services_root())?;
        workspace.write_settings(&workspace.services_root().display().to_string())?;
        workspace.write_fake_compose(0)?;
        Ok(workspace)
    }

    pub fn services_root(&self) -> PathBuf {
        self.dir.path().join("services")
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.path().join("infracli.json")
    }

    pub fn compose_log(&self) -> PathBuf {
        self.dir.path().join("compose.log")
    }

    fn fake_compose(&self) -> PathBuf {
        self.dir.path().join("fake-compose.sh")
    }

    pub fn write_settings(&self, services_path: &str) -> Result<()> {
        let settings = serde_json::json!({
            "servicesPath": services_path,
            "excludedDirs": ["config", "scripts", "cmd"],
        });
        std::fs::write(self.config_file(), serde_json::to_string_pretty(&settings)?)?;
        Ok(())
    }

    /// Fake compose tool: appends `<service dir> <args>` to the log, then
    /// exits with `exit_code`.
    pub fn write_fake_compose(&self, exit_code: i32) -> Result<()> {
        let script = format!(
            "#!/bin/sh\necho \"$(basename \"$(pwd -P)\") $*\" >> '{}'\necho \"compose says hi\"\nexit {exit_code}\n",
            self.compose_log().display()
        );
        std::fs::write(self.fake_compose(), script)?;
        Ok(())
    }

    pub fn add_service(&self, name: &str, compose: Option<&str>) -> Result<()> {
        let dir = self.services_root().join(name);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("docker-compose.yml"), compose.unwrap_or(BUSYBOX_COMPOSE))?;
        Ok(())
    }

    pub fn add_plain_dir(&self, name: &str) -> Result<()> {
        std::fs::create_dir_all(self.services_root().join(name))?;
        Ok(())
    }

    /// `infracli` wired to this workspace's settings file and fake compose tool.
    pub fn infracli(&self) -> Command {
        let mut cmd = Command::cargo_bin("infracli").unwrap();
        cmd.env_remove("RUST_LOG")
            .env("INFRACLI_CONFIG", self.config_file())
            .env(
                "INFRACLI_COMPOSE_COMMAND",
                format!("sh {}", self.fake_compose().display()),
            );
        cmd
    }

    pub fn compose_calls(&self) -> Vec<String> {
        read_lines(&self.compose_log())
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}
