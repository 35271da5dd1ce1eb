#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use devtool::config::{ConfigFile, RawConfigFile, ServiceConfig};
use devtool::types::OutputMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_service(mut self, name: &str, service: ServiceConfig) -> Self {
        self.config.services.insert(name.to_string(), service);
        self
    }

    pub fn with_build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.build.dir = dir.into();
        self
    }

    pub fn with_manifest_line(mut self, line: &str) -> Self {
        self.config.build.manifest.push(line.to_string());
        self
    }

    pub fn with_env(mut self, production: bool, key: &str, value: &str) -> Self {
        let table = if production {
            &mut self.config.env.production
        } else {
            &mut self.config.env.development
        };
        table.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ServiceConfig`.
pub struct ServiceConfigBuilder {
    service: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            service: ServiceConfig {
                cmd: cmd.to_string(),
                cwd: None,
                env: BTreeMap::new(),
                output: OutputMode::Captured,
                port_env: None,
            },
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.service.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.service.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.service.output = output;
        self
    }

    pub fn port_env(mut self, var: &str) -> Self {
        self.service.port_env = Some(var.to_string());
        self
    }

    pub fn build(self) -> ServiceConfig {
        self.service
    }
}
