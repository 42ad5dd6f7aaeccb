//! `config` command: print the effective process configuration.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    #[serde(flatten)]
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for (section, settings) in [("cache", &self.config.cache), ("routing", &self.config.routing)] {
            let mut keys: Vec<_> = settings.iter().collect();
            keys.sort();

            let mut table = list_table(&["key", "value"]);
            for (key, value) in &keys {
                table.add_row(vec![key.as_str(), value.as_str()]);
            }
            lines.push(format!("{} agent:", console::style(section).bold()));
            if keys.is_empty() {
                lines.push("  (no settings)".to_string());
            } else {
                lines.push(table.to_string());
            }
            lines.push(String::new());
        }

        let logging = &self.config.logging;
        lines.push(format!("{}:", console::style("logging").bold()));
        lines.push(format!("  level: {}", logging.level));
        lines.push(format!("  format: {}", logging.format));
        lines.push(format!(
            "  log_dir: {}",
            logging
                .log_dir
                .as_ref()
                .map_or_else(|| "-".to_string(), |d| d.display().to_string())
        ));
        lines.push(format!("  rotation: {}", logging.rotation));
        lines.push(String::new());
        lines.push(format!("mailbox_capacity: {}", self.config.mailbox_capacity));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(_args: ConfigArgs, config: Config, json_mode: bool) -> Result<()> {
    output(&ConfigOutput { config }, json_mode);
    Ok(())
}
