use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::GatewayConfig;

/// Load a gateway configuration from a file using the config crate.
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<GatewayConfig> {
    load_config_sync(config_path)
}

/// Load a gateway configuration synchronously.
pub fn load_config_sync(config_path: &str) -> Result<GatewayConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let gateway_config: GatewayConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(gateway_config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[tokio::test]
    async fn test_load_yaml_config() {
        let yaml_content = r#"
routes:
  - upstream_path_template: "/orders/{id}"
    upstream_http_method: ["GET", "POST"]
    downstream_scheme: "http"
    downstream_path_template: "/api/orders/{id}"
    downstream_host_and_ports:
      - host: "orders.internal"
        port: 8080
global:
  request_id_key: "X-Request-Id"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].upstream_path_template, "/orders/{id}");
        assert_eq!(config.routes[0].downstream_host_and_ports[0].port, 8080);
        assert_eq!(config.global.request_id_key.as_deref(), Some("X-Request-Id"));
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let json_content = r#"
{
  "routes": [
    {
      "upstream_path_template": "/catalog",
      "downstream_scheme": "https",
      "downstream_path_template": "/catalog",
      "qos": { "timeout_value_ms": 5000 }
    }
  ]
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].qos.timeout_value_ms, 5000);
    }
}
