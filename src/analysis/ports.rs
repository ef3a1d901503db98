//! Port discovery from compose files, scripts and the live probe

use super::probe::ListeningSocket;
use super::types::{Endpoint, EndpointSource};
use crate::fs::FileSystem;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

pub const COMPOSE_FILES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Image names of stock backing services; compose services running one are not the app
const BACKING_IMAGES: &[&str] = &[
    "postgres",
    "postgis",
    "mysql",
    "mariadb",
    "mongo",
    "redis",
    "valkey",
    "memcached",
    "rabbitmq",
    "minio",
    "elasticsearch",
    "opensearch",
    "kafka",
    "cp-kafka",
    "zookeeper",
    "nats",
    "localstack",
    "mailhog",
    "mailpit",
];

const SCRIPT_PORT_PATTERNS: &[&str] = &[
    r"--port[=\s]+(\d{2,5})\b",
    r"(?:^|\s)-p\s+(\d{2,5})\b",
    r"\bPORT=(\d{2,5})\b",
    r"(?:localhost|0\.0\.0\.0|127\.0\.0\.1)?:(\d{4,5})\b",
];

/// Published host ports from every service of the first compose file found
pub fn compose_ports(fs: &dyn FileSystem, root: &Path) -> Result<Vec<Endpoint>> {
    let Some(path) = COMPOSE_FILES
        .iter()
        .map(|f| root.join(f))
        .find(|p| fs.is_file(p))
    else {
        return Ok(Vec::new());
    };

    let content = fs.read_to_string(&path)?;
    let doc: serde_yaml::Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Invalid compose file {}", path.display()))?;

    let mut endpoints = Vec::new();
    let Some(services) = doc.get("services").and_then(|s| s.as_mapping()) else {
        return Ok(endpoints);
    };

    for (name, service) in services {
        let name = name.as_str().unwrap_or_default().to_string();
        let Some(ports) = service.get("ports").and_then(|p| p.as_sequence()) else {
            continue;
        };
        let backing = is_backing_service(service);
        for port in ports.iter().filter_map(compose_host_port) {
            let source = if backing {
                EndpointSource::ComposeBacking(name.clone())
            } else {
                EndpointSource::Compose(name.clone())
            };
            endpoints.push(Endpoint {
                port,
                process: None,
                source,
            });
        }
    }

    Ok(endpoints)
}

/// No `build:` section and a stock backing image such as `postgres:16` or `bitnami/redis`
fn is_backing_service(service: &serde_yaml::Value) -> bool {
    if service.get("build").is_some() {
        return false;
    }
    let Some(image) = service.get("image").and_then(|i| i.as_str()) else {
        return false;
    };
    let last = image.rsplit('/').next().unwrap_or(image);
    let base = last.split(['@', ':']).next().unwrap_or(last);
    BACKING_IMAGES.contains(&base)
}

/// `"8080:80"`, `"127.0.0.1:8080:80/tcp"`, `"3000"`, `3000`, or `{published: 8080, target: 80}`
fn compose_host_port(value: &serde_yaml::Value) -> Option<u16> {
    match value {
        serde_yaml::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        serde_yaml::Value::String(s) => {
            let spec = s.split('/').next()?;
            let parts: Vec<&str> = spec.split(':').collect();
            let host = match parts.len() {
                1 | 2 => parts[0],
                _ => parts[parts.len() - 2],
            };
            let host = host.split('-').next()?;
            host.trim().parse().ok()
        }
        serde_yaml::Value::Mapping(_) => value
            .get("published")
            .or_else(|| value.get("target"))
            .and_then(|p| match p {
                serde_yaml::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
                serde_yaml::Value::String(s) => s.parse().ok(),
                _ => None,
            }),
        _ => None,
    }
}

fn script_patterns() -> Result<Vec<Regex>> {
    SCRIPT_PORT_PATTERNS
        .iter()
        .map(|p| Regex::new(p).map_err(Into::into))
        .collect()
}

/// Ports mentioned in a command string, first pattern that matches wins
pub fn ports_in_command(patterns: &[Regex], command: &str) -> Option<u16> {
    patterns
        .iter()
        .find_map(|re| re.captures(command))
        .and_then(|cap| cap[1].parse::<u16>().ok())
        .filter(|port| *port > 0)
}

/// Ports from package.json scripts and Procfile entries
pub fn script_ports(fs: &dyn FileSystem, root: &Path) -> Result<Vec<Endpoint>> {
    let patterns = script_patterns()?;
    let mut endpoints = Vec::new();

    let package_json = root.join("package.json");
    if fs.is_file(&package_json) {
        let content = fs.read_to_string(&package_json)?;
        let value: serde_json::Value =
            serde_json::from_str(&content).context("Invalid package.json")?;
        if let Some(scripts) = value.get("scripts").and_then(|s| s.as_object()) {
            for (name, command) in scripts {
                if let Some(port) = command
                    .as_str()
                    .and_then(|c| ports_in_command(&patterns, c))
                {
                    endpoints.push(Endpoint {
                        port,
                        process: None,
                        source: EndpointSource::Script(name.clone()),
                    });
                }
            }
        }
    }

    let procfile = root.join("Procfile");
    if fs.is_file(&procfile) {
        let content = fs.read_to_string(&procfile)?;
        for line in content.lines() {
            let Some((name, command)) = line.split_once(':') else {
                continue;
            };
            if let Some(port) = ports_in_command(&patterns, command) {
                endpoints.push(Endpoint {
                    port,
                    process: None,
                    source: EndpointSource::Script(name.trim().to_string()),
                });
            }
        }
    }

    Ok(endpoints)
}

/// One list, one entry per port, ascending.
///
/// Earlier sources win; a live socket on the same port only fills in the process name.
pub fn merge_endpoints(
    compose: Vec<Endpoint>,
    scripts: Vec<Endpoint>,
    live: Vec<ListeningSocket>,
) -> Vec<Endpoint> {
    let mut merged: Vec<Endpoint> = Vec::new();

    for endpoint in compose.into_iter().chain(scripts) {
        if !merged.iter().any(|e| e.port == endpoint.port) {
            merged.push(endpoint);
        }
    }

    for socket in live {
        match merged.iter_mut().find(|e| e.port == socket.port) {
            Some(existing) => {
                if existing.process.is_none() {
                    existing.process = socket.process;
                }
            }
            None => merged.push(Endpoint {
                port: socket.port,
                process: socket.process,
                source: EndpointSource::LiveProbe,
            }),
        }
    }

    merged.sort_by_key(|e| e.port);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use yare::parameterized;

    #[test]
    fn test_compose_ports() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/mock/docker-compose.yml",
            r#"
services:
  web:
    build: .
    ports:
      - "8080:80"
      - "127.0.0.1:9229:9229/tcp"
  db:
    image: postgres:16
    ports:
      - 5432
  cache:
    image: redis
    ports:
      - target: 6379
        published: 6380
"#,
        );

        let endpoints = compose_ports(&fs, Path::new("/mock")).unwrap();
        let ports: Vec<u16> = endpoints.iter().map(|e| e.port).collect();
        assert_eq!(ports, vec![8080, 9229, 5432, 6380]);
        assert_eq!(endpoints[0].source, EndpointSource::Compose("web".to_string()));
        assert_eq!(endpoints[2].source, EndpointSource::ComposeBacking("db".to_string()));
        assert_eq!(endpoints[3].source, EndpointSource::ComposeBacking("cache".to_string()));
    }

    #[test]
    fn test_backing_service_detection() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/mock/compose.yaml",
            r#"
services:
  api:
    image: ghcr.io/acme/api:1.2
    ports: ["9000:9000"]
  local-db:
    build: ./db
    image: postgres:16
    ports: ["5433:5432"]
  queue:
    image: docker.io/bitnami/rabbitmq@sha256:abc
    ports: ["5672:5672"]
"#,
        );

        let endpoints = compose_ports(&fs, Path::new("/mock")).unwrap();
        assert_eq!(endpoints[0].source, EndpointSource::Compose("api".to_string()));
        assert_eq!(endpoints[1].source, EndpointSource::Compose("local-db".to_string()));
        assert_eq!(endpoints[2].source, EndpointSource::ComposeBacking("queue".to_string()));
    }

    #[test]
    fn test_compose_invalid_yaml_is_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/compose.yaml", "services: [unclosed");
        assert!(compose_ports(&fs, Path::new("/mock")).is_err());
    }

    #[parameterized(
        long_flag = { "vite --port 5173", Some(5173) },
        long_flag_eq = { "next dev --port=3001", Some(3001) },
        short_flag = { "next start -p 8080", Some(8080) },
        env_assign = { "PORT=5000 node server.js", Some(5000) },
        host_port = { "uvicorn app:app --host 0.0.0.0:8000", Some(8000) },
        none = { "node server.js", None },
    )]
    fn test_ports_in_command(command: &str, expected: Option<u16>) {
        let patterns = script_patterns().unwrap();
        assert_eq!(ports_in_command(&patterns, command), expected);
    }

    #[test]
    fn test_script_and_procfile_ports() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/mock/package.json",
            r#"{"scripts": {"dev": "vite --port 5173", "start": "PORT=3000 node server.js", "test": "jest"}}"#,
        );
        fs.add_file("/mock/Procfile", "web: gunicorn app:app --bind 0.0.0.0:8000\n");

        let endpoints = script_ports(&fs, Path::new("/mock")).unwrap();
        let ports: Vec<u16> = endpoints.iter().map(|e| e.port).collect();
        assert_eq!(ports, vec![5173, 3000, 8000]);
        assert_eq!(endpoints[2].source, EndpointSource::Script("web".to_string()));
    }

    #[test]
    fn test_merge_dedupes_and_enriches() {
        let compose = vec![Endpoint {
            port: 3000,
            process: None,
            source: EndpointSource::Compose("web".to_string()),
        }];
        let scripts = vec![Endpoint {
            port: 3000,
            process: None,
            source: EndpointSource::Script("start".to_string()),
        }];
        let live = vec![
            ListeningSocket::new(3000).with_process("node"),
            ListeningSocket::new(2222).with_process("sshd"),
        ];

        let merged = merge_endpoints(compose, scripts, live);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].port, 2222);
        assert_eq!(merged[0].source, EndpointSource::LiveProbe);
        assert_eq!(merged[1].source, EndpointSource::Compose("web".to_string()));
        assert_eq!(merged[1].process.as_deref(), Some("node"));
    }
}
