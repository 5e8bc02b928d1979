//! Desired specs of the objects the mover creates.

use super::objects::*;
use crate::config::MoverConfig;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;

/// Label key put on every created object.
pub const APP_LABEL: &str = "app";
/// Label value put on every created object.
pub const APP_NAME: &str = "syncthing";

/// Claim holding the daemon's own configuration.
pub const CONFIG_CLAIM_NAME: &str = "syncthing-config";
/// Secret holding the control API key.
pub const API_KEY_SECRET_NAME: &str = "syncthing-apikey";
/// Key of the API key inside the secret.
pub const API_KEY_SECRET_KEY: &str = "apikey";
/// Job running the daemon.
pub const JOB_NAME: &str = "syncthing";
/// Container running the daemon.
pub const CONTAINER_NAME: &str = "syncthing";
/// Service exposing the control API.
pub const API_SERVICE_NAME: &str = "syncthing-api";
/// Service exposing the data plane.
pub const DATA_SERVICE_NAME: &str = "syncthing-data";

/// Control API port.
pub const API_PORT: u16 = 8384;
/// Data plane port.
pub const DATA_PORT: u16 = 22000;

const CONFIG_DIR_ENV: &str = "SYNCTHING_CONFIG_DIR";
const CONFIG_MOUNT_PATH: &str = "/config";
const DATA_DIR_ENV: &str = "SYNCTHING_DATA_DIR";
const DATA_MOUNT_PATH: &str = "/data";
const API_KEY_ENV: &str = "STGUIAPIKEY";
const CONFIG_VOLUME_NAME: &str = "syncthing-config";
const DATA_VOLUME_NAME: &str = "syncthing-data";
const JOB_TTL_SECONDS: i32 = 100;
const CPU_LIMIT: &str = "100m";
const MEMORY_LIMIT: &str = "1Gi";
const API_KEY_LEN: usize = 32;

fn labeled(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta::new(namespace, name).with_label(APP_LABEL, APP_NAME)
}

fn app_selector() -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), APP_NAME.to_string())])
}

/// Generates a fresh control API key.
pub fn generate_api_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LEN)
        .map(char::from)
        .collect()
}

/// Claim for the daemon's configuration directory.
pub fn config_claim(config: &MoverConfig) -> VolumeClaim {
    VolumeClaim {
        meta: labeled(&config.namespace, CONFIG_CLAIM_NAME),
        access_modes: vec![AccessMode::ReadWriteOnce],
        storage_request: config.config_capacity.clone(),
    }
}

/// Secret carrying `api_key`.
pub fn api_key_secret(config: &MoverConfig, api_key: &str) -> Secret {
    Secret {
        meta: labeled(&config.namespace, API_KEY_SECRET_NAME),
        secret_type: "Opaque".to_string(),
        data: BTreeMap::from([(
            API_KEY_SECRET_KEY.to_string(),
            api_key.as_bytes().to_vec(),
        )]),
    }
}

/// Job running the daemon against the configuration and data claims.
pub fn mover_job(config: &MoverConfig) -> Job {
    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: config.image.clone(),
        command: vec!["/entry.sh".to_string()],
        args: vec!["run".to_string()],
        env: vec![
            EnvVar {
                name: CONFIG_DIR_ENV.to_string(),
                source: EnvSource::Value(CONFIG_MOUNT_PATH.to_string()),
            },
            EnvVar {
                name: DATA_DIR_ENV.to_string(),
                source: EnvSource::Value(DATA_MOUNT_PATH.to_string()),
            },
            EnvVar {
                name: API_KEY_ENV.to_string(),
                source: EnvSource::SecretKey {
                    secret: API_KEY_SECRET_NAME.to_string(),
                    key: API_KEY_SECRET_KEY.to_string(),
                },
            },
        ],
        image_pull_policy: PullPolicy::Always,
        ports: vec![API_PORT, DATA_PORT],
        volume_mounts: vec![
            VolumeMount {
                name: CONFIG_VOLUME_NAME.to_string(),
                mount_path: CONFIG_MOUNT_PATH.to_string(),
            },
            VolumeMount {
                name: DATA_VOLUME_NAME.to_string(),
                mount_path: DATA_MOUNT_PATH.to_string(),
            },
        ],
        limits: BTreeMap::from([
            ("cpu".to_string(), CPU_LIMIT.to_string()),
            ("memory".to_string(), MEMORY_LIMIT.to_string()),
        ]),
    };

    Job {
        meta: labeled(&config.namespace, JOB_NAME),
        ttl_seconds_after_finished: Some(JOB_TTL_SECONDS),
        template: PodSpec {
            restart_policy: RestartPolicy::Never,
            containers: vec![container],
            volumes: vec![
                Volume {
                    name: CONFIG_VOLUME_NAME.to_string(),
                    claim_name: CONFIG_CLAIM_NAME.to_string(),
                },
                Volume {
                    name: DATA_VOLUME_NAME.to_string(),
                    claim_name: config.data_volume_claim.clone(),
                },
            ],
        },
    }
}

fn tcp_service(namespace: &str, name: &str, port: u16, service_type: ServiceType) -> Service {
    Service {
        meta: labeled(namespace, name),
        selector: app_selector(),
        ports: vec![ServicePort {
            port,
            target_port: port,
            protocol: "TCP".to_string(),
        }],
        service_type,
        ingress: Vec::new(),
    }
}

/// Cluster-internal service for the control API.
pub fn api_service(config: &MoverConfig) -> Service {
    tcp_service(&config.namespace, API_SERVICE_NAME, API_PORT, ServiceType::ClusterIp)
}

/// Load-balanced service for the data plane.
pub fn data_service(config: &MoverConfig) -> Service {
    tcp_service(&config.namespace, DATA_SERVICE_NAME, DATA_PORT, ServiceType::LoadBalancer)
}

/// External data-plane address of `service`, once the platform has
/// assigned an ingress.
pub fn data_address(service: &Service) -> Option<String> {
    let ingress = service.ingress.first()?;
    let host = ingress
        .ip
        .as_deref()
        .filter(|ip| !ip.is_empty())
        .or_else(|| ingress.hostname.as_deref().filter(|h| !h.is_empty()))?;
    Some(format!("tcp://{host}:{DATA_PORT}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MoverConfig {
        MoverConfig::new("ns", "my-data").with_image("example/st:1")
    }

    #[test]
    fn generated_keys_are_alphanumeric_and_distinct() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_eq!(a.len(), API_KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn job_wires_claims_and_secret() {
        let job = mover_job(&config());
        assert_eq!(job.meta.key(), ObjectKey::new("ns", JOB_NAME));
        assert_eq!(job.meta.labels[APP_LABEL], APP_NAME);
        assert_eq!(job.ttl_seconds_after_finished, Some(100));
        assert_eq!(job.template.restart_policy, RestartPolicy::Never);

        let container = &job.template.containers[0];
        assert_eq!(container.image, "example/st:1");
        assert_eq!(container.ports, vec![8384, 22000]);
        assert!(container.env.iter().any(|e| e.name == "STGUIAPIKEY"
            && e.source
                == EnvSource::SecretKey {
                    secret: "syncthing-apikey".into(),
                    key: "apikey".into()
                }));

        let claims: Vec<_> = job.template.volumes.iter().map(|v| v.claim_name.as_str()).collect();
        assert_eq!(claims, vec!["syncthing-config", "my-data"]);
    }

    #[test]
    fn services() {
        let api = api_service(&config());
        assert_eq!(api.service_type, ServiceType::ClusterIp);
        assert_eq!(api.ports[0].port, 8384);

        let data = data_service(&config());
        assert_eq!(data.service_type, ServiceType::LoadBalancer);
        assert_eq!(data.ports[0].target_port, 22000);
        assert_eq!(data.selector[APP_LABEL], APP_NAME);
    }

    #[test]
    fn data_address_from_ingress() {
        let mut service = data_service(&config());
        assert_eq!(data_address(&service), None);

        service.ingress.push(LoadBalancerIngress {
            ip: None,
            hostname: Some("lb.example.com".into()),
        });
        assert_eq!(data_address(&service).as_deref(), Some("tcp://lb.example.com:22000"));

        service.ingress[0].ip = Some("203.0.113.7".into());
        assert_eq!(data_address(&service).as_deref(), Some("tcp://203.0.113.7:22000"));
    }

    #[test]
    fn secret_and_claim() {
        let secret = api_key_secret(&config(), "k3y");
        assert_eq!(secret.data[API_KEY_SECRET_KEY], b"k3y".to_vec());
        assert_eq!(secret.secret_type, "Opaque");

        let claim = config_claim(&config());
        assert_eq!(claim.storage_request, "1Gi");
        assert_eq!(claim.access_modes, vec![AccessMode::ReadWriteOnce]);
    }
}
